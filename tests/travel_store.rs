//! Store-level properties that need a provisioned postgres: travel writes
//! commit atomically with their city associations, and repeating the same
//! edit leaves the stored city set unchanged. Point `DATABASE_URL` at a
//! disposable database and run with `cargo test -- --ignored`.

use chrono::NaiveDate;
use uuid::Uuid;
use worldly_server::api::pagination::PageRequest;
use worldly_server::db::NewTravel;
use worldly_server::{DbOperations, TravelRecord, User};

async fn store() -> DbOperations {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let db = DbOperations::connect_lazy(&url, 2).expect("Failed to build pool");

    sqlx::migrate!("./migrations")
        .run(db.pool())
        .await
        .expect("Failed to run migrations");

    db
}

async fn seed_user(db: &DbOperations) -> User {
    let tag = Uuid::new_v4().simple().to_string();
    let user = User::new(
        format!("{tag}@example.com"),
        format!("u{tag}"),
        None,
        None,
        "hash".into(),
    );

    db.create_user(&user).await.expect("Failed to create user")
}

async fn seed_country(db: &DbOperations) -> i32 {
    sqlx::query_scalar::<_, i32>("INSERT INTO countries (code, name) VALUES ($1, $2) RETURNING id")
        .bind(format!("T{}", Uuid::new_v4().simple()))
        .bind("Testland")
        .fetch_one(db.pool())
        .await
        .expect("Failed to seed country")
}

async fn seed_city(db: &DbOperations, country_id: i32, name: &str) -> i32 {
    sqlx::query_scalar::<_, i32>(
        "INSERT INTO cities (country_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(country_id)
    .bind(name)
    .fetch_one(db.pool())
    .await
    .expect("Failed to seed city")
}

fn new_travel(country_id: i32, city_ids: Vec<i32>) -> NewTravel {
    NewTravel {
        country_id,
        travel_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        duration_days: Some(7),
        description: None,
        city_ids,
    }
}

fn city_names(record: &TravelRecord) -> Vec<String> {
    record.cities.iter().map(|c| c.name.clone()).collect()
}

#[tokio::test]
#[ignore = "requires a provisioned postgres"]
async fn test_failed_create_leaves_no_travel_row() {
    let db = store().await;
    let user = seed_user(&db).await;
    let country = seed_country(&db).await;

    // A city id that cannot exist makes the association insert fail after
    // the travel row was written inside the same transaction.
    let result = db
        .create_travel(user.id, &new_travel(country, vec![i32::MAX]))
        .await;
    assert!(result.is_err());

    let (travels, total) = db
        .list_travels(user.id, &PageRequest::All)
        .await
        .expect("Failed to list travels");
    assert_eq!(total, 0);
    assert!(travels.is_empty());
}

#[tokio::test]
#[ignore = "requires a provisioned postgres"]
async fn test_failed_edit_leaves_stored_cities_untouched() {
    let db = store().await;
    let user = seed_user(&db).await;
    let country = seed_country(&db).await;
    let porto = seed_city(&db, country, "Porto").await;

    let created = db
        .create_travel(user.id, &new_travel(country, vec![porto]))
        .await
        .expect("Failed to create travel");

    // The edit deletes the association set before reinserting; the failing
    // insert must roll that delete back too.
    let result = db
        .update_travel(user.id, created.id, &new_travel(country, vec![i32::MAX]))
        .await;
    assert!(result.is_err());

    let stored = db
        .get_travel(created.id, user.id)
        .await
        .expect("Failed to fetch travel");
    assert_eq!(city_names(&stored), ["Porto"]);
}

#[tokio::test]
#[ignore = "requires a provisioned postgres"]
async fn test_repeated_edit_with_same_cities_is_a_noop() {
    let db = store().await;
    let user = seed_user(&db).await;
    let country = seed_country(&db).await;
    let porto = seed_city(&db, country, "Porto").await;
    let lisbon = seed_city(&db, country, "Lisbon").await;

    let created = db
        .create_travel(user.id, &new_travel(country, vec![porto]))
        .await
        .expect("Failed to create travel");

    // Duplicate ids in the submitted list collapse to one association.
    let edit = new_travel(country, vec![lisbon, porto, porto]);
    let first = db
        .update_travel(user.id, created.id, &edit)
        .await
        .expect("Failed to update travel");
    let second = db
        .update_travel(user.id, created.id, &edit)
        .await
        .expect("Failed to repeat update");

    assert_eq!(city_names(&first), ["Lisbon", "Porto"]);
    assert_eq!(city_names(&first), city_names(&second));
}
