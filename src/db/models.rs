use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// User account row. `refresh_token_id` is the rotating identifier embedded
/// in every issued refresh token; a refresh token is honored only while its
/// embedded identifier equals this value, so rotating it revokes every
/// outstanding refresh token at once.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub password_hash: String,
    pub refresh_token_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: String,
        username: String,
        given_name: Option<String>,
        family_name: Option<String>,
        password_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            username,
            given_name,
            family_name,
            password_hash,
            refresh_token_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn refresh_token_matches(&self, refresh_token_id: Uuid) -> bool {
        self.refresh_token_id == refresh_token_id
    }
}

/// Reference data, seeded out-of-band and read-only at runtime.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub region: Option<String>,
    pub capital: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: i32,
    pub country_id: i32,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Travel row as stored. City associations live in the `travel_cities`
/// join table and are loaded separately.
#[derive(Debug, Clone, FromRow)]
pub struct Travel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub country_id: i32,
    pub travel_date: NaiveDate,
    pub duration_days: Option<i32>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for travel create/update. The stored city set always ends up equal
/// to `city_ids` after the write commits.
#[derive(Debug, Clone)]
pub struct NewTravel {
    pub country_id: i32,
    pub travel_date: NaiveDate,
    pub duration_days: Option<i32>,
    pub description: Option<String>,
    pub city_ids: Vec<i32>,
}

/// Read model returned by the travel endpoints: the travel row joined with
/// its country name and resolved city list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelRecord {
    pub id: Uuid,
    pub country_id: i32,
    pub country_name: String,
    pub travel_date: NaiveDate,
    pub duration_days: Option<i32>,
    pub description: Option<String>,
    pub cities: Vec<City>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-user aggregates shown on the dashboard.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TravelStats {
    pub travel_count: i64,
    pub country_count: i64,
    pub city_count: i64,
    pub total_days: i64,
}
