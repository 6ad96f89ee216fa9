use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::api::pagination::PageRequest;
use crate::db::models::{City, Country, NewTravel, Travel, TravelRecord, TravelStats, User};
use crate::error::{AppError, DatabaseError};
use crate::Result;

const USER_COLUMNS: &str = "id, email, username, given_name, family_name, password_hash, \
                            refresh_token_id, created_at, updated_at";

const COUNTRY_COLUMNS: &str = "id, code, name, region, capital, latitude, longitude";

#[derive(Clone)]
pub struct DbOperations {
    pool: Arc<PgPool>,
}

impl DbOperations {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Builds the pool without eagerly connecting; the first query pays for
    /// the connection, so startup does not race the database.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---- users ----

    pub async fn create_user(&self, user: &User) -> Result<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.given_name)
        .bind(&user.family_name)
        .bind(&user.password_hash)
        .bind(user.refresh_token_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(created)
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        given_name: Option<&str>,
        family_name: Option<&str>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET given_name = $2, family_name = $3, updated_at = $4 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(given_name)
        .bind(family_name)
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("user".into()))?;

        Ok(user)
    }

    pub async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("user".into()));
        }
        Ok(())
    }

    /// Rotates the stored refresh-token identifier. Every refresh token
    /// issued before this call stops verifying against the user record.
    pub async fn rotate_refresh_token(&self, user_id: Uuid) -> Result<Uuid> {
        let rotated = sqlx::query_scalar::<_, Uuid>(
            "UPDATE users SET refresh_token_id = $2, updated_at = $3 \
             WHERE id = $1 RETURNING refresh_token_id",
        )
        .bind(user_id)
        .bind(Uuid::new_v4())
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("user".into()))?;

        Ok(rotated)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        // Travels and their city associations go with the user via FK cascade.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("user".into()));
        }
        Ok(())
    }

    // ---- travels ----

    /// Single ownership gate applied before every travel mutation. A travel
    /// that exists but belongs to someone else is indistinguishable from a
    /// missing one.
    pub async fn travel_owned_by(&self, travel_id: Uuid, user_id: Uuid) -> Result<Travel> {
        let travel = sqlx::query_as::<_, Travel>(
            "SELECT id, user_id, country_id, travel_date, duration_days, description, \
                    created_at, updated_at \
             FROM travels WHERE id = $1 AND user_id = $2",
        )
        .bind(travel_id)
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("travel".into()))?;

        Ok(travel)
    }

    pub async fn list_travels(
        &self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> Result<(Vec<TravelRecord>, i64)> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM travels WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        let rows = sqlx::query_as::<_, TravelJoinRow>(
            "SELECT t.id, t.country_id, c.name AS country_name, t.travel_date, \
                    t.duration_days, t.description, t.created_at, t.updated_at \
             FROM travels t \
             JOIN countries c ON c.id = t.country_id \
             WHERE t.user_id = $1 \
             ORDER BY t.travel_date DESC, t.created_at DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool.as_ref())
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut cities = self.cities_for_travels(&ids).await?;

        let records = rows
            .into_iter()
            .map(|row| {
                let travel_cities = cities.remove(&row.id).unwrap_or_default();
                row.into_record(travel_cities)
            })
            .collect();

        Ok((records, total))
    }

    pub async fn get_travel(&self, travel_id: Uuid, user_id: Uuid) -> Result<TravelRecord> {
        let row = sqlx::query_as::<_, TravelJoinRow>(
            "SELECT t.id, t.country_id, c.name AS country_name, t.travel_date, \
                    t.duration_days, t.description, t.created_at, t.updated_at \
             FROM travels t \
             JOIN countries c ON c.id = t.country_id \
             WHERE t.id = $1 AND t.user_id = $2",
        )
        .bind(travel_id)
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("travel".into()))?;

        let mut cities = self.cities_for_travels(&[row.id]).await?;
        let travel_cities = cities.remove(&row.id).unwrap_or_default();
        Ok(row.into_record(travel_cities))
    }

    pub async fn create_travel(&self, user_id: Uuid, new: &NewTravel) -> Result<TravelRecord> {
        self.ensure_country_exists(new.country_id).await?;

        let now = Utc::now();

        // The travel row and its city associations commit together or not at
        // all; dropping the transaction on an error path rolls everything back.
        let mut tx = self.pool.begin().await?;

        let travel = sqlx::query_as::<_, Travel>(
            "INSERT INTO travels (id, user_id, country_id, travel_date, duration_days, \
                                  description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, user_id, country_id, travel_date, duration_days, description, \
                       created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new.country_id)
        .bind(new.travel_date)
        .bind(new.duration_days)
        .bind(&new.description)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_travel_cities(&mut tx, travel.id, &new.city_ids).await?;

        tx.commit().await?;

        self.get_travel(travel.id, user_id).await
    }

    pub async fn update_travel(
        &self,
        user_id: Uuid,
        travel_id: Uuid,
        new: &NewTravel,
    ) -> Result<TravelRecord> {
        self.travel_owned_by(travel_id, user_id).await?;
        self.ensure_country_exists(new.country_id).await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE travels SET country_id = $2, travel_date = $3, duration_days = $4, \
                    description = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(travel_id)
        .bind(new.country_id)
        .bind(new.travel_date)
        .bind(new.duration_days)
        .bind(&new.description)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        // Replace the association set wholesale: after commit the stored city
        // list equals the submitted one, so repeating the same edit is a no-op.
        sqlx::query("DELETE FROM travel_cities WHERE travel_id = $1")
            .bind(travel_id)
            .execute(&mut *tx)
            .await?;

        Self::insert_travel_cities(&mut tx, travel_id, &new.city_ids).await?;

        tx.commit().await?;

        self.get_travel(travel_id, user_id).await
    }

    pub async fn delete_travel(&self, user_id: Uuid, travel_id: Uuid) -> Result<()> {
        self.travel_owned_by(travel_id, user_id).await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM travel_cities WHERE travel_id = $1")
            .bind(travel_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM travels WHERE id = $1")
            .bind(travel_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn ensure_country_exists(&self, country_id: i32) -> Result<()> {
        let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM countries WHERE id = $1")
            .bind(country_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        if exists.is_none() {
            return Err(AppError::Validation("unknown country id".into()));
        }
        Ok(())
    }

    async fn insert_travel_cities(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        travel_id: Uuid,
        city_ids: &[i32],
    ) -> Result<()> {
        for city_id in city_ids {
            // Composite PK absorbs duplicate ids in the submitted list.
            sqlx::query(
                "INSERT INTO travel_cities (travel_id, city_id) VALUES ($1, $2) \
                 ON CONFLICT (travel_id, city_id) DO NOTHING",
            )
            .bind(travel_id)
            .bind(city_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn cities_for_travels(&self, travel_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<City>>> {
        if travel_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, TravelCityRow>(
            "SELECT tc.travel_id, ci.id, ci.country_id, ci.name, ci.latitude, ci.longitude \
             FROM travel_cities tc \
             JOIN cities ci ON ci.id = tc.city_id \
             WHERE tc.travel_id = ANY($1) \
             ORDER BY ci.name",
        )
        .bind(travel_ids)
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut grouped: HashMap<Uuid, Vec<City>> = HashMap::new();
        for row in rows {
            grouped.entry(row.travel_id).or_default().push(City {
                id: row.id,
                country_id: row.country_id,
                name: row.name,
                latitude: row.latitude,
                longitude: row.longitude,
            });
        }

        Ok(grouped)
    }

    // ---- reference data ----

    pub async fn list_countries(
        &self,
        search: Option<&str>,
        region: Option<&str>,
        page: &PageRequest,
    ) -> Result<(Vec<Country>, i64)> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM countries \
             WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%') \
               AND ($2::text IS NULL OR region = $2)",
        )
        .bind(search)
        .bind(region)
        .fetch_one(self.pool.as_ref())
        .await?;

        let countries = sqlx::query_as::<_, Country>(&format!(
            "SELECT {COUNTRY_COLUMNS} FROM countries \
             WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%') \
               AND ($2::text IS NULL OR region = $2) \
             ORDER BY name \
             LIMIT $3 OFFSET $4"
        ))
        .bind(search)
        .bind(region)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok((countries, total))
    }

    pub async fn get_country_by_code(&self, code: &str) -> Result<Option<Country>> {
        let country = sqlx::query_as::<_, Country>(&format!(
            "SELECT {COUNTRY_COLUMNS} FROM countries WHERE UPPER(code) = UPPER($1)"
        ))
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(country)
    }

    pub async fn list_cities(
        &self,
        country_id: i32,
        search: Option<&str>,
        page: &PageRequest,
    ) -> Result<(Vec<City>, i64)> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM cities \
             WHERE country_id = $1 \
               AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')",
        )
        .bind(country_id)
        .bind(search)
        .fetch_one(self.pool.as_ref())
        .await?;

        let cities = sqlx::query_as::<_, City>(
            "SELECT id, country_id, name, latitude, longitude FROM cities \
             WHERE country_id = $1 \
               AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%') \
             ORDER BY name \
             LIMIT $3 OFFSET $4",
        )
        .bind(country_id)
        .bind(search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok((cities, total))
    }

    // ---- stats ----

    pub async fn user_stats(&self, user_id: Uuid) -> Result<TravelStats> {
        let stats = sqlx::query_as::<_, TravelStats>(
            "SELECT COUNT(*) AS travel_count, \
                    COUNT(DISTINCT t.country_id) AS country_count, \
                    (SELECT COUNT(DISTINCT tc.city_id) \
                       FROM travel_cities tc \
                       JOIN travels t2 ON t2.id = tc.travel_id \
                      WHERE t2.user_id = $1) AS city_count, \
                    COALESCE(SUM(t.duration_days), 0)::BIGINT AS total_days \
             FROM travels t WHERE t.user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(stats)
    }
}

#[derive(Debug, FromRow)]
struct TravelJoinRow {
    id: Uuid,
    country_id: i32,
    country_name: String,
    travel_date: chrono::NaiveDate,
    duration_days: Option<i32>,
    description: Option<String>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl TravelJoinRow {
    fn into_record(self, cities: Vec<City>) -> TravelRecord {
        TravelRecord {
            id: self.id,
            country_id: self.country_id,
            country_name: self.country_name,
            travel_date: self.travel_date,
            duration_days: self.duration_days,
            description: self.description,
            cities,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TravelCityRow {
    travel_id: Uuid,
    id: i32,
    country_id: i32,
    name: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}
