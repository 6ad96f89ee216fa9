use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::api::pagination::{PageQuery, PageRequest};
use crate::api::Envelope;
use crate::auth::CurrentUser;
use crate::db::NewTravel;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TravelPayload {
    pub country_id: i32,
    pub travel_date: NaiveDate,
    #[validate(range(min = 1, max = 3650, message = "must be between 1 and 3650 days"))]
    pub duration_days: Option<i32>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "must list at most 100 cities"))]
    pub city_ids: Vec<i32>,
}

impl From<TravelPayload> for NewTravel {
    fn from(payload: TravelPayload) -> Self {
        NewTravel {
            country_id: payload.country_id,
            travel_date: payload.travel_date,
            duration_days: payload.duration_days,
            description: payload.description,
            city_ids: payload.city_ids,
        }
    }
}

pub async fn list_travels(
    user: CurrentUser,
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let page = PageRequest::from_query(&query)?;
    let (travels, total) = state.db.list_travels(user.id, &page).await?;

    Ok(HttpResponse::Ok().json(Envelope::paged(travels, page.meta(total))))
}

pub async fn get_travel(
    user: CurrentUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let travel = state.db.get_travel(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(Envelope::new(travel)))
}

pub async fn create_travel(
    user: CurrentUser,
    req: web::Json<TravelPayload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let new = NewTravel::from(req.into_inner());
    let travel = state.db.create_travel(user.id, &new).await?;
    info!(user_id = %user.id, travel_id = %travel.id, "travel created");

    Ok(HttpResponse::Created().json(Envelope::new(travel)))
}

pub async fn update_travel(
    user: CurrentUser,
    path: web::Path<Uuid>,
    req: web::Json<TravelPayload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let travel_id = path.into_inner();
    let new = NewTravel::from(req.into_inner());
    let travel = state.db.update_travel(user.id, travel_id, &new).await?;
    info!(user_id = %user.id, travel_id = %travel_id, "travel updated");

    Ok(HttpResponse::Ok().json(Envelope::new(travel)))
}

pub async fn delete_travel(
    user: CurrentUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let travel_id = path.into_inner();
    state.db.delete_travel(user.id, travel_id).await?;
    info!(user_id = %user.id, travel_id = %travel_id, "travel deleted");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "travel deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> TravelPayload {
        TravelPayload {
            country_id: 1,
            travel_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            duration_days: Some(14),
            description: Some("two weeks in Portugal".into()),
            city_ids: vec![10, 11],
        }
    }

    #[test]
    fn test_valid_payload() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut p = payload();
        p.duration_days = Some(0);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_missing_duration_allowed() {
        let mut p = payload();
        p.duration_days = None;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_oversized_description_rejected() {
        let mut p = payload();
        p.description = Some("x".repeat(2001));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_city_ids_default_to_empty() {
        let p: TravelPayload = serde_json::from_value(serde_json::json!({
            "countryId": 5,
            "travelDate": "2024-06-01"
        }))
        .unwrap();
        assert!(p.city_ids.is_empty());
        assert!(p.validate().is_ok());
    }
}
