use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::api::pagination::{PageQuery, PageRequest};
use crate::api::Envelope;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CountryFilter {
    pub search: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CityFilter {
    pub search: Option<String>,
}

fn normalize(filter: Option<&String>) -> Option<&str> {
    filter.map(|s| s.trim()).filter(|s| !s.is_empty())
}

pub async fn list_countries(
    query: web::Query<PageQuery>,
    filter: web::Query<CountryFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let page = PageRequest::from_query(&query)?;
    let (countries, total) = state
        .db
        .list_countries(
            normalize(filter.search.as_ref()),
            normalize(filter.region.as_ref()),
            &page,
        )
        .await?;

    Ok(HttpResponse::Ok().json(Envelope::paged(countries, page.meta(total))))
}

pub async fn get_country(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let country = state
        .db
        .get_country_by_code(&path)
        .await?
        .ok_or_else(|| AppError::NotFound("country".into()))?;

    Ok(HttpResponse::Ok().json(Envelope::new(country)))
}

pub async fn list_country_cities(
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    filter: web::Query<CityFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let page = PageRequest::from_query(&query)?;

    let country = state
        .db
        .get_country_by_code(&path)
        .await?
        .ok_or_else(|| AppError::NotFound("country".into()))?;

    let (cities, total) = state
        .db
        .list_cities(country.id, normalize(filter.search.as_ref()), &page)
        .await?;

    Ok(HttpResponse::Ok().json(Envelope::paged(cities, page.meta(total))))
}
