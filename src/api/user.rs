use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::api::Envelope;
use crate::db::{TravelStats, User};
use crate::error::AppError;
use crate::AppState;

/// What any visitor may see about an account: no email, no ids.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfileBody {
    pub username: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub stats: TravelStats,
}

impl PublicProfileBody {
    fn new(user: &User, stats: TravelStats) -> Self {
        Self {
            username: user.username.clone(),
            given_name: user.given_name.clone(),
            family_name: user.family_name.clone(),
            stats,
        }
    }
}

pub async fn get_public_profile(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = state
        .db
        .get_user_by_username(&path)
        .await?
        .ok_or_else(|| AppError::NotFound("user".into()))?;

    let stats = state.db.user_stats(user.id).await?;

    Ok(HttpResponse::Ok().json(Envelope::new(PublicProfileBody::new(&user, stats))))
}
