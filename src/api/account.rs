use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::api::Envelope;
use crate::auth::cookies::{clear_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::auth::CurrentUser;
use crate::db::User;
use crate::error::AppError;
use crate::AppState;

/// Account data as exposed over the API; the password hash and the rotating
/// refresh-token identifier never leave the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBody {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for ProfileBody {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            given_name: user.given_name.clone(),
            family_name: user.family_name.clone(),
            created_at: user.created_at,
        }
    }
}

/// Full replacement of the editable profile fields: a field omitted from
/// the request clears the stored value.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(max = 64, message = "must be at most 64 characters"))]
    pub given_name: Option<String>,
    #[validate(length(max = 64, message = "must be at most 64 characters"))]
    pub family_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub new_password: String,
}

pub async fn get_profile(
    user: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let account = state
        .db
        .get_user_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".into()))?;

    Ok(HttpResponse::Ok().json(Envelope::new(ProfileBody::from(&account))))
}

pub async fn update_profile(
    user: CurrentUser,
    req: web::Json<UpdateProfileRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let updated = state
        .db
        .update_profile(
            user.id,
            req.given_name.as_deref(),
            req.family_name.as_deref(),
        )
        .await?;

    info!(user_id = %user.id, "profile updated");
    Ok(HttpResponse::Ok().json(Envelope::new(ProfileBody::from(&updated))))
}

pub async fn change_password(
    user: CurrentUser,
    req: web::Json<ChangePasswordRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    state
        .auth
        .change_password(user.id, &req.current_password, &req.new_password)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "password updated"
    })))
}

pub async fn delete_account(
    user: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.db.delete_user(user.id).await?;
    info!(user_id = %user.id, "account deleted");

    Ok(HttpResponse::Ok()
        .cookie(clear_cookie(&state.config, ACCESS_COOKIE))
        .cookie(clear_cookie(&state.config, REFRESH_COOKIE))
        .json(serde_json::json!({
            "message": "account deleted"
        })))
}

pub async fn get_stats(
    user: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let stats = state.db.user_stats(user.id).await?;
    Ok(HttpResponse::Ok().json(Envelope::new(stats)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_body_hides_credentials() {
        let user = User::new(
            "ada@example.com".into(),
            "ada".into(),
            Some("Ada".into()),
            Some("Lovelace".into()),
            "secret-hash".into(),
        );

        let json = serde_json::to_value(ProfileBody::from(&user)).unwrap();
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["username"], "ada");
        assert_eq!(json["givenName"], "Ada");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("refreshTokenId").is_none());
    }

    #[test]
    fn test_update_profile_request_omitted_field_is_none() {
        // None is bound through to the database, clearing the stored value.
        let req: UpdateProfileRequest = serde_json::from_value(serde_json::json!({
            "givenName": "Ada"
        }))
        .unwrap();

        assert_eq!(req.given_name.as_deref(), Some("Ada"));
        assert_eq!(req.family_name, None);
    }

    #[test]
    fn test_change_password_request_validation() {
        let valid = ChangePasswordRequest {
            current_password: "old-password".into(),
            new_password: "new-password-long".into(),
        };
        assert!(valid.validate().is_ok());

        let too_short = ChangePasswordRequest {
            current_password: "old-password".into(),
            new_password: "short".into(),
        };
        assert!(too_short.validate().is_err());
    }
}
