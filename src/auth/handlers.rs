use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{error, info};
use validator::Validate;

use crate::api::account::ProfileBody;
use crate::api::Envelope;
use crate::auth::cookies::{access_cookie, clear_cookie, refresh_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::auth::middleware::CurrentUser;
use crate::auth::service::IssuedSession;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 32, message = "must be 3 to 32 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: String,
    #[validate(length(max = 64, message = "must be at most 64 characters"))]
    pub given_name: Option<String>,
    #[validate(length(max = 64, message = "must be at most 64 characters"))]
    pub family_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    info!("Received registration request for email: {}", req.email);

    let req = req.into_inner();
    let session = match state
        .auth
        .register(
            &req.email,
            &req.username,
            req.given_name,
            req.family_name,
            &req.password,
        )
        .await
    {
        Ok(session) => session,
        Err(e) => {
            error!("Registration failed for email: {}: {}", req.email, e);
            return Err(e);
        }
    };

    Ok(session_response(&state, session, HttpResponse::Created()))
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    info!("Received login request for email: {}", req.email);

    match state.auth.login(&req.email, &req.password).await {
        Ok(session) => Ok(session_response(&state, session, HttpResponse::Ok())),
        Err(e) => {
            error!("Login failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

/// Clears the cookie pair for this client only; refresh tokens held
/// elsewhere stay valid.
pub async fn logout(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok()
        .cookie(clear_cookie(&state.config, ACCESS_COOKIE))
        .cookie(clear_cookie(&state.config, REFRESH_COOKIE))
        .json(serde_json::json!({
            "message": "Successfully logged out"
        })))
}

/// Rotates the stored refresh-token identifier before clearing cookies,
/// which invalidates every outstanding refresh token for the account.
pub async fn logout_all(
    user: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.auth.logout_all(user.id).await?;

    Ok(HttpResponse::Ok()
        .cookie(clear_cookie(&state.config, ACCESS_COOKIE))
        .cookie(clear_cookie(&state.config, REFRESH_COOKIE))
        .json(serde_json::json!({
            "message": "Logged out everywhere"
        })))
}

fn session_response(
    state: &web::Data<AppState>,
    session: IssuedSession,
    mut builder: actix_web::HttpResponseBuilder,
) -> HttpResponse {
    builder
        .cookie(access_cookie(&state.config, session.access_token))
        .cookie(refresh_cookie(&state.config, session.refresh_token))
        .json(Envelope::new(ProfileBody::from(&session.user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            email: "ada@example.com".into(),
            username: "ada".into(),
            password: "longenoughpassword".into(),
            given_name: Some("Ada".into()),
            family_name: None,
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".into(),
            ..clone_request(&valid)
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            password: "short".into(),
            ..clone_request(&valid)
        };
        assert!(short_password.validate().is_err());

        let short_username = RegisterRequest {
            username: "ab".into(),
            ..clone_request(&valid)
        };
        assert!(short_username.validate().is_err());
    }

    #[test]
    fn test_login_request_validation() {
        let valid = LoginRequest {
            email: "ada@example.com".into(),
            password: "secret".into(),
        };
        assert!(valid.validate().is_ok());

        let empty_password = LoginRequest {
            email: "ada@example.com".into(),
            password: String::new(),
        };
        assert!(empty_password.validate().is_err());
    }

    fn clone_request(req: &RegisterRequest) -> RegisterRequest {
        RegisterRequest {
            email: req.email.clone(),
            username: req.username.clone(),
            password: req.password.clone(),
            given_name: req.given_name.clone(),
            family_name: req.family_name.clone(),
        }
    }
}
