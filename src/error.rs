use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized, no token")]
    NoToken,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token")]
    InvalidToken,

    #[error("too many attempts, try again later")]
    RateLimited,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Record not found")]
    NotFound,
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::Database(DatabaseError::NotFound),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                // Constraint names follow the `<table>_<column>_key` convention,
                // which lets the conflict message name the offending field.
                let constraint = db.constraint().unwrap_or_default();
                if constraint.contains("email") {
                    AppError::Conflict("email already in use".into())
                } else if constraint.contains("username") {
                    AppError::Conflict("username already taken".into())
                } else {
                    AppError::Conflict("duplicate record".into())
                }
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::Validation("referenced record does not exist".into())
            }
            _ => AppError::Database(DatabaseError::Query(err.to_string())),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Auth(err.into())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        // Surface the first failing field's message to the client.
        let message = err
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errors)| match errors.first().and_then(|e| e.message.as_ref()) {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{} is invalid", field),
            })
            .unwrap_or_else(|| "invalid request".into());

        AppError::Validation(message)
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Internal failures never leak detail to the client.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("internal error: {}", self);
            "internal server error".to_string()
        } else {
            self.client_message()
        };

        HttpResponse::build(status).json(json!({
            "message": message,
            "code": status.as_u16(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(DatabaseError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    /// Message rendered into the error envelope for non-500 responses.
    fn client_message(&self) -> String {
        match self {
            AppError::Auth(e) => e.to_string(),
            AppError::Validation(m) | AppError::BadRequest(m) | AppError::Conflict(m) => m.clone(),
            AppError::NotFound(m) => format!("{} not found", m),
            AppError::Database(DatabaseError::NotFound) => "not found".to_string(),
            _ => self.to_string(),
        }
    }
}
