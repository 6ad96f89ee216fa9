pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;

use std::sync::Arc;

use actix_web::HttpResponse;

pub use self::config::Settings;
pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;

pub use auth::{AuthService, CurrentUser, RateLimitConfig, RateLimiter, SessionAuth, TokenIssuer};
pub use db::{City, Country, DbOperations, Travel, TravelRecord, User};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all request handlers. Constructed once
/// at startup and passed in explicitly; nothing here is a process global.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub db: DbOperations,
    pub tokens: TokenIssuer,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(config: Settings) -> Result<Self> {
        let db = DbOperations::connect_lazy(&config.database.url, config.database.max_connections)?;
        let tokens = TokenIssuer::new(&config.auth);
        let auth = Arc::new(AuthService::new(
            db.clone(),
            tokens.clone(),
            RateLimiter::new(RateLimitConfig::default()),
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            tokens,
            auth,
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        // Close database connections
        self.db.pool().close().await;
        Ok(())
    }
}
