//! Authentication module for the Worldly server
//!
//! Token issuance and verification, the cookie-based session middleware,
//! password hashing, and the register/login/logout handlers.

pub mod cookies;
pub mod handlers;
mod middleware;
mod password;
mod rate_limit;
mod service;
mod tokens;

pub use middleware::{CurrentUser, SessionAuth};
pub use password::{hash_password, verify_password};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use service::{AuthService, IssuedSession};
pub use tokens::{AccessClaims, RefreshClaims, TokenIssuer};
