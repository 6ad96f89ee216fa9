use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::rate_limit::RateLimiter;
use crate::auth::tokens::TokenIssuer;
use crate::db::{DbOperations, User};
use crate::error::{AppError, AuthError};
use crate::Result;

/// A freshly authenticated session: the user plus the cookie pair to set.
pub struct IssuedSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    db: DbOperations,
    tokens: TokenIssuer,
    limiter: RateLimiter,
}

impl AuthService {
    pub fn new(db: DbOperations, tokens: TokenIssuer, limiter: RateLimiter) -> Self {
        Self {
            db,
            tokens,
            limiter,
        }
    }

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        given_name: Option<String>,
        family_name: Option<String>,
        password: &str,
    ) -> Result<IssuedSession> {
        if !self.limiter.check_rate_limit(email).await {
            return Err(AuthError::RateLimited.into());
        }

        let password_hash = hash_password(password)?;
        let user = User::new(
            email.to_string(),
            username.to_string(),
            given_name,
            family_name,
            password_hash,
        );

        // Duplicate email/username surfaces as a conflict from the insert.
        let user = self.db.create_user(&user).await?;
        info!(user_id = %user.id, "registered new account");

        self.issue_session(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession> {
        if !self.limiter.check_rate_limit(email).await {
            return Err(AuthError::RateLimited.into());
        }

        let user = self
            .db
            .get_user_by_email(email)
            .await?
            .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        verify_password(password, &user.password_hash)?;
        info!(user_id = %user.id, "login successful");

        self.issue_session(user)
    }

    /// Global logout: rotates the stored refresh-token identifier, which
    /// invalidates every refresh token issued before this call.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<()> {
        self.db.rotate_refresh_token(user_id).await?;
        info!(user_id = %user_id, "rotated refresh token identifier");
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self
            .db
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".into()))?;

        verify_password(current_password, &user.password_hash)?;

        let password_hash = hash_password(new_password)?;
        self.db.update_password_hash(user_id, &password_hash).await?;
        info!(user_id = %user_id, "password changed");

        Ok(())
    }

    /// Drops rate-limit windows with no attempts left in the current
    /// window. `check_rate_limit` only prunes the entry it is asked about,
    /// so without a periodic sweep the map keeps one entry per distinct
    /// email ever submitted.
    pub async fn sweep_rate_limits(&self) {
        self.limiter.cleanup().await;
    }

    fn issue_session(&self, user: User) -> Result<IssuedSession> {
        let access_token = self.tokens.issue_access(user.id)?;
        let refresh_token = self.tokens.issue_refresh(user.id, user.refresh_token_id)?;

        Ok(IssuedSession {
            user,
            access_token,
            refresh_token,
        })
    }
}
