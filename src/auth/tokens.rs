use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::Result;

pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Claims carried by the short-lived access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid, // User ID
    pub iat: i64,  // Issued at
    pub exp: i64,  // Expiration time
}

/// Claims carried by the long-lived refresh token. `rti` must still match
/// the user record's stored identifier at verification time.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid, // User ID
    pub rti: Uuid, // Rotating refresh-token identifier
    pub iat: i64,  // Issued at
    pub exp: i64,  // Expiration time
}

/// Issues and verifies both token kinds. The two kinds are signed with
/// independent secrets, so an access token can never pass as a refresh
/// token or vice versa.
#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
        }
    }

    pub fn issue_access(&self, user_id: Uuid) -> Result<String> {
        self.issue_access_with_ttl(user_id, Duration::minutes(ACCESS_TOKEN_TTL_MINUTES))
    }

    pub fn issue_refresh(&self, user_id: Uuid, refresh_token_id: Uuid) -> Result<String> {
        self.issue_refresh_with_ttl(
            user_id,
            refresh_token_id,
            Duration::days(REFRESH_TOKEN_TTL_DAYS),
        )
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims> {
        let data = decode::<AccessClaims>(
            token,
            &self.access_decoding,
            &Validation::new(Algorithm::HS256),
        )?;

        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims> {
        let data = decode::<RefreshClaims>(
            token,
            &self.refresh_decoding,
            &Validation::new(Algorithm::HS256),
        )?;

        Ok(data.claims)
    }

    fn issue_access_with_ttl(&self, user_id: Uuid, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.access_encoding)?;
        Ok(token)
    }

    fn issue_refresh_with_ttl(
        &self,
        user_id: Uuid,
        refresh_token_id: Uuid,
        ttl: Duration,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id,
            rti: refresh_token_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.refresh_encoding)?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AuthError};

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AuthConfig {
            access_token_secret: "test_access_secret".into(),
            refresh_token_secret: "test_refresh_secret".into(),
        })
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let token = issuer.issue_access(user_id).unwrap();
        let claims = issuer.verify_access(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL_MINUTES * 60);
    }

    #[test]
    fn test_refresh_token_carries_rotating_identifier() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let rti = Uuid::new_v4();

        let token = issuer.issue_refresh(user_id, rti).unwrap();
        let claims = issuer.verify_refresh(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.rti, rti);
        assert_eq!(claims.exp - claims.iat, REFRESH_TOKEN_TTL_DAYS * 24 * 3600);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let issuer = issuer();
        let result = issuer.verify_access("not.a.token");
        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::InvalidToken))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let token = issuer
            .issue_access_with_ttl(Uuid::new_v4(), Duration::hours(-2))
            .unwrap();

        let result = issuer.verify_access(&token);
        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::TokenExpired))
        ));
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let access = issuer.issue_access(user_id).unwrap();
        let refresh = issuer.issue_refresh(user_id, Uuid::new_v4()).unwrap();

        assert!(issuer.verify_refresh(&access).is_err());
        assert!(issuer.verify_access(&refresh).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = issuer();
        let other = TokenIssuer::new(&AuthConfig {
            access_token_secret: "different_secret".into(),
            refresh_token_secret: "another_secret".into(),
        });

        let token = issuer.issue_access(Uuid::new_v4()).unwrap();
        assert!(other.verify_access(&token).is_err());
    }
}
