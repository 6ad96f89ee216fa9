use std::rc::Rc;

use actix_web::cookie::Cookie;
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::cookies::{access_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::auth::tokens::RefreshClaims;
use crate::db::User;
use crate::error::{AppError, AuthError};
use crate::AppState;

/// Identity attached to the request once the session middleware accepts it.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<CurrentUser>()
                .copied()
                .ok_or(AppError::Auth(AuthError::NoToken)),
        )
    }
}

/// Cookie-based session middleware.
///
/// Per request:
/// - neither cookie present: reject;
/// - access cookie present: verify it and attach identity, regardless of any
///   refresh cookie;
/// - refresh cookie only: verify it, load the user, require the embedded
///   identifier to match the stored one (rotation check), then mint a fresh
///   access token, set it on the response, and attach identity.
///
/// The rotation check is the only server-side revocation mechanism; no other
/// session state is held across requests.
pub struct SessionAuth;

impl<S, B> Transform<S, ServiceRequest> for SessionAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = SessionAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct SessionAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SessionAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let state = req
                .app_data::<web::Data<AppState>>()
                .cloned()
                .ok_or_else(|| AppError::Internal("application state not configured".into()))?;

            let renewed_access = authenticate(&state, &req).await?;

            let mut res = service.call(req).await?;

            if let Some(cookie) = renewed_access {
                res.response_mut()
                    .add_cookie(&cookie)
                    .map_err(|e| AppError::Internal(e.to_string()))?;
            }

            Ok(res)
        })
    }
}

/// Runs the per-request decision tree. On the refresh path the renewed
/// access cookie is returned so the caller can set it on the response.
async fn authenticate(
    state: &web::Data<AppState>,
    req: &ServiceRequest,
) -> Result<Option<Cookie<'static>>, AppError> {
    let access = req.cookie(ACCESS_COOKIE);
    let refresh = req.cookie(REFRESH_COOKIE);

    match (access, refresh) {
        (None, None) => {
            warn!("rejected request to {}: no token presented", req.path());
            Err(AuthError::NoToken.into())
        }
        (Some(cookie), _) => {
            // A present access token decides the request on its own; the
            // refresh token is not consulted.
            let claims = state.tokens.verify_access(cookie.value()).map_err(|e| {
                warn!("rejected request to {}: {}", req.path(), e);
                e
            })?;

            req.extensions_mut().insert(CurrentUser { id: claims.sub });
            Ok(None)
        }
        (None, Some(cookie)) => {
            let claims = state.tokens.verify_refresh(cookie.value()).map_err(|e| {
                warn!("rejected request to {}: {}", req.path(), e);
                e
            })?;

            let user = state
                .db
                .get_user_by_id(claims.sub)
                .await?
                .ok_or(AuthError::InvalidToken)?;

            let identity = refresh_identity(&user, &claims).map_err(|e| {
                warn!(user_id = %user.id, "rejected refresh token with rotated identifier");
                e
            })?;

            let token = state.tokens.issue_access(identity.id)?;
            info!(user_id = %identity.id, "renewed access token from refresh token");

            req.extensions_mut().insert(identity);
            Ok(Some(access_cookie(&state.config, token)))
        }
    }
}

/// Applies the rotation check: a signature-valid refresh token grants
/// identity only while its embedded identifier matches the stored one.
/// A token issued before the last rotation is a revoked session.
fn refresh_identity(user: &User, claims: &RefreshClaims) -> Result<CurrentUser, AppError> {
    if !user.refresh_token_matches(claims.rti) {
        return Err(AuthError::InvalidToken.into());
    }

    Ok(CurrentUser { id: user.id })
}
