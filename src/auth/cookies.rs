use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};

use crate::auth::tokens::{ACCESS_TOKEN_TTL_MINUTES, REFRESH_TOKEN_TTL_DAYS};
use crate::config::Settings;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

pub fn access_cookie(settings: &Settings, token: String) -> Cookie<'static> {
    build(
        settings,
        ACCESS_COOKIE,
        token,
        CookieDuration::minutes(ACCESS_TOKEN_TTL_MINUTES),
    )
}

pub fn refresh_cookie(settings: &Settings, token: String) -> Cookie<'static> {
    build(
        settings,
        REFRESH_COOKIE,
        token,
        CookieDuration::days(REFRESH_TOKEN_TTL_DAYS),
    )
}

/// Expired duplicate of the named cookie, which makes the browser drop it.
pub fn clear_cookie(settings: &Settings, name: &'static str) -> Cookie<'static> {
    build(settings, name, String::new(), CookieDuration::ZERO)
}

fn build(
    settings: &Settings,
    name: &'static str,
    value: String,
    max_age: CookieDuration,
) -> Cookie<'static> {
    // Cross-site deployments need SameSite=None, which browsers only accept
    // over HTTPS; local development keeps Lax without the Secure flag.
    let (same_site, secure) = if settings.is_production() {
        (SameSite::None, true)
    } else {
        (SameSite::Lax, false)
    };

    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .max_age(max_age)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_cookie_attributes() {
        let settings = Settings::new_for_test().unwrap();
        let cookie = access_cookie(&settings, "token-value".into());

        assert_eq!(cookie.name(), ACCESS_COOKIE);
        assert_eq!(cookie.value(), "token-value");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(
            cookie.max_age(),
            Some(CookieDuration::minutes(ACCESS_TOKEN_TTL_MINUTES))
        );
    }

    #[test]
    fn test_production_cookie_is_hardened() {
        let mut settings = Settings::new_for_test().unwrap();
        settings.environment = "production".into();

        let cookie = refresh_cookie(&settings, "token-value".into());
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(
            cookie.max_age(),
            Some(CookieDuration::days(REFRESH_TOKEN_TTL_DAYS))
        );
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let settings = Settings::new_for_test().unwrap();
        let cookie = clear_cookie(&settings, REFRESH_COOKIE);

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }
}
