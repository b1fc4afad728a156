//! Defines functions for handling user authentication with cookies.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::token::Token, user::UserId};

pub(crate) const COOKIE_TOKEN: &str = "token";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::days(7);

/// Add an auth cookie to the cookie jar, indicating that a user is logged in and authenticated.
///
/// The cookie holds a [Token] that expires `duration` from now.
///
/// # Errors
///
/// Returns an [Error::TokenError] if the token could not be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserId,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let expires_at = OffsetDateTime::now_utc() + duration;
    let token = Token {
        user_id,
        expires_at,
    };
    let token_string =
        serde_json::to_string(&token).map_err(|error| Error::TokenError(error.to_string()))?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, token_string))
            .path("/")
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Set the auth cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Read the session token from `jar`.
///
/// # Errors
///
/// Returns [Error::NotAuthenticated] if the cookie is missing, cannot be
/// parsed or has expired.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::NotAuthenticated)?;
    let token: Token = serde_json::from_str(cookie.value_trimmed()).map_err(|error| {
        tracing::debug!("could not parse session token: {error}");
        Error::NotAuthenticated
    })?;

    if !token.is_valid_at(OffsetDateTime::now_utc()) {
        tracing::debug!("session token for {} expired", token.user_id);
        return Err(Error::NotAuthenticated);
    }

    Ok(token)
}
