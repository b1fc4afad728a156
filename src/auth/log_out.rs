//! Log-out route handler that invalidates the session cookie.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::auth::invalidate_auth_cookie;

/// Invalidate the session cookie.
///
/// Always succeeds, even if the client was not logged in.
pub async fn get_log_out(jar: PrivateCookieJar) -> Response {
    let jar = invalidate_auth_cookie(jar);

    (StatusCode::NO_CONTENT, jar).into_response()
}
