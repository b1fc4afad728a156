//! Handles log-in requests: rate limiting, the shared code check and setting the session cookie.

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::HeaderMap,
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{RateLimiter, set_auth_cookie},
    user::{User, UserId, get_user},
};

/// The client identifier used when the request has no `X-Forwarded-For` header.
const UNKNOWN_CLIENT: &str = "unknown";

/// The state needed to process a log-in request.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The code shared by both users.
    pub auth_code: String,
    /// Limits log-in attempts per client and user.
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// The database connection for reading the user.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            auth_code: state.auth_code.clone(),
            rate_limiter: state.rate_limiter.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The body of a log-in request.
#[derive(Clone, Deserialize)]
pub struct LogInData {
    /// The shared log-in code.
    pub code: String,
    /// Either `owner` or `partner`.
    pub user_id: String,
}

/// The client that sent the request, the first `X-Forwarded-For` entry if present.
fn client_identifier(headers: &HeaderMap) -> &str {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|client| !client.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
}

/// Check the log-in code and user ID, both must match for the user to be returned.
fn verify_credentials(data: &LogInData, auth_code: &str) -> Result<UserId, Error> {
    // Compare fixed length digests rather than the raw strings.
    let is_code_valid = Sha512::digest(data.code.as_bytes()) == Sha512::digest(auth_code.as_bytes());
    let user_id = data.user_id.parse::<UserId>();

    match (is_code_valid, user_id) {
        (true, Ok(user_id)) => Ok(user_id),
        _ => Err(Error::InvalidCredentials),
    }
}

/// A route handler for logging in as one of the two users.
///
/// Attempts are rate limited per client and attempted user before the
/// credentials are checked, so a correct code is still rejected once the
/// limit is reached.
pub async fn post_log_in(
    State(state): State<LogInState>,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    data: Result<Json<LogInData>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<User>), Error> {
    let Json(data) = data.map_err(|rejection| Error::InvalidPayload(rejection.body_text()))?;
    let client = client_identifier(&headers);
    let rate_limit_key = format!("{client}-{}", data.user_id);

    if !state.rate_limiter.check(&rate_limit_key, Instant::now()) {
        tracing::warn!("too many log-in attempts from {client} for {:?}", data.user_id);
        return Err(Error::TooManyAttempts);
    }

    let user_id = verify_credentials(&data, &state.auth_code).inspect_err(|_| {
        tracing::info!("failed log-in attempt from {client} for {:?}", data.user_id);
    })?;

    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        get_user(user_id, &connection)?
    };

    let jar = set_auth_cookie(jar, user_id, state.cookie_duration)?;
    tracing::info!("{user_id} logged in");

    Ok((jar, Json(user)))
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::HeaderMap, routing::post};
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;
    use sha2::{Digest, Sha512};

    use crate::{
        Error,
        auth::{COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, WindowedRateLimiter},
        db::initialize,
        user::UserId,
    };

    use super::{LogInData, LogInState, client_identifier, post_log_in, verify_credentials};

    const CODE: &str = "correct horse battery staple";

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let state = LogInState {
            cookie_key: Key::from(&Sha512::digest(b"foobar")),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            auth_code: CODE.to_owned(),
            rate_limiter: Arc::new(WindowedRateLimiter::default()),
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let app = Router::new()
            .route("/log_in", post(post_log_in))
            .with_state(state);

        TestServer::new(app).expect("Could not create test server.")
    }

    fn log_in_data(code: &str, user_id: &str) -> LogInData {
        LogInData {
            code: code.to_owned(),
            user_id: user_id.to_owned(),
        }
    }

    #[test]
    fn credentials_need_code_and_known_user() {
        assert_eq!(
            verify_credentials(&log_in_data(CODE, "partner"), CODE),
            Ok(UserId::Partner)
        );
        assert_eq!(
            verify_credentials(&log_in_data("wrong", "owner"), CODE),
            Err(Error::InvalidCredentials)
        );
        assert_eq!(
            verify_credentials(&log_in_data(CODE, "Owner"), CODE),
            Err(Error::InvalidCredentials)
        );
    }

    #[test]
    fn client_is_first_forwarded_for_entry() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_identifier(&headers), "unknown");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_identifier(&headers), "203.0.113.7");
    }

    #[tokio::test]
    async fn log_in_sets_session_cookie() {
        let server = get_test_server();

        let response = server
            .post("/log_in")
            .json(&json!({ "code": CODE, "user_id": "owner" }))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "id": "owner",
            "display_name": "Owner",
            "is_owner": true,
        }));
        let cookie = response.cookie(COOKIE_TOKEN);
        assert_eq!(cookie.http_only(), Some(true));
    }

    #[tokio::test]
    async fn wrong_code_is_unauthorized() {
        let server = get_test_server();

        let response = server
            .post("/log_in")
            .json(&json!({ "code": "guess", "user_id": "owner" }))
            .await;

        response.assert_status_unauthorized();
        response.assert_json(&json!({ "error": "invalid credentials" }));
    }

    #[tokio::test]
    async fn unknown_user_gets_same_error_as_wrong_code() {
        let server = get_test_server();

        let response = server
            .post("/log_in")
            .json(&json!({ "code": CODE, "user_id": "guest" }))
            .await;

        response.assert_status_unauthorized();
        response.assert_json(&json!({ "error": "invalid credentials" }));
    }

    #[tokio::test]
    async fn sixth_attempt_is_rate_limited_even_with_correct_code() {
        let server = get_test_server();
        for _ in 0..5 {
            server
                .post("/log_in")
                .add_header("x-forwarded-for", "198.51.100.2")
                .json(&json!({ "code": "guess", "user_id": "partner" }))
                .await
                .assert_status_unauthorized();
        }

        let response = server
            .post("/log_in")
            .add_header("x-forwarded-for", "198.51.100.2")
            .json(&json!({ "code": CODE, "user_id": "partner" }))
            .await;

        response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.header("retry-after"), "60");
    }

    #[tokio::test]
    async fn rate_limit_is_per_client() {
        let server = get_test_server();
        for _ in 0..5 {
            server
                .post("/log_in")
                .add_header("x-forwarded-for", "198.51.100.2")
                .json(&json!({ "code": "guess", "user_id": "partner" }))
                .await;
        }

        server
            .post("/log_in")
            .add_header("x-forwarded-for", "198.51.100.3")
            .json(&json!({ "code": CODE, "user_id": "partner" }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let server = get_test_server();

        let response = server
            .post("/log_in")
            .json(&json!({ "user_id": "owner" }))
            .await;

        response.assert_status_bad_request();
    }
}
