//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Bodies longer than this many characters are truncated in the `info` logs.
const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// JSON fields whose values never appear in the logs.
const REDACTED_FIELDS: [&str; 1] = ["code"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
/// The log-in code in JSON request bodies is replaced with asterisks.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read request body: {error}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let is_json = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    let body_text = String::from_utf8_lossy(&body_bytes);
    let display_text = if is_json {
        redact_json_fields(&body_text)
    } else {
        body_text.to_string()
    };
    log_body("Received request", &format!("{parts:#?}"), &display_text);

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            Bytes::new()
        }
    };
    log_body(
        "Sending response",
        &format!("{parts:#?}"),
        &String::from_utf8_lossy(&body_bytes),
    );

    Response::from_parts(parts, Body::from(body_bytes))
}

/// Replace the values of [REDACTED_FIELDS] in a JSON object.
///
/// Text that is not a JSON object is returned as is.
fn redact_json_fields(body_text: &str) -> String {
    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(body_text) else {
        return body_text.to_owned();
    };

    for field in REDACTED_FIELDS {
        if let Some(value) = object.get_mut(field) {
            *value = Value::String("********".to_owned());
        }
    }

    Value::Object(object).to_string()
}

fn truncate(text: &str, max_chars: usize) -> Option<&str> {
    text.char_indices()
        .nth(max_chars)
        .map(|(byte_index, _)| &text[..byte_index])
}

fn log_body(message: &str, headers: &str, body: &str) {
    match truncate(body, LOG_BODY_LENGTH_LIMIT) {
        Some(truncated) => {
            tracing::info!("{message}: {headers}\nbody: {truncated}...");
            tracing::debug!("Full body: {body:?}");
        }
        None => tracing::info!("{message}: {headers}\nbody: {body:?}"),
    }
}
