//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    http::{StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;

use crate::{database_id::CategoryId, user::UserId};

/// The message sent to the client for any error it cannot act on.
const INTERNAL_ERROR_MSG: &str = "An unexpected error occurred, check the server logs for more details.";

/// The number of seconds a rate limited client is told to wait before retrying.
pub const RETRY_AFTER_SECONDS: u64 = 60;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The log-in code or user ID was wrong.
    ///
    /// Deliberately does not say which of the two was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The client made too many log-in attempts in the current window.
    #[error("too many log-in attempts, please try again later")]
    TooManyAttempts,

    /// The request did not carry a valid session.
    #[error("not logged in")]
    NotAuthenticated,

    /// A transaction amount was zero or negative.
    #[error("amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// A transaction or budget amount was larger than the largest amount the
    /// app accepts.
    #[error("amount cannot be greater than {max}, got {amount}")]
    AmountTooLarge {
        /// The rejected amount.
        amount: Decimal,
        /// The largest accepted amount.
        max: Decimal,
    },

    /// A budget amount was negative.
    #[error("budget amount cannot be negative, got {0}")]
    NegativeBudget(Decimal),

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// A month key was not in the `yyyy-MM` format.
    #[error("\"{0}\" is not a valid month, expected the format yyyy-MM")]
    InvalidMonth(String),

    /// The request body or query string could not be parsed.
    #[error("invalid request: {0}")]
    InvalidPayload(String),

    /// A transaction was submitted without a category ID or name.
    #[error("a category ID or category name is required")]
    MissingCategory,

    /// The category name already exists, ignoring case.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The category ID did not refer to a valid category.
    #[error("could not find a category with the ID {0}")]
    CategoryNotFound(CategoryId),

    /// Tried to delete a transaction that does not exist.
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to delete a budget override that does not exist.
    #[error("tried to delete a budget override that is not in the database")]
    DeleteMissingOverride,

    /// The user tried to delete a transaction they have no rights over.
    #[error("{actor} is not allowed to delete transactions paid by {payer}")]
    DeleteNotPermitted {
        /// The user attempting the deletion.
        actor: UserId,
        /// The payer of the transaction.
        payer: UserId,
    },

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Totalling stored amounts went past the range of [Decimal].
    #[error("the total of the stored amounts is too large to calculate")]
    AmountOverflow,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The session token could not be created.
    #[error("could not create the session token: {0}")]
    TokenError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials | Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Error::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            Error::NonPositiveAmount(_)
            | Error::AmountTooLarge { .. }
            | Error::NegativeBudget(_)
            | Error::EmptyCategoryName
            | Error::InvalidMonth(_)
            | Error::InvalidPayload(_)
            | Error::MissingCategory => StatusCode::BAD_REQUEST,
            Error::DuplicateCategoryName(_) => StatusCode::CONFLICT,
            Error::NotFound
            | Error::CategoryNotFound(_)
            | Error::DeleteMissingTransaction
            | Error::DeleteMissingOverride => StatusCode::NOT_FOUND,
            Error::DeleteNotPermitted { .. } => StatusCode::FORBIDDEN,
            Error::SqlError(_)
            | Error::InvalidTimezoneError(_)
            | Error::DatabaseLockError
            | Error::AmountOverflow
            | Error::TokenError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            Error::TooManyAttempts => (
                status,
                [(RETRY_AFTER, RETRY_AFTER_SECONDS.to_string())],
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            // Internal errors are not intended to be shown to the client.
            error if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("An unexpected error occurred: {}", error);
                (status, Json(json!({ "error": INTERNAL_ERROR_MSG }))).into_response()
            }
            error => (status, Json(json!({ "error": error.to_string() }))).into_response(),
        }
    }
}
