//! Route handlers for listing, creating and deleting transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{
        FromRef, Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use axum_extra::extract::{Query, QueryRejection};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    category::{CategoryName, find_or_create_category, get_category},
    database_id::{CategoryId, TransactionId},
    date_range::{Bound, parse_optional_bound, rfc3339},
    timezone::get_timezone,
    transaction::{
        Transaction, TransactionDetail, TransactionFilter, create_transaction,
        delete_transaction, ensure_positive_amount, get_transaction_detail, list_transactions,
    },
    user::{UserId, parse_payer_filter},
};

/// The state needed to manage transactions.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for listing transactions.
///
/// Missing or malformed bounds leave that end of the range open.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    /// The earliest time, as an RFC 3339 timestamp or a `yyyy-MM-dd` date.
    pub from: Option<String>,
    /// The latest time, as an RFC 3339 timestamp or a `yyyy-MM-dd` date.
    pub to: Option<String>,
    /// Only list transactions in these categories, may be repeated.
    #[serde(default)]
    pub category_id: Vec<CategoryId>,
    /// Only list transactions paid by this user, unknown users are ignored.
    pub payer: Option<String>,
}

/// The request body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct NewTransactionData {
    /// The amount spent, must be greater than zero.
    pub amount: Decimal,
    /// The ID of an existing category.
    pub category_id: Option<CategoryId>,
    /// The name of a category, created if it does not exist.
    ///
    /// Only used if `category_id` is not given.
    pub category_name: Option<String>,
    /// When the money was spent, defaults to now.
    #[serde(default, deserialize_with = "rfc3339::option::deserialize")]
    pub occurred_at: Option<OffsetDateTime>,
    /// An optional free text note.
    pub note: Option<String>,
}

/// A route handler that lists the transactions matching the query.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionState>,
    query: Result<Query<TransactionQuery>, QueryRejection>,
) -> Result<Json<Vec<TransactionDetail>>, Error> {
    let Query(query) = query.map_err(|rejection| Error::InvalidPayload(rejection.to_string()))?;
    let timezone = get_timezone(&state.local_timezone)?;

    let filter = TransactionFilter::new()
        .from(parse_optional_bound(query.from.as_deref(), Bound::Start, timezone))
        .to(parse_optional_bound(query.to.as_deref(), Bound::End, timezone))
        .categories(query.category_id)
        .payer(parse_payer_filter(query.payer.as_deref()));

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    list_transactions(&filter, &connection).map(Json)
}

/// A route handler for creating a transaction paid by the logged in user.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    payload: Result<Json<NewTransactionData>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionDetail>), Error> {
    let Json(data) = payload.map_err(|rejection| Error::InvalidPayload(rejection.body_text()))?;
    // Validate the amount before any category is created.
    let amount = ensure_positive_amount(data.amount)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let category_id = match (data.category_id, data.category_name) {
        (Some(category_id), _) => get_category(category_id, &connection)?.id,
        (None, Some(name)) => find_or_create_category(CategoryName::new(&name)?, &connection)?.id,
        (None, None) => return Err(Error::MissingCategory),
    };

    let mut builder = Transaction::build(amount, category_id, user_id).note(data.note);
    if let Some(occurred_at) = data.occurred_at {
        builder = builder.occurred_at(occurred_at);
    }

    let transaction = create_transaction(builder, &connection)?;
    tracing::info!(
        "{user_id} created transaction {} for {} in category {category_id}",
        transaction.id,
        transaction.amount
    );

    let detail = get_transaction_detail(transaction.id, &connection)?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// A route handler for deleting a transaction.
///
/// Users may delete their own transactions, and the owner may also delete the
/// partner's.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    path: Result<Path<TransactionId>, PathRejection>,
) -> Result<StatusCode, Error> {
    let Path(transaction_id) =
        path.map_err(|rejection| Error::InvalidPayload(rejection.body_text()))?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    delete_transaction(transaction_id, user_id, &connection).inspect_err(|error| {
        tracing::warn!("{user_id} could not delete transaction {transaction_id}: {error}")
    })?;
    tracing::info!("{user_id} deleted transaction {transaction_id}");

    Ok(StatusCode::NO_CONTENT)
}
