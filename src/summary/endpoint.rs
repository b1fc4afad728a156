//! The summary route handler.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use axum_extra::extract::{Query, QueryRejection};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    summary::{Summary, SummaryFilter, SummaryQuery, summarize},
    timezone::{get_timezone, now_in},
    transaction::list_transactions,
};

/// The state needed to build summaries.
#[derive(Debug, Clone)]
pub struct SummaryState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SummaryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Summarize the transactions that match `filter`.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the transactions could not be read, or an
/// [Error::AmountOverflow] if the totals are too large. No partial summary is
/// produced in either case.
pub fn get_summary(filter: &SummaryFilter, connection: &Connection) -> Result<Summary, Error> {
    let transactions = list_transactions(&filter.transaction_filter(), connection)?;

    summarize(filter, transactions)
}

/// A route handler that returns spending grouped by category and payer.
pub async fn get_summary_endpoint(
    State(state): State<SummaryState>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<Summary>, Error> {
    let Query(query) = query.map_err(|rejection| Error::InvalidPayload(rejection.to_string()))?;
    let timezone = get_timezone(&state.local_timezone)?;
    let filter = SummaryFilter::from_query(query, now_in(timezone), timezone);

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    get_summary(&filter, &connection).map(Json)
}
