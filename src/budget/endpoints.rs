//! Route handlers for viewing and setting budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{
        FromRef, Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    AppState, Error,
    budget::{
        BudgetAmount, BudgetOverride, MonthBudgets, delete_override, find_override,
        resolve_month_budgets, upsert_override,
    },
    category::{Category, set_default_budget},
    database_id::CategoryId,
    date_range::MonthKey,
    timezone::{get_timezone, now_in},
};

/// The state needed to view and set budgets.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the budget view.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetQuery {
    /// The month to show in the format `yyyy-MM`, defaults to the current month.
    pub month: Option<String>,
}

/// A change to either a category's default budget or one month's override.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BudgetUpdate {
    /// Set the default budget of a category, `null` clears it.
    Default {
        category_id: CategoryId,
        /// Must be present in the body, only an explicit `null` clears the budget.
        #[serde(deserialize_with = "deserialize_nullable")]
        amount: Option<Decimal>,
    },
    /// Set the budget of a category for a single month.
    Override {
        category_id: CategoryId,
        month: String,
        amount: Decimal,
    },
}

// A `deserialize_with` field is required even if it is an `Option`.
fn deserialize_nullable<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Decimal>::deserialize(deserializer)
}

/// The result of a [BudgetUpdate].
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UpdatedBudget {
    /// The category with its new default budget.
    Default(Category),
    /// The new override.
    Override(BudgetOverride),
}

/// A route handler that returns the budget view for a month.
///
/// A missing or malformed month falls back to the current month.
pub async fn get_budgets_endpoint(
    State(state): State<BudgetState>,
    Query(query): Query<BudgetQuery>,
) -> Result<Json<MonthBudgets>, Error> {
    let timezone = get_timezone(&state.local_timezone)?;
    let month = MonthKey::parse_or(
        query.month.as_deref(),
        MonthKey::containing(now_in(timezone)),
    );

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    resolve_month_budgets(month, timezone, &connection).map(Json)
}

/// A route handler for setting a default budget or a monthly override.
pub async fn update_budget_endpoint(
    State(state): State<BudgetState>,
    payload: Result<Json<BudgetUpdate>, JsonRejection>,
) -> Result<Json<UpdatedBudget>, Error> {
    let Json(update) = payload.map_err(|rejection| Error::InvalidPayload(rejection.body_text()))?;

    match update {
        BudgetUpdate::Default {
            category_id,
            amount,
        } => {
            let amount = amount.map(BudgetAmount::new).transpose()?;

            let connection = state
                .db_connection
                .lock()
                .map_err(|_| Error::DatabaseLockError)?;

            let category = set_default_budget(category_id, amount, &connection)?;
            tracing::info!(
                "set default budget of category {category_id} to {:?}",
                category.default_budget
            );

            Ok(Json(UpdatedBudget::Default(category)))
        }
        BudgetUpdate::Override {
            category_id,
            month,
            amount,
        } => {
            let month: MonthKey = month.parse()?;
            let amount = BudgetAmount::new(amount)?;

            let connection = state
                .db_connection
                .lock()
                .map_err(|_| Error::DatabaseLockError)?;

            if let Some(previous) = find_override(category_id, month, &connection)? {
                tracing::debug!(
                    "replacing override of {} for category {category_id} in {month}",
                    previous.amount
                );
            }

            let budget_override = upsert_override(category_id, month, amount, &connection)?;
            tracing::info!("set budget of category {category_id} in {month} to {amount}");

            Ok(Json(UpdatedBudget::Override(budget_override)))
        }
    }
}

/// A route handler for removing a monthly override.
pub async fn delete_override_endpoint(
    State(state): State<BudgetState>,
    path: Result<Path<(CategoryId, String)>, PathRejection>,
) -> Result<StatusCode, Error> {
    let Path((category_id, month)) =
        path.map_err(|rejection| Error::InvalidPayload(rejection.body_text()))?;
    let month: MonthKey = month.parse()?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    delete_override(category_id, month, &connection)?;
    tracing::info!("removed override for category {category_id} in {month}");

    Ok(StatusCode::NO_CONTENT)
}
