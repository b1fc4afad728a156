//! Filtered transaction listings and spending totals.

use std::collections::{BTreeSet, HashMap};

use rusqlite::{Connection, Row, params_from_iter, types::Value};
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    category::CategoryName,
    database_id::{CategoryId, TransactionId},
    date_range::{DateRange, rfc3339},
    db::{get_decimal, get_timestamp},
    user::UserId,
};

/// Selects transactions by time, category and payer.
///
/// All conditions must hold for a transaction to match. An empty category set
/// matches every category, otherwise a transaction must be in one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    from: Option<OffsetDateTime>,
    to: Option<OffsetDateTime>,
    category_ids: BTreeSet<CategoryId>,
    payer: Option<UserId>,
}

impl TransactionFilter {
    /// A filter that matches every transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only match transactions within `range`, inclusive of both ends.
    pub fn within(self, range: DateRange) -> Self {
        self.from(Some(range.start)).to(Some(range.end))
    }

    /// Only match transactions at or after `from`, `None` removes the bound.
    pub fn from(mut self, from: Option<OffsetDateTime>) -> Self {
        self.from = from;
        self
    }

    /// Only match transactions at or before `to`, `None` removes the bound.
    pub fn to(mut self, to: Option<OffsetDateTime>) -> Self {
        self.to = to;
        self
    }

    /// Only match transactions in one of `category_ids`.
    pub fn categories(mut self, category_ids: impl IntoIterator<Item = CategoryId>) -> Self {
        self.category_ids = category_ids.into_iter().collect();
        self
    }

    /// Only match transactions paid by `payer`, `None` matches both users.
    pub fn payer(mut self, payer: Option<UserId>) -> Self {
        self.payer = payer;
        self
    }

    /// Build the WHERE clause and its parameters.
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(from) = self.from {
            params.push(Value::Integer(ceil_unix_timestamp(from)));
            conditions.push(format!("\"transaction\".occurred_at >= ?{}", params.len()));
        }

        if let Some(to) = self.to {
            params.push(Value::Integer(to.unix_timestamp()));
            conditions.push(format!("\"transaction\".occurred_at <= ?{}", params.len()));
        }

        if !self.category_ids.is_empty() {
            let placeholders: Vec<String> = self
                .category_ids
                .iter()
                .map(|category_id| {
                    params.push(Value::Integer(*category_id));
                    format!("?{}", params.len())
                })
                .collect();

            conditions.push(format!(
                "\"transaction\".category_id IN ({})",
                placeholders.join(", ")
            ));
        }

        if let Some(payer) = self.payer {
            params.push(Value::Text(payer.as_str().to_owned()));
            conditions.push(format!("\"transaction\".payer = ?{}", params.len()));
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

/// Timestamps are stored in whole seconds, so a lower bound with a fraction
/// of a second starts at the next second.
fn ceil_unix_timestamp(instant: OffsetDateTime) -> i64 {
    if instant.nanosecond() > 0 {
        instant.unix_timestamp() + 1
    } else {
        instant.unix_timestamp()
    }
}

/// The category of a [TransactionDetail].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: CategoryName,
}

/// The payer of a [TransactionDetail].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayerSummary {
    pub id: UserId,
    pub display_name: String,
}

/// A transaction with its category name and payer display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDetail {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent.
    pub amount: Decimal,
    /// When the money was spent.
    #[serde(serialize_with = "rfc3339::serialize")]
    pub occurred_at: OffsetDateTime,
    /// An optional free text note.
    pub note: Option<String>,
    /// The category the money was spent on.
    pub category: CategorySummary,
    /// The user who paid.
    pub payer: PayerSummary,
}

const DETAIL_QUERY: &str = "SELECT \"transaction\".id, amount, occurred_at, note, \
    category.id, category.name, user.id, user.display_name \
    FROM \"transaction\" \
    INNER JOIN category ON \"transaction\".category_id = category.id \
    INNER JOIN user ON \"transaction\".payer = user.id";

/// Get the transactions matching `filter`, most recent first.
///
/// Transactions at the same time are listed in the order they were created.
///
/// # Errors
/// Returns [Error::SqlError] if the query or row mapping fails.
pub fn list_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<TransactionDetail>, Error> {
    let (where_clause, params) = filter.where_clause();
    let query = format!(
        "{DETAIL_QUERY} {where_clause} \
        ORDER BY \"transaction\".occurred_at DESC, \"transaction\".id ASC"
    );

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params), map_detail_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Get a single transaction with its category and payer names.
///
/// # Errors
/// Returns [Error::NotFound] if there is no transaction with the ID `id`.
pub fn get_transaction_detail(
    id: TransactionId,
    connection: &Connection,
) -> Result<TransactionDetail, Error> {
    let query = format!("{DETAIL_QUERY} WHERE \"transaction\".id = ?1");

    connection
        .prepare(&query)?
        .query_row([id], map_detail_row)
        .map_err(|error| error.into())
}

/// Total the amount spent in each category within `range`.
///
/// Categories without spending in the range are left out. Amounts that are
/// not positive are ignored.
///
/// # Errors
///
/// Returns an [Error::AmountOverflow] if a category's total does not fit in a
/// [Decimal].
pub fn sum_spending_by_category(
    range: DateRange,
    connection: &Connection,
) -> Result<HashMap<CategoryId, Decimal>, Error> {
    let mut statement = connection.prepare(
        "SELECT category_id, amount FROM \"transaction\"
         WHERE occurred_at >= ?1 AND occurred_at <= ?2",
    )?;
    let rows = statement.query_map(
        (ceil_unix_timestamp(range.start), range.end.unix_timestamp()),
        |row| Ok((row.get::<_, CategoryId>(0)?, get_decimal(row, 1)?)),
    )?;

    let mut totals = HashMap::new();

    for row in rows {
        let (category_id, amount) = row?;

        if amount <= Decimal::ZERO {
            continue;
        }

        let total = totals.entry(category_id).or_insert(Decimal::ZERO);
        *total = total.checked_add(amount).ok_or(Error::AmountOverflow)?;
    }

    Ok(totals)
}

fn map_detail_row(row: &Row) -> Result<TransactionDetail, rusqlite::Error> {
    let raw_category_name: String = row.get(5)?;

    Ok(TransactionDetail {
        id: row.get(0)?,
        amount: get_decimal(row, 1)?,
        occurred_at: get_timestamp(row, 2)?,
        note: row.get(3)?,
        category: CategorySummary {
            id: row.get(4)?,
            name: CategoryName::new_unchecked(&raw_category_name),
        },
        payer: PayerSummary {
            id: row.get(6)?,
            display_name: row.get(7)?,
        },
    })
}
