//! Defines the core data model and database queries for transactions.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{CategoryId, TransactionId},
    date_range::rfc3339,
    db::{get_decimal, get_timestamp},
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Money spent by one of the users on something in a category.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent, always greater than zero.
    pub amount: Decimal,
    /// The ID of the category the money was spent on.
    pub category_id: CategoryId,
    /// The user who paid.
    pub payer: UserId,
    /// When the money was spent, to the second.
    #[serde(serialize_with = "rfc3339::serialize")]
    pub occurred_at: OffsetDateTime,
    /// An optional free text note.
    pub note: Option<String>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: Decimal, category_id: CategoryId, payer: UserId) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            category_id,
            payer,
            occurred_at: OffsetDateTime::now_utc(),
            note: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The time of the transaction defaults to now and the note to nothing.
///
/// # Examples
///
/// ```ignore
/// use rust_decimal_macros::dec;
/// use time::macros::datetime;
///
/// use crate::{transaction::{Transaction, create_transaction}, user::UserId};
///
/// let transaction = create_transaction(
///     Transaction::build(dec!(45.99), groceries.id, UserId::Partner)
///         .occurred_at(datetime!(2025-01-15 10:00 UTC))
///         .note(Some("Weekly shop".to_owned())),
///     &connection,
/// )?;
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The amount of money spent, must be greater than zero.
    pub amount: Decimal,
    /// The ID of an existing category.
    pub category_id: CategoryId,
    /// The user who paid.
    pub payer: UserId,
    /// When the money was spent. Stored with second precision.
    pub occurred_at: OffsetDateTime,
    /// An optional free text note, blank notes are stored as no note.
    pub note: Option<String>,
}

impl TransactionBuilder {
    /// Set when the transaction happened.
    pub fn occurred_at(mut self, occurred_at: OffsetDateTime) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// Set the note for the transaction.
    pub fn note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

/// The largest transaction or budget amount the app accepts, one trillion.
///
/// Keeps the totals of many amounts well inside the range of [Decimal].
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Check that `amount` is a valid transaction amount.
///
/// # Errors
///
/// Returns an [Error::NonPositiveAmount] if `amount` is zero or negative, or an
/// [Error::AmountTooLarge] if it is greater than [MAX_AMOUNT].
pub fn ensure_positive_amount(amount: Decimal) -> Result<Decimal, Error> {
    if amount <= Decimal::ZERO {
        Err(Error::NonPositiveAmount(amount))
    } else if amount > MAX_AMOUNT {
        Err(Error::AmountTooLarge {
            amount,
            max: MAX_AMOUNT,
        })
    } else {
        Ok(amount)
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::CategoryNotFound] if the category ID does not refer to a category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount = ensure_positive_amount(builder.amount)?;
    let note = builder
        .note
        .map(|note| note.trim().to_owned())
        .filter(|note| !note.is_empty());

    connection
        .prepare(
            "INSERT INTO \"transaction\" (amount, category_id, payer, occurred_at, note)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, amount, category_id, payer, occurred_at, note",
        )?
        .query_row(
            (
                amount.to_string(),
                builder.category_id,
                builder.payer,
                builder.occurred_at.unix_timestamp(),
                note,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::CategoryNotFound(builder.category_id),
            error => error.into(),
        })
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, amount, category_id, payer, occurred_at, note
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Delete the transaction `id` on behalf of `actor`.
///
/// Users may delete their own transactions, and the owner may also delete the
/// partner's transactions.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if `id` does not refer to a valid transaction,
/// - [Error::DeleteNotPermitted] if `actor` may not delete the transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_transaction(
    id: TransactionId,
    actor: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let payer = match get_transaction(id, connection) {
        Ok(transaction) => transaction.payer,
        Err(Error::NotFound) => return Err(Error::DeleteMissingTransaction),
        Err(error) => return Err(error),
    };

    if !actor.can_delete_transaction_paid_by(payer) {
        return Err(Error::DeleteNotPermitted { actor, payer });
    }

    connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    Ok(())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                payer TEXT NOT NULL,
                occurred_at INTEGER NOT NULL,
                note TEXT,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE,
                FOREIGN KEY(payer) REFERENCES user(id)
                )",
        (),
    )?;

    // Add composite index used by the budget and summary queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_occurred_at_category
         ON \"transaction\"(occurred_at, category_id);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        amount: get_decimal(row, 1)?,
        category_id: row.get(2)?,
        payer: row.get(3)?,
        occurred_at: get_timestamp(row, 4)?,
        note: row.get(5)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
