//! Database operations for monthly budget overrides.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error,
    budget::{BudgetAmount, BudgetOverride, domain::CategoryBudget},
    category::CategoryName,
    database_id::CategoryId,
    date_range::MonthKey,
    db::{get_decimal, get_optional_decimal},
};

/// Set the budget for `category_id` in `month`, replacing any existing override.
///
/// The insert and update happen in a single statement keyed on the
/// category and month, so concurrent writers never create duplicates.
///
/// # Errors
///
/// Returns an [Error::CategoryNotFound] if `category_id` does not refer to a category.
pub fn upsert_override(
    category_id: CategoryId,
    month: MonthKey,
    amount: BudgetAmount,
    connection: &Connection,
) -> Result<BudgetOverride, Error> {
    connection
        .prepare(
            "INSERT INTO budget_override (category_id, month, amount) VALUES (?1, ?2, ?3)
             ON CONFLICT(category_id, month) DO UPDATE SET amount = excluded.amount
             RETURNING category_id, month, amount",
        )?
        .query_row((category_id, month, amount.to_string()), map_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::CategoryNotFound(category_id),
            error => error.into(),
        })
}

/// Retrieve the override for `category_id` in `month`, if there is one.
pub fn find_override(
    category_id: CategoryId,
    month: MonthKey,
    connection: &Connection,
) -> Result<Option<BudgetOverride>, Error> {
    connection
        .prepare(
            "SELECT category_id, month, amount FROM budget_override
             WHERE category_id = ?1 AND month = ?2",
        )?
        .query_row((category_id, month), map_row)
        .optional()
        .map_err(|error| error.into())
}

/// Remove the override for `category_id` in `month`, the category falls back
/// to its default budget for that month.
///
/// # Errors
///
/// Returns an [Error::DeleteMissingOverride] if there is no such override.
pub fn delete_override(
    category_id: CategoryId,
    month: MonthKey,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget_override WHERE category_id = ?1 AND month = ?2",
        (category_id, month),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingOverride);
    }

    Ok(())
}

/// Retrieve every category with its default budget and its override for
/// `month`, ordered by category name.
pub fn list_category_budgets(
    month: MonthKey,
    connection: &Connection,
) -> Result<Vec<CategoryBudget>, Error> {
    connection
        .prepare(
            "SELECT category.id, category.name, category.default_budget, budget_override.amount
             FROM category
             LEFT JOIN budget_override
                ON budget_override.category_id = category.id AND budget_override.month = ?1
             ORDER BY category.name_key ASC, category.id ASC",
        )?
        .query_map((month,), |row| {
            let raw_name: String = row.get(1)?;

            Ok(CategoryBudget {
                category_id: row.get(0)?,
                category_name: CategoryName::new_unchecked(&raw_name),
                default_budget: get_optional_decimal(row, 2)?,
                override_budget: get_optional_decimal(row, 3)?,
            })
        })?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// Initialize the budget override table.
///
/// Overrides are removed along with their category.
pub fn create_budget_override_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget_override (
            id INTEGER PRIMARY KEY,
            category_id INTEGER NOT NULL,
            month TEXT NOT NULL,
            amount TEXT NOT NULL,
            UNIQUE(category_id, month),
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<BudgetOverride, rusqlite::Error> {
    Ok(BudgetOverride {
        category_id: row.get(0)?,
        month: row.get(1)?,
        amount: get_decimal(row, 2)?,
    })
}
