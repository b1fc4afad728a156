//! Database operations for categories.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error,
    budget::BudgetAmount,
    category::{Category, CategoryName},
    database_id::CategoryId,
    db::get_optional_decimal,
};

/// Create a category with no default budget and return it with its generated ID.
///
/// # Errors
///
/// Returns an [Error::DuplicateCategoryName] if a category with the same name,
/// ignoring case, already exists.
pub fn create_category(name: CategoryName, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare(
            "INSERT INTO category (name, name_key) VALUES (?1, ?2)
             RETURNING id, name, default_budget",
        )?
        .query_row((name.as_ref(), name.key()), map_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(name.to_string()),
            error => error.into(),
        })
}

/// Retrieve a single category by ID.
///
/// # Errors
///
/// Returns an [Error::CategoryNotFound] if there is no category with the ID `category_id`.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, default_budget FROM category WHERE id = :id")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::CategoryNotFound(category_id),
            error => error.into(),
        })
}

/// Retrieve the category whose name matches `name`, ignoring case.
pub fn get_category_by_name(
    name: &CategoryName,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    connection
        .prepare("SELECT id, name, default_budget FROM category WHERE name_key = :key")?
        .query_row(&[(":key", &name.key())], map_row)
        .optional()
        .map_err(|error| error.into())
}

/// Get the category named `name`, creating it if it does not exist yet.
pub fn find_or_create_category(
    name: CategoryName,
    connection: &Connection,
) -> Result<Category, Error> {
    match get_category_by_name(&name, connection)? {
        Some(category) => Ok(category),
        None => {
            tracing::info!("creating category \"{name}\"");
            create_category(name, connection)
        }
    }
}

/// Retrieve all categories ordered alphabetically by name.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, default_budget FROM category ORDER BY name_key ASC, id ASC")?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Set or clear (with `None`) the default budget of a category.
///
/// # Errors
///
/// Returns an [Error::CategoryNotFound] if there is no category with the ID `category_id`.
pub fn set_default_budget(
    category_id: CategoryId,
    amount: Option<BudgetAmount>,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "UPDATE category SET default_budget = ?1 WHERE id = ?2
             RETURNING id, name, default_budget",
        )?
        .query_row(
            (amount.map(|amount| amount.to_string()), category_id),
            map_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::CategoryNotFound(category_id),
            error => error.into(),
        })
}

/// Initialize the category table.
///
/// Names are unique ignoring case: `name_key` holds the lowercase name (see
/// [CategoryName::key]). Default budgets are stored as decimal text.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL UNIQUE,
            default_budget TEXT
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let default_budget = get_optional_decimal(row, 2)?;

    Ok(Category {
        id,
        name: CategoryName::new_unchecked(&raw_name),
        default_budget,
    })
}
