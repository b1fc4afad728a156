//! Database initialization and helpers for reading column types that SQLite
//! does not store natively.

use rusqlite::{Connection, Row, Transaction as SqlTransaction, types::Type};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    budget::create_budget_override_table, category::create_category_table,
    transaction::create_transaction_table, user::create_user_table, user::seed_users,
};

/// Create the application tables if they do not exist and seed the two users.
///
/// # Errors
///
/// Returns an error if foreign keys could not be enabled or any of the tables
/// could not be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_budget_override_table(&transaction)?;
    create_transaction_table(&transaction)?;
    seed_users(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Read a decimal stored as TEXT from column `index`.
pub fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let raw: String = row.get(index)?;

    parse_decimal(&raw, index)
}

/// Read a nullable decimal stored as TEXT from column `index`.
pub fn get_optional_decimal(row: &Row, index: usize) -> Result<Option<Decimal>, rusqlite::Error> {
    let raw: Option<String> = row.get(index)?;

    raw.map(|raw| parse_decimal(&raw, index)).transpose()
}

/// Read a unix timestamp (in seconds) from column `index`.
pub fn get_timestamp(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let seconds: i64 = row.get(index)?;

    OffsetDateTime::from_unix_timestamp(seconds).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(error))
    })
}

fn parse_decimal(raw: &str, index: usize) -> Result<Decimal, rusqlite::Error> {
    raw.parse::<Decimal>()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    use crate::{
        db::{get_decimal, get_optional_decimal, get_timestamp, initialize},
        user::get_all_users,
    };

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();
        initialize(&connection).unwrap();

        assert_eq!(get_all_users(&connection).unwrap().len(), 2);
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let enabled: bool = connection
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert!(enabled);
    }

    #[test]
    fn reads_decimal_text_columns() {
        let connection = Connection::open_in_memory().unwrap();

        let (amount, missing) = connection
            .query_row("SELECT '12.50', NULL", [], |row| {
                Ok((get_decimal(row, 0)?, get_optional_decimal(row, 1)?))
            })
            .unwrap();

        assert_eq!(amount, dec!(12.50));
        assert_eq!(missing, None);
    }

    #[test]
    fn rejects_non_numeric_text() {
        let connection = Connection::open_in_memory().unwrap();

        let result = connection.query_row("SELECT 'twelve'", [], |row| get_decimal(row, 0));

        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(0, _, _))
        ));
    }

    #[test]
    fn reads_unix_timestamps() {
        let connection = Connection::open_in_memory().unwrap();

        let instant = connection
            .query_row("SELECT 1717200000", [], |row| get_timestamp(row, 0))
            .unwrap();

        assert_eq!(instant, datetime!(2024-06-01 00:00:00 UTC));
    }
}
