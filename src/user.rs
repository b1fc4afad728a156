//! The two fixed users of the household and the user table.

use std::{
    fmt::Display,
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error};

/// Identifies one of the two users of the app.
///
/// The set of users is closed: the owner and their partner. Users are seeded
/// when the database is initialized and never created or deleted afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserId {
    /// The owner of the household budget.
    Owner,
    /// The owner's partner.
    Partner,
}

impl UserId {
    /// Both users, owner first.
    pub const ALL: [UserId; 2] = [UserId::Owner, UserId::Partner];

    /// The string used for this user in URLs, JSON and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserId::Owner => "owner",
            UserId::Partner => "partner",
        }
    }

    /// Whether this user has owner rights.
    pub fn is_owner(&self) -> bool {
        matches!(self, UserId::Owner)
    }

    /// Whether this user may delete a transaction paid by `payer`.
    ///
    /// Users can always delete their own transactions. The owner may also
    /// delete the partner's transactions, but not the other way around.
    pub fn can_delete_transaction_paid_by(&self, payer: UserId) -> bool {
        *self == payer || (self.is_owner() && payer == UserId::Partner)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The string did not name one of the two users.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("\"{0}\" is not a known user")]
pub struct UnknownUser(pub String);

impl FromStr for UserId {
    type Err = UnknownUser;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(UserId::Owner),
            "partner" => Ok(UserId::Partner),
            other => Err(UnknownUser(other.to_owned())),
        }
    }
}

/// Parse an optional payer filter.
///
/// Anything but `owner` or `partner` means no filter rather than an error.
pub fn parse_payer_filter(raw: Option<&str>) -> Option<UserId> {
    match raw?.parse() {
        Ok(payer) => Some(payer),
        Err(error) => {
            tracing::debug!("ignoring payer filter: {error}");
            None
        }
    }
}

impl ToSql for UserId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for UserId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// Which of the two users this is.
    pub id: UserId,
    /// The name shown next to the user's transactions.
    pub display_name: String,
    /// Whether the user has owner rights.
    pub is_owner: bool,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id TEXT PRIMARY KEY CHECK (id IN ('owner', 'partner')),
                display_name TEXT NOT NULL,
                is_owner INTEGER NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Insert the owner and partner if they are not in the database yet.
///
/// Existing users, and their display names, are left untouched.
pub fn seed_users(connection: &Connection) -> Result<(), rusqlite::Error> {
    let mut statement = connection
        .prepare("INSERT OR IGNORE INTO user (id, display_name, is_owner) VALUES (?1, ?2, ?3)")?;

    for user_id in UserId::ALL {
        let default_name = match user_id {
            UserId::Owner => "Owner",
            UserId::Partner => "Partner",
        };
        statement.execute((user_id, default_name, user_id.is_owner()))?;
    }

    Ok(())
}

/// Change the name shown for `user_id`.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn set_display_name(
    user_id: UserId,
    display_name: &str,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE user SET display_name = ?1 WHERE id = ?2",
        (display_name.trim(), user_id),
    )?;

    Ok(())
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - the users have not been seeded.
/// - there was an error trying to access the store.
pub fn get_user(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, display_name, is_owner FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id)], map_row)
        .map_err(|error| error.into())
}

/// Get both users, owner first.
pub fn get_all_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare("SELECT id, display_name, is_owner FROM user ORDER BY is_owner DESC")?
        .query_map([], map_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        is_owner: row.get(2)?,
    })
}

/// The state needed to look up users.
#[derive(Debug, Clone)]
pub struct UserState {
    /// The database connection for reading users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns both users.
pub async fn get_users_endpoint(State(state): State<UserState>) -> Result<Json<Vec<User>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    get_all_users(&connection).map(Json)
}

/// A route handler that returns the logged in user.
pub async fn get_current_user_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<User>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    get_user(user_id, &connection).map(Json)
}


#[cfg(test)]
mod user_table_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        user::{User, UserId, create_user_table, get_all_users, get_user, seed_users, set_display_name},
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        connection
    }

    #[test]
    fn get_user_before_seeding_returns_not_found() {
        let connection = get_test_connection();

        assert_eq!(get_user(UserId::Owner, &connection), Err(Error::NotFound));
    }

    #[test]
    fn seeding_creates_both_users() {
        let connection = get_test_connection();

        seed_users(&connection).unwrap();

        let users = get_all_users(&connection).unwrap();
        assert_eq!(
            users,
            vec![
                User {
                    id: UserId::Owner,
                    display_name: "Owner".to_owned(),
                    is_owner: true,
                },
                User {
                    id: UserId::Partner,
                    display_name: "Partner".to_owned(),
                    is_owner: false,
                },
            ]
        );
    }

    #[test]
    fn seeding_twice_keeps_display_names() {
        let connection = get_test_connection();
        seed_users(&connection).unwrap();
        set_display_name(UserId::Partner, "Hila", &connection).unwrap();

        seed_users(&connection).unwrap();

        let partner = get_user(UserId::Partner, &connection).unwrap();
        assert_eq!(partner.display_name, "Hila");
        assert_eq!(get_all_users(&connection).unwrap().len(), 2);
    }

    #[test]
    fn table_rejects_unknown_user_ids() {
        let connection = get_test_connection();

        let result = connection.execute(
            "INSERT INTO user (id, display_name, is_owner) VALUES ('guest', 'Guest', 0)",
            (),
        );

        assert!(result.is_err());
    }
}
