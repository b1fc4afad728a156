//! Core category domain types.

use std::fmt::Display;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{Error, database_id::CategoryId};

/// A validated, non-empty category name with surrounding whitespace removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Hash)]
#[serde(transparent)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is
    /// empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is trimmed and not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// The lowercase form of the name, used to compare names ignoring case.
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A spending category, e.g. "Groceries" or "Rent".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The unique (ignoring case) name of the category.
    pub name: CategoryName,
    /// The budget used for any month without an override, if set.
    pub default_budget: Option<Decimal>,
}
