//! Route handlers for listing and creating categories.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    category::{Category, CategoryName, create_category, get_all_categories},
};

/// The state needed to list and create categories.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct NewCategoryData {
    /// The name of the new category.
    pub name: String,
}

/// A route handler that returns all categories ordered by name.
pub async fn get_categories_endpoint(
    State(state): State<CategoryState>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    get_all_categories(&connection).map(Json)
}

/// A route handler for creating a category, responds with the new category.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    payload: Result<Json<NewCategoryData>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let Json(data) = payload.map_err(|rejection| Error::InvalidPayload(rejection.body_text()))?;
    let name = CategoryName::new(&data.name)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let category = create_category(name, &connection)?;
    tracing::info!("created category {} \"{}\"", category.id, category.name);

    Ok((StatusCode::CREATED, Json(category)))
}
