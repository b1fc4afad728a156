//! Budgety is a JSON API for a household budget shared by two people.
//!
//! The owner and their partner log in with a shared code, record what they
//! spend against categories, set monthly budgets per category and see where
//! the money went. Budgets resolve month by month: an override for a month
//! wins over the category's default budget, which wins over zero.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod auth;
mod budget;
mod category;
mod database_id;
mod date_range;
mod db;
pub mod endpoints;
mod error;
mod logging;
mod routing;
mod summary;
mod timezone;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{RateLimiter, WindowedRateLimiter};
pub use budget::{BudgetAmount, upsert_override};
pub use category::{CategoryName, find_or_create_category, set_default_budget};
pub use date_range::MonthKey;
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::logging_middleware;
pub use routing::build_router;
pub use transaction::{Transaction, create_transaction};
pub use user::{UserId, set_display_name};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
