//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}', use [format_endpoint].

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to access users.
pub const USERS: &str = "/api/users";
/// The route to get the logged in user.
pub const CURRENT_USER: &str = "/api/users/me";
/// The route to list and create categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to view and set budgets.
pub const BUDGETS: &str = "/api/budgets";
/// The route to clear a budget override.
pub const BUDGET_OVERRIDE: &str = "/api/budgets/{category_id}/{month}";
/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to delete a transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for spending summaries.
pub const SUMMARY: &str = "/api/summary";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// Call it once per parameter for paths with more than one.
///
/// # Examples
///
/// ```
/// use budgety::endpoints::format_endpoint;
///
/// assert_eq!(format_endpoint("/api/transactions/{transaction_id}", 1), "/api/transactions/1");
/// assert_eq!(
///     format_endpoint(&format_endpoint("/api/budgets/{category_id}/{month}", 3), "2024-05"),
///     "/api/budgets/3/2024-05"
/// );
/// ```
pub fn format_endpoint(endpoint_path: &str, id: impl std::fmt::Display) -> String {
    let (Some(param_start), Some(param_end)) = (endpoint_path.find('{'), endpoint_path.find('}'))
    else {
        return endpoint_path.to_owned();
    };

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end + 1..]
    )
}
