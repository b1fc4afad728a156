//! Default budgets, monthly overrides and the resolved budget view per month.

mod db;
mod domain;
mod endpoints;
mod resolver;

pub use db::{create_budget_override_table, delete_override, find_override, upsert_override};
pub use domain::{BudgetAmount, BudgetOverride, BudgetRow, MonthBudgets};
pub use endpoints::{delete_override_endpoint, get_budgets_endpoint, update_budget_endpoint};
pub use resolver::resolve_month_budgets;
