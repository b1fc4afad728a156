//! Merges default budgets, monthly overrides and actual spending into the
//! budget view for a month.

use rusqlite::Connection;
use rust_decimal::Decimal;
use time_tz::Tz;

use crate::{
    Error,
    budget::{BudgetRow, MonthBudgets, db::list_category_budgets},
    date_range::MonthKey,
    transaction::sum_spending_by_category,
};

/// Resolve the effective budget, spending and remaining budget of every
/// category for `month`.
///
/// The month spans from its first to its last instant (inclusive) in `timezone`.
/// Categories without any spending have spent zero.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the categories or spending could not be read.
pub fn resolve_month_budgets(
    month: MonthKey,
    timezone: &Tz,
    connection: &Connection,
) -> Result<MonthBudgets, Error> {
    let range = month.range(timezone);
    let category_budgets = list_category_budgets(month, connection)?;
    let spending = sum_spending_by_category(range, connection)?;

    let budgets = category_budgets
        .into_iter()
        .map(|budget| {
            let spent = spending
                .get(&budget.category_id)
                .copied()
                .unwrap_or(Decimal::ZERO);

            BudgetRow::new(budget, spent)
        })
        .collect();

    Ok(MonthBudgets { month, budgets })
}
