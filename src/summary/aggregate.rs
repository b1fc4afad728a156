//! Groups the transactions of a summary by category and by payer.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    category::CategoryName,
    database_id::CategoryId,
    date_range::rfc3339,
    summary::{Period, SummaryFilter},
    transaction::TransactionDetail,
    user::UserId,
};

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpending {
    /// The ID of the category.
    pub category_id: CategoryId,
    /// The name of the category.
    pub category_name: CategoryName,
    /// The total spent in the category.
    pub amount: Decimal,
    /// The number of transactions in the category.
    pub count: usize,
    /// The share of the total spending, from 0 to 100 rounded to two decimal places.
    pub percentage: Decimal,
}

/// The total spent by one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayerSpending {
    /// The user who paid.
    pub payer_id: UserId,
    /// The display name of the user.
    pub payer_name: String,
    /// The total paid by the user.
    pub amount: Decimal,
}

/// Spending over a period, grouped by category and payer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// The period the summary was requested for.
    pub period: Period,
    /// The first instant included in the summary.
    #[serde(serialize_with = "rfc3339::serialize")]
    pub from: OffsetDateTime,
    /// The last instant included in the summary.
    #[serde(serialize_with = "rfc3339::serialize")]
    pub to: OffsetDateTime,
    /// The total spent over the period.
    pub total_spending: Decimal,
    /// Spending per category, largest first.
    pub spending_by_category: Vec<CategorySpending>,
    /// Spending per payer, largest first.
    pub spending_by_payer: Vec<PayerSpending>,
    /// The matching transactions, most recent first.
    pub transactions: Vec<TransactionDetail>,
}

/// The share of `total` that `amount` makes up, as a percentage rounded to two
/// decimal places. Zero if `total` is zero.
///
/// Returns `None` if the percentage does not fit in a [Decimal].
pub fn percentage_of(amount: Decimal, total: Decimal) -> Option<Decimal> {
    if total.is_zero() {
        return Some(Decimal::ZERO);
    }

    amount
        .checked_div(total)?
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|percentage| percentage.round_dp(2))
}

fn add(total: Decimal, amount: Decimal) -> Result<Decimal, Error> {
    total.checked_add(amount).ok_or(Error::AmountOverflow)
}

/// Total up `transactions`, which should already match `filter`.
///
/// Amounts that are not positive are left out of the totals, but the
/// transactions themselves are returned unchanged.
///
/// # Errors
///
/// Returns an [Error::AmountOverflow] if a total does not fit in a [Decimal].
pub fn summarize(
    filter: &SummaryFilter,
    transactions: Vec<TransactionDetail>,
) -> Result<Summary, Error> {
    let mut total_spending = Decimal::ZERO;
    let mut by_category: HashMap<CategoryId, CategorySpending> = HashMap::new();
    let mut by_payer: HashMap<UserId, PayerSpending> = HashMap::new();

    for transaction in transactions.iter().filter(|t| t.amount > Decimal::ZERO) {
        total_spending = add(total_spending, transaction.amount)?;

        let category = by_category
            .entry(transaction.category.id)
            .or_insert_with(|| CategorySpending {
                category_id: transaction.category.id,
                category_name: transaction.category.name.clone(),
                amount: Decimal::ZERO,
                count: 0,
                percentage: Decimal::ZERO,
            });
        category.amount = add(category.amount, transaction.amount)?;
        category.count += 1;

        let payer = by_payer
            .entry(transaction.payer.id)
            .or_insert_with(|| PayerSpending {
                payer_id: transaction.payer.id,
                payer_name: transaction.payer.display_name.clone(),
                amount: Decimal::ZERO,
            });
        payer.amount = add(payer.amount, transaction.amount)?;
    }

    let mut spending_by_category = by_category
        .into_values()
        .map(|mut category| {
            category.percentage =
                percentage_of(category.amount, total_spending).ok_or(Error::AmountOverflow)?;
            Ok(category)
        })
        .collect::<Result<Vec<CategorySpending>, Error>>()?;
    spending_by_category.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.category_name.as_ref().cmp(b.category_name.as_ref()))
            .then_with(|| a.category_id.cmp(&b.category_id))
    });

    let mut spending_by_payer: Vec<PayerSpending> = by_payer.into_values().collect();
    spending_by_payer.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.payer_id.cmp(&b.payer_id))
    });

    let range = filter.range();

    Ok(Summary {
        period: filter.period(),
        from: range.start,
        to: range.end,
        total_spending,
        spending_by_category,
        spending_by_payer,
        transactions,
    })
}
