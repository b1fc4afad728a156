//! Budget amounts, override precedence and the monthly budget view.

use std::fmt::Display;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    Error,
    category::CategoryName,
    database_id::CategoryId,
    date_range::MonthKey,
    transaction::MAX_AMOUNT,
};

/// A validated, non-negative budget amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BudgetAmount(Decimal);

impl BudgetAmount {
    /// A budget of zero.
    pub const ZERO: BudgetAmount = BudgetAmount(Decimal::ZERO);

    /// Create a budget amount.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::NegativeBudget] if `amount` is less than zero,
    /// or an [Error::AmountTooLarge] if it is greater than [MAX_AMOUNT].
    pub fn new(amount: Decimal) -> Result<Self, Error> {
        if amount < Decimal::ZERO {
            Err(Error::NegativeBudget(amount))
        } else if amount > MAX_AMOUNT {
            Err(Error::AmountTooLarge {
                amount,
                max: MAX_AMOUNT,
            })
        } else {
            // Drops the sign from negative zero.
            Ok(Self(amount.abs()))
        }
    }

    /// The amount as a decimal.
    pub fn get(self) -> Decimal {
        self.0
    }
}

impl Display for BudgetAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pick the budget that applies to a category for one month.
///
/// The month's override wins over the category default, and a category with
/// neither has a budget of zero.
pub fn resolve_budget(override_budget: Option<Decimal>, default_budget: Option<Decimal>) -> Decimal {
    override_budget.or(default_budget).unwrap_or(Decimal::ZERO)
}

/// A budget amount that replaces a category's default for a single month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetOverride {
    /// The category the override applies to.
    pub category_id: CategoryId,
    /// The month the override applies to.
    pub month: MonthKey,
    /// The budget for the month.
    pub amount: Decimal,
}

/// A category's budget settings for one month, before spending is added.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBudget {
    pub category_id: CategoryId,
    pub category_name: CategoryName,
    pub default_budget: Option<Decimal>,
    pub override_budget: Option<Decimal>,
}

/// How a category's spending for one month compares to its budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetRow {
    /// The ID of the category.
    pub category_id: CategoryId,
    /// The name of the category.
    pub category_name: CategoryName,
    /// The category's default budget, if set.
    pub default_budget: Option<Decimal>,
    /// The override for the month, if set.
    pub override_budget: Option<Decimal>,
    /// The budget that applies for the month, see [resolve_budget].
    pub effective_budget: Decimal,
    /// The total spent in the category during the month.
    pub spent: Decimal,
    /// The effective budget minus the amount spent, negative when overspent.
    pub left: Decimal,
    /// Whether the month has an override for the category.
    pub has_override: bool,
}

impl BudgetRow {
    /// Combine a category's budget settings with its spending for the month.
    pub fn new(budget: CategoryBudget, spent: Decimal) -> Self {
        let effective_budget = resolve_budget(budget.override_budget, budget.default_budget);

        Self {
            category_id: budget.category_id,
            category_name: budget.category_name,
            default_budget: budget.default_budget,
            override_budget: budget.override_budget,
            effective_budget,
            spent,
            left: effective_budget - spent,
            has_override: budget.override_budget.is_some(),
        }
    }
}

/// The budget view for every category in one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBudgets {
    /// The month the budgets were resolved for.
    pub month: MonthKey,
    /// One row per category, ordered by category name.
    pub budgets: Vec<BudgetRow>,
}

#[cfg(test)]
mod resolve_budget_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::resolve_budget;

    #[test]
    fn override_wins_over_default() {
        assert_eq!(resolve_budget(Some(dec!(1500)), Some(dec!(1000))), dec!(1500));
    }

    #[test]
    fn zero_override_still_wins() {
        assert_eq!(resolve_budget(Some(Decimal::ZERO), Some(dec!(1000))), Decimal::ZERO);
    }

    #[test]
    fn default_used_without_override() {
        assert_eq!(resolve_budget(None, Some(dec!(1000))), dec!(1000));
    }

    #[test]
    fn zero_without_override_or_default() {
        assert_eq!(resolve_budget(None, None), Decimal::ZERO);
    }
}

#[cfg(test)]
mod budget_amount_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::{Error, budget::BudgetAmount, transaction::MAX_AMOUNT};

    #[test]
    fn rejects_negative_amounts() {
        assert_eq!(
            BudgetAmount::new(dec!(-0.01)),
            Err(Error::NegativeBudget(dec!(-0.01)))
        );
    }

    #[test]
    fn accepts_zero_and_positive_amounts() {
        assert_eq!(BudgetAmount::new(Decimal::ZERO), Ok(BudgetAmount::ZERO));
        assert_eq!(BudgetAmount::new(dec!(12.34)).map(BudgetAmount::get), Ok(dec!(12.34)));
    }

    #[test]
    fn rejects_amounts_above_maximum() {
        let amount = MAX_AMOUNT + dec!(0.01);

        assert_eq!(
            BudgetAmount::new(amount),
            Err(Error::AmountTooLarge {
                amount,
                max: MAX_AMOUNT
            })
        );
        assert!(BudgetAmount::new(Decimal::MAX).is_err());
    }

    #[test]
    fn negative_zero_is_zero() {
        let amount = BudgetAmount::new(-Decimal::ZERO).unwrap();

        assert_eq!(amount.to_string(), "0");
    }
}

#[cfg(test)]
mod budget_row_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::{
        budget::{BudgetRow, domain::CategoryBudget},
        category::CategoryName,
    };

    fn groceries(default_budget: Option<Decimal>, override_budget: Option<Decimal>) -> CategoryBudget {
        CategoryBudget {
            category_id: 1,
            category_name: CategoryName::new_unchecked("Groceries"),
            default_budget,
            override_budget,
        }
    }

    #[test]
    fn no_budget_means_left_is_negative_spent() {
        let row = BudgetRow::new(groceries(None, None), dec!(42.50));

        assert_eq!(row.effective_budget, Decimal::ZERO);
        assert_eq!(row.left, dec!(-42.50));
        assert!(!row.has_override);
    }

    #[test]
    fn overspend_is_reported_as_negative_left() {
        let row = BudgetRow::new(groceries(Some(dec!(1000)), None), dec!(1200));

        assert_eq!(row.effective_budget, dec!(1000));
        assert_eq!(row.spent, dec!(1200));
        assert_eq!(row.left, dec!(-200));
    }

    #[test]
    fn override_sets_effective_budget() {
        let row = BudgetRow::new(groceries(Some(dec!(1000)), Some(dec!(1500))), dec!(1200));

        assert_eq!(row.effective_budget, dec!(1500));
        assert_eq!(row.left, dec!(300));
        assert!(row.has_override);
    }
}
