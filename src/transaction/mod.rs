//! Transaction management for the household budget.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, filtering, totalling and deleting transactions
//! - Route handlers for the transaction API

mod core;
mod endpoints;
mod query;

pub use core::{
    MAX_AMOUNT, Transaction, create_transaction, create_transaction_table, delete_transaction,
    ensure_positive_amount,
};
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, get_transactions_endpoint,
};
pub use query::{
    TransactionDetail, TransactionFilter, get_transaction_detail, list_transactions,
    sum_spending_by_category,
};

#[cfg(test)]
pub use core::get_transaction;
#[cfg(test)]
pub use query::{CategorySummary, PayerSummary};
