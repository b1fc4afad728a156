//! Spending categories and their default budgets.

mod db;
mod domain;
mod endpoints;

pub use db::{
    create_category, create_category_table, find_or_create_category, get_all_categories,
    get_category, set_default_budget,
};
pub use domain::{Category, CategoryName};
pub use endpoints::{create_category_endpoint, get_categories_endpoint};
