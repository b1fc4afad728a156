//! Spending summaries over a period, grouped by category and by payer.

mod aggregate;
mod endpoint;
mod period;

pub use aggregate::{Summary, summarize};
pub use endpoint::get_summary_endpoint;
pub use period::{Period, SummaryFilter, SummaryQuery};
