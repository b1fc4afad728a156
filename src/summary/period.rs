//! Named reporting periods and the immutable filter for a summary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time_tz::Tz;

use crate::{
    database_id::CategoryId,
    date_range::{Bound, DateRange, MonthKey, parse_optional_bound},
    transaction::TransactionFilter,
    user::{UserId, parse_payer_filter},
};

/// The time span a summary covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    /// From the first to the last instant of the current month.
    #[default]
    ThisMonth,
    /// From the first to the last instant of the previous month.
    LastMonth,
    /// A range chosen by the caller.
    Custom,
}

impl Period {
    /// Parse a period name, a missing or unknown name means [Period::ThisMonth].
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw {
            Some("this-month") | None => Period::ThisMonth,
            Some("last-month") => Period::LastMonth,
            Some("custom") => Period::Custom,
            Some(other) => {
                tracing::debug!("unknown period {other:?}, using this-month");
                Period::ThisMonth
            }
        }
    }

    /// The range covered by the period at the time `now` in `timezone`.
    ///
    /// For [Period::Custom], `from` and `to` may be RFC 3339 timestamps or
    /// `yyyy-MM-dd` dates. Each one falls back to the start or end of the
    /// current month on its own if it is missing or cannot be parsed.
    pub fn resolve(
        self,
        now: OffsetDateTime,
        timezone: &Tz,
        from: Option<&str>,
        to: Option<&str>,
    ) -> DateRange {
        let this_month = MonthKey::containing(now);

        match self {
            Period::ThisMonth => this_month.range(timezone),
            Period::LastMonth => this_month.previous().range(timezone),
            Period::Custom => {
                let fallback = this_month.range(timezone);

                DateRange {
                    start: parse_optional_bound(from, Bound::Start, timezone)
                        .unwrap_or(fallback.start),
                    end: parse_optional_bound(to, Bound::End, timezone).unwrap_or(fallback.end),
                }
            }
        }
    }
}

/// The query parameters of the summary endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// One of `this-month`, `last-month` or `custom`.
    pub period: Option<String>,
    /// The start of a custom period.
    pub from: Option<String>,
    /// The end of a custom period.
    pub to: Option<String>,
    /// Only include these categories, may be repeated.
    #[serde(default)]
    pub category_id: Vec<CategoryId>,
    /// Only include transactions paid by this user.
    pub payer: Option<String>,
}

/// Which transactions a summary covers.
///
/// Built once from the request and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryFilter {
    period: Period,
    range: DateRange,
    category_ids: BTreeSet<CategoryId>,
    payer: Option<UserId>,
}

impl SummaryFilter {
    /// Create a filter for `range`.
    pub fn new(
        period: Period,
        range: DateRange,
        category_ids: impl IntoIterator<Item = CategoryId>,
        payer: Option<UserId>,
    ) -> Self {
        Self {
            period,
            range,
            category_ids: category_ids.into_iter().collect(),
            payer,
        }
    }

    /// Resolve the query parameters at the time `now` in `timezone`.
    ///
    /// Malformed dates, periods and payers fall back to their defaults.
    pub fn from_query(query: SummaryQuery, now: OffsetDateTime, timezone: &Tz) -> Self {
        let period = Period::parse_or_default(query.period.as_deref());
        let range = period.resolve(
            now,
            timezone,
            query.from.as_deref(),
            query.to.as_deref(),
        );
        let payer = parse_payer_filter(query.payer.as_deref());

        Self::new(period, range, query.category_id, payer)
    }

    /// The period the filter was built from.
    pub fn period(&self) -> Period {
        self.period
    }

    /// The inclusive range of the summary.
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// The transactions that match this filter.
    pub fn transaction_filter(&self) -> TransactionFilter {
        TransactionFilter::new()
            .within(self.range)
            .categories(self.category_ids.iter().copied())
            .payer(self.payer)
    }
}
