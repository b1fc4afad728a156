//! Calendar helpers shared by the budget and summary queries: month keys,
//! inclusive date ranges and lenient parsing of range bounds.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Serialize, Serializer};
use time::{
    Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};
use time_tz::{OffsetResult, PrimitiveDateTimeExt, Tz};

use crate::Error;

/// Date format for plain range bounds, e.g. "2024-05-31".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// An inclusive range of instants: both `start` and `end` are part of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first instant in the range.
    pub start: OffsetDateTime,
    /// The last instant in the range.
    pub end: OffsetDateTime,
}

impl DateRange {
    /// Whether `instant` falls within the range, including both ends.
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// A calendar month, written as `yyyy-MM` (e.g. "2024-05").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthKey {
    year: i32,
    month: Month,
}

impl MonthKey {
    /// Create a month key.
    pub const fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }

    /// The month that `instant` falls in, in the instant's own offset.
    pub fn containing(instant: OffsetDateTime) -> Self {
        Self::new(instant.year(), instant.month())
    }

    /// Parse `raw`, falling back to `fallback` if it is missing or malformed.
    ///
    /// A bad month in a query is not an error, the caller just gets the
    /// fallback month (usually the current one).
    pub fn parse_or(raw: Option<&str>, fallback: MonthKey) -> MonthKey {
        match raw.map(str::parse::<MonthKey>) {
            Some(Ok(month)) => month,
            Some(Err(error)) => {
                tracing::debug!("{error}, falling back to {fallback}");
                fallback
            }
            None => fallback,
        }
    }

    /// The month before this one.
    pub fn previous(self) -> Self {
        match self.month {
            Month::January => Self::new(self.year - 1, Month::December),
            month => Self::new(self.year, month.previous()),
        }
    }

    /// The month after this one.
    pub fn next(self) -> Self {
        match self.month {
            Month::December => Self::new(self.year + 1, Month::January),
            month => Self::new(self.year, month.next()),
        }
    }

    /// The first and last instants of the month in `timezone`.
    ///
    /// The end is inclusive: it is the instant just before the next month
    /// starts. Each end takes the UTC offset in effect at that instant, so a
    /// month that spans a daylight saving change still starts and ends at
    /// local midnight.
    pub fn range(self, timezone: &Tz) -> DateRange {
        let start = self.first_instant(timezone);
        let end = self.next().first_instant(timezone) - Duration::NANOSECOND;

        DateRange { start, end }
    }

    fn first_instant(self, timezone: &Tz) -> OffsetDateTime {
        // Only fails for years outside the range `time` supports.
        match Date::from_calendar_date(self.year, self.month, 1) {
            Ok(date) => start_of_day(date, timezone),
            Err(_) if self.year < 0 => PrimitiveDateTime::MIN.assume_timezone_utc(timezone),
            Err(_) => PrimitiveDateTime::MAX.assume_timezone_utc(timezone),
        }
    }
}

/// The first instant of `date` in `timezone`.
///
/// If midnight happens twice the earlier one is used. If it is skipped by a
/// daylight saving change, the day starts at the end of the gap.
fn start_of_day(date: Date, timezone: &Tz) -> OffsetDateTime {
    let midnight = PrimitiveDateTime::new(date, Time::MIDNIGHT);

    match midnight.assume_timezone(timezone) {
        OffsetResult::Some(instant) | OffsetResult::Ambiguous(instant, _) => instant,
        OffsetResult::None => midnight.assume_timezone_utc(timezone),
    }
}

/// The last instant of `date` in `timezone`, just before the next day starts.
fn end_of_day(date: Date, timezone: &Tz) -> OffsetDateTime {
    match date.next_day() {
        Some(next) => start_of_day(next, timezone) - Duration::NANOSECOND,
        None => PrimitiveDateTime::MAX.assume_timezone_utc(timezone),
    }
}

impl FromStr for MonthKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMonth(s.to_owned());

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || month.len() != 2 || !all_digits(year) || !all_digits(month) {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;

        Ok(Self::new(year, month))
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, u8::from(self.month))
    }
}

impl Serialize for MonthKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl ToSql for MonthKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for MonthKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// Which end of a range a parsed bound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// A plain date means the start of that day.
    Start,
    /// A plain date means the end of that day.
    End,
}

/// Parse a range bound given either as an RFC 3339 timestamp or a plain
/// `yyyy-MM-dd` date in `timezone`.
///
/// Returns `None` if `raw` is in neither format.
pub fn parse_bound(raw: &str, bound: Bound, timezone: &Tz) -> Option<OffsetDateTime> {
    let raw = raw.trim();

    if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(instant);
    }

    let date = Date::parse(raw, DATE_FORMAT).ok()?;

    Some(match bound {
        Bound::Start => start_of_day(date, timezone),
        Bound::End => end_of_day(date, timezone),
    })
}

/// Like [parse_bound], for an optional query parameter.
///
/// Unparsable input is logged and treated as missing.
pub fn parse_optional_bound(
    raw: Option<&str>,
    bound: Bound,
    timezone: &Tz,
) -> Option<OffsetDateTime> {
    let raw = raw?;
    let parsed = parse_bound(raw, bound, timezone);

    if parsed.is_none() {
        tracing::debug!("ignoring unparsable date {raw:?}");
    }

    parsed
}

pub(crate) mod rfc3339 {
    //! Serializes [time::OffsetDateTime] as an RFC 3339 string,
    //! e.g. "2024-05-31T23:59:59Z".
    use serde::Serializer;
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = dt.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub mod option {
        //! Parses optional RFC 3339 fields in request bodies.
        use serde::{Deserialize, Deserializer};
        use time::{OffsetDateTime, format_description::well_known::Rfc3339};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
