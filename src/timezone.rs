use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, OffsetDateTimeExt, TimeZone, Tz};

use crate::Error;

pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Look up a timezone by its canonical name, e.g. "Pacific/Auckland".
///
/// # Errors
///
/// Returns an [Error::InvalidTimezoneError] if `canonical_timezone` is not a
/// known timezone name.
pub fn get_timezone(canonical_timezone: &str) -> Result<&'static Tz, Error> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))
}

/// The current date and time in `timezone`.
pub fn now_in(timezone: &Tz) -> OffsetDateTime {
    OffsetDateTime::now_utc().to_timezone(timezone)
}
