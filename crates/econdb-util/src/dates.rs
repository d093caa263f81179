use chrono::NaiveDate;
use tracing::debug;

/// `YYYY-MM-DD`, the only date form accepted on the command line, from the rate API,
/// and on the query API.
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Convert a `&str` to a [`chrono::NaiveDate`] (so that it can be bound directly as `DATE`).
///
/// Failures are only traced at debug level; callers decide how loudly to report them.
pub fn parse_date(str_date: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(str_date.trim(), ISO_DATE).map_err(|e| {
        debug!("failed to parse date string; expected form YYYY-MM-DD - received: {str_date}");
        e
    })
}

/// Every calendar day of the closed interval `[start, end]`, ascending.
///
/// Yields nothing when `end` is before `start`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}
