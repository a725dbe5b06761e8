//! Calendar arithmetic for billing cycles.
//!
//! Month and year shifts clamp to the last valid day of the target month:
//! Jan 31 + 1 month is Feb 29 in a leap year and Feb 28 otherwise, and
//! Feb 29 + 1 year is Feb 28. Every function returns a new date and only
//! fails when the result leaves chrono's representable range.

use super::CycleError;
use crate::models::{CycleSpec, CycleUnit};
use chrono::{Days, Months, NaiveDate};

fn out_of_range(date: NaiveDate, what: &str, n: i64) -> CycleError {
    CycleError::OutOfRange(format!("{} {} {}", date, what, n))
}

/// Shift `date` by `n` days (negative moves backwards).
pub fn add_days(date: NaiveDate, n: i64) -> Result<NaiveDate, CycleError> {
    let days = Days::new(n.unsigned_abs());
    let shifted = if n >= 0 {
        date.checked_add_days(days)
    } else {
        date.checked_sub_days(days)
    };
    shifted.ok_or_else(|| out_of_range(date, "+ days", n))
}

/// Shift `date` by `n` weeks of seven days.
pub fn add_weeks(date: NaiveDate, n: i64) -> Result<NaiveDate, CycleError> {
    let days = n
        .checked_mul(7)
        .ok_or_else(|| out_of_range(date, "+ weeks", n))?;
    add_days(date, days)
}

/// Shift `date` by `n` calendar months, clamping the day of month.
pub fn add_months(date: NaiveDate, n: i32) -> Result<NaiveDate, CycleError> {
    let months = Months::new(n.unsigned_abs());
    let shifted = if n >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    };
    shifted.ok_or_else(|| out_of_range(date, "+ months", i64::from(n)))
}

/// Shift `date` by `n` calendar years; equivalent to `12 * n` months.
pub fn add_years(date: NaiveDate, n: i32) -> Result<NaiveDate, CycleError> {
    let months = n
        .checked_mul(12)
        .ok_or_else(|| out_of_range(date, "+ years", i64::from(n)))?;
    add_months(date, months)
}

/// Apply exactly one period of `cycle` to `date`.
///
/// A custom interval of zero returns `date` unchanged and a negative one
/// moves backwards; callers that loop on this must bound their iterations.
pub fn advance_once(date: NaiveDate, cycle: &CycleSpec) -> Result<NaiveDate, CycleError> {
    match *cycle {
        CycleSpec::Daily => add_days(date, 1),
        CycleSpec::Weekly => add_days(date, 7),
        CycleSpec::Monthly => add_months(date, 1),
        CycleSpec::Yearly => add_years(date, 1),
        CycleSpec::Custom { interval, unit } => match unit {
            CycleUnit::Days => add_days(date, i64::from(interval)),
            CycleUnit::Weeks => add_days(date, i64::from(interval) * 7),
            CycleUnit::Months => add_months(date, interval),
            CycleUnit::Years => add_years(date, interval),
        },
    }
}
