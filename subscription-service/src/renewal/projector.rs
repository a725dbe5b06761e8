//! Renewal projection and monthly-equivalent normalisation.

use super::arithmetic::advance_once;
use super::CycleError;
use crate::models::{CycleSpec, CycleUnit};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Maximum number of periods [`RenewalProjector`] advances before giving up.
pub const MAX_PROJECTION_ITERATIONS: u32 = 200;

/// Result of carrying an anchor forward to a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    /// First occurrence on or after the reference date.
    pub next: NaiveDate,
    /// Occurrence one period before `next`, if any advance happened.
    pub previous: Option<NaiveDate>,
    /// Number of periods applied to the anchor.
    pub advances: u32,
}

/// Carries stored renewal anchors forward to their next occurrence.
///
/// The anchor is never modified; every call recomputes from it, so repeated
/// projection of the same record is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalProjector {
    max_iterations: u32,
}

impl Default for RenewalProjector {
    fn default() -> Self {
        Self::new(MAX_PROJECTION_ITERATIONS)
    }
}

impl RenewalProjector {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Advance `anchor` one period at a time until it is on or after
    /// `reference`.
    ///
    /// Returns `None` when the guard limit is reached first (zero or negative
    /// intervals, or anchors too far in the past) or when the calendar
    /// overflows.
    pub fn project(
        &self,
        anchor: NaiveDate,
        cycle: &CycleSpec,
        reference: NaiveDate,
    ) -> Option<Projection> {
        let mut next = anchor;
        let mut previous = None;
        let mut advances = 0;

        while next < reference {
            if advances >= self.max_iterations {
                return None;
            }
            let stepped = advance_once(next, cycle).ok()?;
            previous = Some(next);
            next = stepped;
            advances += 1;
        }

        Some(Projection {
            next,
            previous,
            advances,
        })
    }

    /// First occurrence of `cycle` from `anchor` that is on or after
    /// `reference`. An anchor already on or after `reference` is returned
    /// unchanged.
    pub fn next_occurrence(
        &self,
        anchor: NaiveDate,
        cycle: &CycleSpec,
        reference: NaiveDate,
    ) -> Option<NaiveDate> {
        self.project(anchor, cycle, reference).map(|p| p.next)
    }

    /// [`Self::next_occurrence`] for an anchor that has not been parsed yet.
    /// An unparseable anchor yields `None`.
    pub fn next_occurrence_raw(
        &self,
        anchor: &str,
        cycle: &CycleSpec,
        reference: NaiveDate,
    ) -> Option<NaiveDate> {
        let anchor = parse_anchor_date(anchor)?;
        self.next_occurrence(anchor, cycle, reference)
    }
}

/// Today's calendar date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse a stored anchor date.
///
/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps (the UTC date is taken).
pub fn parse_anchor_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

fn checked(value: Option<Decimal>) -> Result<Decimal, CycleError> {
    value.ok_or_else(|| CycleError::OutOfRange("monthly equivalent overflow".to_string()))
}

/// Normalise a price billed every `cycle` to an average monthly figure.
///
/// This is a dashboard estimate using 30-day months and 52-week years, not a
/// billing-accurate amount. Custom intervals below one are rejected.
pub fn monthly_equivalent(amount: Decimal, cycle: &CycleSpec) -> Result<Decimal, CycleError> {
    let thirty = Decimal::from(30);
    let twelve = Decimal::from(12);
    let weeks_per_month = Decimal::from(52) / twelve;

    match *cycle {
        CycleSpec::Monthly => Ok(amount),
        CycleSpec::Weekly => checked(
            amount
                .checked_mul(Decimal::from(52))
                .and_then(|v| v.checked_div(twelve)),
        ),
        CycleSpec::Yearly => checked(amount.checked_div(twelve)),
        CycleSpec::Daily => checked(amount.checked_mul(thirty)),
        CycleSpec::Custom { interval, unit } => {
            if interval <= 0 {
                return Err(CycleError::InvalidCycle(format!(
                    "interval must be positive to normalise, got {}",
                    interval
                )));
            }
            let interval = Decimal::from(interval);
            match unit {
                CycleUnit::Days => checked(
                    thirty
                        .checked_div(interval)
                        .and_then(|per| amount.checked_mul(per)),
                ),
                CycleUnit::Weeks => checked(
                    amount
                        .checked_mul(weeks_per_month)
                        .and_then(|v| v.checked_div(interval)),
                ),
                CycleUnit::Months => checked(amount.checked_div(interval)),
                CycleUnit::Years => checked(
                    amount
                        .checked_div(twelve)
                        .and_then(|v| v.checked_div(interval)),
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_anchor_on_or_after_reference_is_returned_unchanged() {
        let projector = RenewalProjector::default();
        let anchor = date(2024, 5, 1);

        let same_day = projector.project(anchor, &CycleSpec::Monthly, anchor).unwrap();
        assert_eq!(same_day.next, anchor);
        assert_eq!(same_day.advances, 0);
        assert_eq!(same_day.previous, None);

        assert_eq!(
            projector.next_occurrence(anchor, &CycleSpec::Monthly, date(2024, 1, 1)),
            Some(anchor)
        );
    }

    #[test]
    fn test_month_end_anchor_clamps_into_february() {
        let projector = RenewalProjector::default();
        let next = projector
            .next_occurrence(date(2024, 1, 31), &CycleSpec::Monthly, date(2024, 2, 15))
            .unwrap();
        assert_eq!(next, date(2024, 2, 29));
    }

    #[test]
    fn test_quarterly_custom_cycle_lands_eighteen_months_out() {
        let projector = RenewalProjector::default();
        let anchor = date(2023, 1, 1);
        let reference = date(2024, 6, 1);

        let projection = projector
            .project(anchor, &CycleSpec::custom(3, CycleUnit::Months), reference)
            .unwrap();

        assert_eq!(projection.advances, 6);
        assert_eq!(projection.next, date(2024, 7, 1));
        assert_eq!(projection.previous, Some(date(2024, 4, 1)));
        assert!(projection.previous.unwrap() < reference);
    }

    #[test]
    fn test_zero_interval_hits_guard() {
        let projector = RenewalProjector::default();
        let result = projector.next_occurrence(
            date(2020, 1, 1),
            &CycleSpec::custom(0, CycleUnit::Days),
            date(2024, 1, 1),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn test_negative_interval_hits_guard() {
        let projector = RenewalProjector::default();
        let result = projector.next_occurrence(
            date(2023, 1, 1),
            &CycleSpec::custom(-1, CycleUnit::Months),
            date(2024, 1, 1),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn test_guard_limit_is_configurable() {
        let anchor = date(2024, 1, 1);
        let reference = date(2024, 1, 11);

        // Ten daily advances are needed.
        assert_eq!(
            RenewalProjector::new(10).next_occurrence(anchor, &CycleSpec::Daily, reference),
            Some(reference)
        );
        assert_eq!(
            RenewalProjector::new(9).next_occurrence(anchor, &CycleSpec::Daily, reference),
            None
        );
    }

    #[test]
    fn test_default_guard_is_named_constant() {
        assert_eq!(
            RenewalProjector::default().max_iterations(),
            MAX_PROJECTION_ITERATIONS
        );
        assert_eq!(MAX_PROJECTION_ITERATIONS, 200);
    }

    #[test]
    fn test_old_daily_anchor_exceeds_guard() {
        let projector = RenewalProjector::default();
        let result =
            projector.next_occurrence(date(2020, 1, 1), &CycleSpec::Daily, date(2024, 1, 1));
        assert_eq!(result, None);
    }

    #[test]
    fn test_repeated_projection_is_idempotent() {
        let projector = RenewalProjector::default();
        let anchor = date(2022, 3, 15);
        let cycle = CycleSpec::custom(2, CycleUnit::Weeks);
        let reference = date(2024, 2, 1);

        let first = projector.next_occurrence(anchor, &cycle, reference);
        let second = projector.next_occurrence(anchor, &cycle, reference);
        assert_eq!(first, second);
    }

    #[test]
    fn test_never_overshoots_by_more_than_one_period() {
        let projector = RenewalProjector::default();
        let anchor = date(2021, 1, 31);
        let reference = date(2024, 3, 10);
        let cycles = [
            CycleSpec::Weekly,
            CycleSpec::Monthly,
            CycleSpec::Yearly,
            CycleSpec::custom(10, CycleUnit::Days),
            CycleSpec::custom(3, CycleUnit::Weeks),
            CycleSpec::custom(5, CycleUnit::Months),
            CycleSpec::custom(2, CycleUnit::Years),
        ];

        for cycle in &cycles {
            let projection = projector.project(anchor, cycle, reference).unwrap();
            assert!(projection.next >= reference, "{:?}", cycle);
            let previous = projection.previous.unwrap();
            assert!(previous < reference, "{:?}", cycle);
            assert_eq!(advance_once(previous, cycle).unwrap(), projection.next);
        }
    }

    #[test]
    fn test_clamped_month_end_drifts_when_iterating() {
        let projector = RenewalProjector::default();
        let next = projector
            .next_occurrence(date(2024, 1, 31), &CycleSpec::Monthly, date(2024, 3, 15))
            .unwrap();
        assert_eq!(next, date(2024, 3, 29));
    }

    #[test]
    fn test_raw_anchor_parsing() {
        let projector = RenewalProjector::default();
        let reference = date(2024, 2, 15);

        assert_eq!(
            projector.next_occurrence_raw("2024-01-31", &CycleSpec::Monthly, reference),
            Some(date(2024, 2, 29))
        );
        assert_eq!(
            projector.next_occurrence_raw(
                "2024-01-31T00:00:00.000Z",
                &CycleSpec::Monthly,
                reference
            ),
            Some(date(2024, 2, 29))
        );
        assert_eq!(
            projector.next_occurrence_raw("not-a-date", &CycleSpec::Monthly, reference),
            None
        );
        assert_eq!(
            projector.next_occurrence_raw("2024-02-30", &CycleSpec::Monthly, reference),
            None
        );
        assert_eq!(
            projector.next_occurrence_raw("", &CycleSpec::Monthly, reference),
            None
        );
    }

    #[test]
    fn test_monthly_equivalent_fixed_kinds() {
        let amount = Decimal::from(120);
        assert_eq!(
            monthly_equivalent(amount, &CycleSpec::Yearly).unwrap(),
            Decimal::from(10)
        );
        assert_eq!(
            monthly_equivalent(amount, &CycleSpec::Monthly).unwrap(),
            amount
        );
        assert_eq!(
            monthly_equivalent(Decimal::from(2), &CycleSpec::Daily).unwrap(),
            Decimal::from(60)
        );
        assert_eq!(
            monthly_equivalent(Decimal::from(10), &CycleSpec::Weekly)
                .unwrap()
                .round_dp(2),
            Decimal::new(4333, 2)
        );
    }

    #[test]
    fn test_monthly_equivalent_custom_units() {
        let amount = Decimal::from(60);
        assert_eq!(
            monthly_equivalent(amount, &CycleSpec::custom(15, CycleUnit::Days)).unwrap(),
            Decimal::from(120)
        );
        assert_eq!(
            monthly_equivalent(amount, &CycleSpec::custom(3, CycleUnit::Months)).unwrap(),
            Decimal::from(20)
        );
        assert_eq!(
            monthly_equivalent(amount, &CycleSpec::custom(5, CycleUnit::Years)).unwrap(),
            Decimal::from(1)
        );
        assert_eq!(
            monthly_equivalent(Decimal::from(30), &CycleSpec::custom(2, CycleUnit::Weeks))
                .unwrap()
                .round_dp(2),
            Decimal::new(6500, 2)
        );
    }

    #[test]
    fn test_monthly_equivalent_matches_fixed_kind_for_unit_interval() {
        let amount = Decimal::from(10);
        assert_eq!(
            monthly_equivalent(amount, &CycleSpec::custom(1, CycleUnit::Months)).unwrap(),
            monthly_equivalent(amount, &CycleSpec::Monthly).unwrap()
        );
        assert_eq!(
            monthly_equivalent(amount, &CycleSpec::custom(1, CycleUnit::Years)).unwrap(),
            monthly_equivalent(amount, &CycleSpec::Yearly).unwrap()
        );
    }

    #[test]
    fn test_monthly_equivalent_rejects_non_positive_interval() {
        for interval in [0, -3] {
            let result = monthly_equivalent(
                Decimal::from(10),
                &CycleSpec::custom(interval, CycleUnit::Days),
            );
            assert!(matches!(result, Err(CycleError::InvalidCycle(_))));
        }
    }
}
