use super::{upcoming_renewals, UpcomingRenewal, Valuation};
use crate::models::{Currency, SubscriptionStatus};
use crate::renewal::add_months;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Number of monthly points in the spend trend.
pub const TREND_MONTHS: i32 = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub monthly_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// First day of the month.
    pub month: NaiveDate,
    pub total: Decimal,
}

/// Dashboard KPIs in a single display currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub currency: Currency,
    pub reference_date: NaiveDate,
    pub monthly_total: Decimal,
    pub active_count: usize,
    pub upcoming_count: usize,
    pub potential_savings: Decimal,
    pub budget: Decimal,
    pub budget_progress_pct: Decimal,
    pub by_category: Vec<CategoryTotal>,
    pub trend: Vec<TrendPoint>,
    pub upcoming: Vec<UpcomingRenewal>,
}

/// Add `v`'s monthly figure to `acc`, leaving `acc` unchanged on overflow.
fn add_monthly(acc: Decimal, v: &Valuation<'_>) -> Decimal {
    let Some(monthly) = v.monthly else {
        return acc;
    };
    acc.checked_add(monthly).unwrap_or_else(|| {
        tracing::warn!(
            subscription_id = %v.subscription.id,
            "Monthly total overflowed; subscription left out of aggregate"
        );
        acc
    })
}

fn monthly_sum<'a, 'b: 'a>(valuations: impl Iterator<Item = &'a Valuation<'b>>) -> Decimal {
    valuations.fold(Decimal::ZERO, |acc, v| add_monthly(acc, v))
}

fn budget_progress(monthly_total: Decimal, budget: Decimal) -> Decimal {
    if budget <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    // A ratio too large to scale is far past the budget.
    let pct = monthly_total
        .checked_div(budget)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ONE_HUNDRED);
    pct.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED).round_dp(1)
}

fn by_category(valuations: &[Valuation<'_>]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, Decimal> = HashMap::new();
    for v in valuations.iter().filter(|v| v.subscription.status.is_active()) {
        if v.monthly.is_some() {
            let total = totals
                .entry(v.subscription.primary_category())
                .or_insert(Decimal::ZERO);
            *total = add_monthly(*total, v);
        }
    }

    let mut categories: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            monthly_total: total.round_dp(2),
        })
        .collect();
    categories.sort_by(|a, b| {
        b.monthly_total
            .cmp(&a.monthly_total)
            .then_with(|| a.category.cmp(&b.category))
    });
    categories
}

/// Spend per month for the twelve months ending with the reference month.
///
/// A record counts toward a month once its anchor date has been reached by
/// the end of that month; cancelled records never count.
fn trend(valuations: &[Valuation<'_>], reference: NaiveDate) -> Vec<TrendPoint> {
    let Some(current) = reference.with_day(1) else {
        return Vec::new();
    };

    (0..TREND_MONTHS)
        .rev()
        .filter_map(|back| {
            let month = add_months(current, -back).ok()?;
            let month_end = add_months(month, 1).ok()?;
            let total = monthly_sum(valuations.iter().filter(|v| {
                v.subscription.status != SubscriptionStatus::Cancelled
                    && v.subscription.renewal_date < month_end
            }));
            Some(TrendPoint {
                month,
                total: total.max(Decimal::ZERO).round_dp(2),
            })
        })
        .collect()
}

/// Aggregate projected records into dashboard KPIs.
///
/// `upcoming_count` counts every record due within `within_days`; the
/// `upcoming` list honours `active_only`.
pub fn summarize(
    valuations: &[Valuation<'_>],
    currency: Currency,
    reference: NaiveDate,
    within_days: i64,
    active_only: bool,
    budget: Decimal,
) -> DashboardSummary {
    let monthly_total = monthly_sum(
        valuations
            .iter()
            .filter(|v| v.subscription.status.is_active()),
    );
    let potential_savings = monthly_sum(
        valuations
            .iter()
            .filter(|v| !v.subscription.status.is_active()),
    );
    let active_count = valuations
        .iter()
        .filter(|v| v.subscription.status.is_active())
        .count();
    let upcoming_count = upcoming_renewals(valuations, reference, within_days, false).len();

    DashboardSummary {
        currency,
        reference_date: reference,
        monthly_total: monthly_total.round_dp(2),
        active_count,
        upcoming_count,
        potential_savings: potential_savings.round_dp(2),
        budget,
        budget_progress_pct: budget_progress(monthly_total, budget),
        by_category: by_category(valuations),
        trend: trend(valuations, reference),
        upcoming: upcoming_renewals(valuations, reference, within_days, active_only),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{evaluate, Conversion};
    use super::*;
    use crate::models::{CycleSpec, CycleUnit, Subscription};
    use crate::renewal::RenewalProjector;

    fn fixtures() -> Vec<Subscription> {
        vec![
            subscription(
                "Netflix",
                500,
                CycleSpec::Monthly,
                date(2023, 1, 5),
                SubscriptionStatus::Active,
                "Streaming",
            ),
            subscription(
                "Hotstar",
                1200,
                CycleSpec::Yearly,
                date(2024, 2, 1),
                SubscriptionStatus::Active,
                "Streaming",
            ),
            subscription(
                "Gym",
                3000,
                CycleSpec::custom(3, CycleUnit::Months),
                date(2024, 1, 1),
                SubscriptionStatus::Active,
                "Health",
            ),
            subscription(
                "Magazine",
                60,
                CycleSpec::Monthly,
                date(2023, 1, 15),
                SubscriptionStatus::Paused,
                "News",
            ),
            subscription(
                "Old VPN",
                900,
                CycleSpec::Yearly,
                date(2022, 5, 1),
                SubscriptionStatus::Cancelled,
                "Software",
            ),
        ]
    }

    fn run(items: &[Subscription], budget: i64) -> DashboardSummary {
        let reference = date(2024, 3, 10);
        let valuations = evaluate(
            items,
            &RenewalProjector::default(),
            reference,
            &Conversion::identity(Currency::Inr),
        );
        summarize(
            &valuations,
            Currency::Inr,
            reference,
            30,
            false,
            Decimal::from(budget),
        )
    }

    #[test]
    fn test_kpis() {
        let summary = run(&fixtures(), 4000);

        // 500 + 1200/12 + 3000/3
        assert_eq!(summary.monthly_total, Decimal::from(1600));
        assert_eq!(summary.active_count, 3);
        // 60 + 900/12
        assert_eq!(summary.potential_savings, Decimal::from(135));
        assert_eq!(summary.budget_progress_pct, Decimal::from(40));
    }

    #[test]
    fn test_upcoming_count_includes_all_statuses() {
        let summary = run(&fixtures(), 4000);

        // Netflix 2024-04-05, Magazine 2024-03-15, Gym 2024-04-01
        assert_eq!(summary.upcoming_count, 3);
        assert_eq!(summary.upcoming[0].name, "Magazine");
    }

    #[test]
    fn test_budget_progress_is_clamped() {
        assert_eq!(run(&fixtures(), 1000).budget_progress_pct, Decimal::ONE_HUNDRED);
        assert_eq!(run(&fixtures(), 0).budget_progress_pct, Decimal::ZERO);
        assert_eq!(run(&[], 200).budget_progress_pct, Decimal::ZERO);
    }

    #[test]
    fn test_by_category_counts_active_only_sorted_desc() {
        let summary = run(&fixtures(), 4000);

        assert_eq!(
            summary.by_category,
            vec![
                CategoryTotal {
                    category: "Health".to_string(),
                    monthly_total: Decimal::from(1000),
                },
                CategoryTotal {
                    category: "Streaming".to_string(),
                    monthly_total: Decimal::from(600),
                },
            ]
        );
    }

    #[test]
    fn test_trend_covers_twelve_months_ending_at_reference() {
        let summary = run(&fixtures(), 4000);

        assert_eq!(summary.trend.len(), 12);
        assert_eq!(summary.trend[0].month, date(2023, 4, 1));
        assert_eq!(summary.trend[11].month, date(2024, 3, 1));
        // Netflix + Magazine until Gym and Hotstar start
        assert_eq!(summary.trend[0].total, Decimal::from(560));
        assert_eq!(summary.trend[9].total, Decimal::from(1560));
        assert_eq!(summary.trend[10].total, Decimal::from(1660));
        assert_eq!(summary.trend[11].total, Decimal::from(1660));
    }

    #[test]
    fn test_overflowing_amounts_are_skipped_instead_of_panicking() {
        let mut items = fixtures();
        for item in items.iter_mut().take(2) {
            item.price = Decimal::MAX;
            item.cycle = CycleSpec::Monthly;
        }

        let summary = run(&items, 4000);

        // Netflix alone fills the total; Hotstar would overflow and is dropped
        assert_eq!(summary.monthly_total, Decimal::MAX.round_dp(2));
        assert_eq!(summary.budget_progress_pct, Decimal::ONE_HUNDRED);
        assert_eq!(summary.by_category[0].category, "Streaming");
        assert_eq!(summary.by_category[0].monthly_total, Decimal::MAX.round_dp(2));
        assert_eq!(summary.trend.len(), 12);
    }

    #[test]
    fn test_empty_input() {
        let summary = run(&[], 200);

        assert_eq!(summary.monthly_total, Decimal::ZERO);
        assert_eq!(summary.active_count, 0);
        assert!(summary.by_category.is_empty());
        assert!(summary.trend.iter().all(|p| p.total == Decimal::ZERO));
    }
}
