use super::Valuation;
use crate::models::SubscriptionStatus;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// A renewal falling inside the look-ahead window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingRenewal {
    pub subscription_id: String,
    pub name: String,
    pub status: SubscriptionStatus,
    pub accent_color: String,
    pub next_renewal: NaiveDate,
    pub days_until: i64,
    /// Price in the display currency, when a rate was available.
    pub amount: Option<Decimal>,
}

/// Renewals due between `reference` and `reference + within_days`
/// inclusive, soonest first.
///
/// Records without a next occurrence are omitted. With `active_only`,
/// paused and cancelled records are skipped.
pub fn upcoming_renewals(
    valuations: &[Valuation<'_>],
    reference: NaiveDate,
    within_days: i64,
    active_only: bool,
) -> Vec<UpcomingRenewal> {
    let mut upcoming: Vec<UpcomingRenewal> = valuations
        .iter()
        .filter(|v| !active_only || v.subscription.status.is_active())
        .filter_map(|v| {
            let next = v.next_renewal?;
            let days_until = (next - reference).num_days();
            if days_until > within_days {
                return None;
            }
            Some(UpcomingRenewal {
                subscription_id: v.subscription.id.clone(),
                name: v.subscription.name.clone(),
                status: v.subscription.status,
                accent_color: v.subscription.accent_color.clone(),
                next_renewal: next,
                days_until,
                amount: v.price.map(|p| p.round_dp(2)),
            })
        })
        .collect();

    upcoming.sort_by(|a, b| a.next_renewal.cmp(&b.next_renewal));
    upcoming
}
