//! Dashboard aggregation over projected subscriptions.
//!
//! Everything here is synchronous and works on records already loaded from
//! the store. Currency rates are resolved by the caller into a
//! [`Conversion`] before aggregation.

mod query;
mod summary;
mod upcoming;

pub use query::{SortKey, SubscriptionQuery};
pub use summary::{summarize, CategoryTotal, DashboardSummary, TrendPoint, TREND_MONTHS};
pub use upcoming::{upcoming_renewals, UpcomingRenewal};

use crate::models::{Currency, Subscription};
use crate::renewal::{monthly_equivalent, RenewalProjector};
use crate::services::metrics;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Exchange factors into a single display currency.
#[derive(Debug, Clone)]
pub struct Conversion {
    display: Currency,
    rates: HashMap<Currency, Decimal>,
}

impl Conversion {
    pub fn identity(display: Currency) -> Self {
        Self {
            display,
            rates: HashMap::new(),
        }
    }

    pub fn new(display: Currency, rates: HashMap<Currency, Decimal>) -> Self {
        Self { display, rates }
    }

    pub fn display(&self) -> Currency {
        self.display
    }

    /// Convert `amount` priced in `from` into the display currency.
    pub fn convert(&self, amount: Decimal, from: Currency) -> Option<Decimal> {
        if from == self.display {
            return Some(amount);
        }
        self.rates
            .get(&from)
            .and_then(|rate| amount.checked_mul(*rate))
    }
}

/// A subscription with its projected and converted figures.
#[derive(Debug, Clone)]
pub struct Valuation<'a> {
    pub subscription: &'a Subscription,
    pub next_renewal: Option<NaiveDate>,
    /// Price in the display currency, `None` when no rate was available.
    pub price: Option<Decimal>,
    /// Monthly equivalent in the display currency.
    pub monthly: Option<Decimal>,
}

/// Project and convert every record.
///
/// Records whose cycle cannot be normalised keep `monthly = None` and are
/// left out of totals.
pub fn evaluate<'a>(
    items: &'a [Subscription],
    projector: &RenewalProjector,
    reference: NaiveDate,
    conversion: &Conversion,
) -> Vec<Valuation<'a>> {
    items
        .iter()
        .map(|subscription| {
            let next_renewal =
                projector.next_occurrence(subscription.renewal_date, &subscription.cycle, reference);
            metrics::record_projection(next_renewal.is_some());

            let price = conversion.convert(subscription.price, subscription.currency);
            if price.is_none() {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    from = %subscription.currency,
                    to = %conversion.display(),
                    "No exchange rate for subscription currency"
                );
            }

            let monthly = price.and_then(|p| match monthly_equivalent(p, &subscription.cycle) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        error = %e,
                        "Skipping subscription with unusable billing cycle"
                    );
                    None
                }
            });

            Valuation {
                subscription,
                next_renewal,
                price,
                monthly,
            }
        })
        .collect()
}
