use super::Valuation;
use crate::models::{Subscription, SubscriptionStatus};
use serde::Deserialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Name, ascending.
    Name,
    /// Converted price, descending.
    Amount,
    /// Status, ascending.
    Status,
    /// Next renewal, ascending; records without one sort last.
    Next,
}

/// Dashboard list filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<SubscriptionStatus>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub sort: Option<SortKey>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl SubscriptionQuery {
    pub fn matches(&self, subscription: &Subscription) -> bool {
        if let Some(needle) = non_empty(&self.search) {
            let needle = needle.to_lowercase();
            let hit = subscription.name.to_lowercase().contains(&needle)
                || subscription
                    .primary_category()
                    .to_lowercase()
                    .contains(&needle);
            if !hit {
                return false;
            }
        }
        if let Some(category) = non_empty(&self.category) {
            if subscription.primary_category() != category {
                return false;
            }
        }
        if let Some(status) = self.status {
            if subscription.status != status {
                return false;
            }
        }
        if let Some(method) = non_empty(&self.payment_method) {
            if subscription.payment_method != method {
                return false;
            }
        }
        true
    }

    /// Filter then sort. Without a sort key the input order is kept.
    pub fn apply<'a>(&self, valuations: Vec<Valuation<'a>>) -> Vec<Valuation<'a>> {
        let mut filtered: Vec<Valuation<'a>> = valuations
            .into_iter()
            .filter(|v| self.matches(v.subscription))
            .collect();

        match self.sort {
            Some(SortKey::Name) => filtered.sort_by(|a, b| {
                a.subscription
                    .name
                    .to_lowercase()
                    .cmp(&b.subscription.name.to_lowercase())
            }),
            Some(SortKey::Amount) => filtered.sort_by(|a, b| missing_last(b.price, a.price, true)),
            Some(SortKey::Status) => filtered.sort_by(|a, b| {
                a.subscription
                    .status
                    .as_str()
                    .cmp(b.subscription.status.as_str())
            }),
            Some(SortKey::Next) => {
                filtered.sort_by(|a, b| missing_last(a.next_renewal, b.next_renewal, false))
            }
            None => {}
        }
        filtered
    }
}

// `swapped` marks a descending comparison where the arguments arrive reversed.
fn missing_last<T: Ord>(a: Option<T>, b: Option<T>, swapped: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, None) => Ordering::Equal,
        (Some(_), None) if swapped => Ordering::Greater,
        (None, Some(_)) if swapped => Ordering::Less,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
    }
}
