//! Domain models for subscription-service.

mod cycle;
mod subscription;

pub use cycle::{CycleRecord, CycleSpec, CycleUnit};
pub use subscription::{
    Currency, NewSubscription, Subscription, SubscriptionChanges, SubscriptionStatus,
    DEFAULT_ACCENT_COLOR, DEFAULT_PAYMENT_METHOD, UNCATEGORIZED,
};
