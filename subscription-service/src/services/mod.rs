pub mod database;
pub mod metrics;
pub mod rates;
pub mod store;

pub use database::{MongoDb, MongoSubscriptionStore};
pub use rates::{HttpRateSource, RateSource, StaticRateSource};
pub use store::{InMemorySubscriptionStore, SubscriptionStore};
