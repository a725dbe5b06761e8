pub mod subscriptions;

pub use subscriptions::*;
