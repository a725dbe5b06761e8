pub mod dashboard;
pub mod health;
pub mod subscriptions;

pub use dashboard::*;
pub use health::*;
pub use subscriptions::*;
