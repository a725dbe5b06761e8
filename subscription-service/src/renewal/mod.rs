//! Recurring billing-cycle date engine.
//!
//! Pure and synchronous: no I/O, no shared state, no logging. Safe to call
//! concurrently once per subscription.

pub mod arithmetic;
mod error;
pub mod projector;

pub use arithmetic::{add_days, add_months, add_weeks, add_years, advance_once};
pub use error::CycleError;
pub use projector::{
    monthly_equivalent, parse_anchor_date, today, Projection, RenewalProjector,
    MAX_PROJECTION_ITERATIONS,
};
