//! Errors raised by the renewal date engine.

use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    /// Unrecognised kind/unit, or an interval that cannot be normalised.
    #[error("Invalid billing cycle: {0}")]
    InvalidCycle(String),

    /// The shifted date falls outside the representable calendar.
    #[error("Date out of range: {0}")]
    OutOfRange(String),
}

impl From<CycleError> for AppError {
    fn from(err: CycleError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}
