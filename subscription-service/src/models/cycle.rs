//! Billing cycle model.

use crate::renewal::CycleError;
use serde::{Deserialize, Serialize};

/// Unit of a custom billing interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl CycleUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleUnit::Days => "days",
            CycleUnit::Weeks => "weeks",
            CycleUnit::Months => "months",
            CycleUnit::Years => "years",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, CycleError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "days" => Ok(CycleUnit::Days),
            "weeks" => Ok(CycleUnit::Weeks),
            "months" => Ok(CycleUnit::Months),
            "years" => Ok(CycleUnit::Years),
            other => Err(CycleError::InvalidCycle(format!(
                "unknown cycle unit '{}'",
                other
            ))),
        }
    }
}

/// Recurrence rule of a subscription.
///
/// Fixed kinds carry no parameters and behave as an interval of one in their
/// own unit. On the wire and in storage this is a flat
/// `{ kind, interval, unit }` record; see [`CycleRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "CycleRecord", into = "CycleRecord")]
pub enum CycleSpec {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
    Custom { interval: i32, unit: CycleUnit },
}

impl CycleSpec {
    pub fn custom(interval: i32, unit: CycleUnit) -> Self {
        CycleSpec::Custom { interval, unit }
    }

    /// Build a cycle from its stored string parts.
    ///
    /// `interval` and `unit` are only consulted for `custom`.
    pub fn from_parts(kind: &str, interval: i32, unit: &str) -> Result<Self, CycleError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(CycleSpec::Daily),
            "weekly" => Ok(CycleSpec::Weekly),
            "monthly" => Ok(CycleSpec::Monthly),
            "yearly" => Ok(CycleSpec::Yearly),
            "custom" => Ok(CycleSpec::Custom {
                interval,
                unit: CycleUnit::from_string(unit)?,
            }),
            other => Err(CycleError::InvalidCycle(format!(
                "unknown cycle kind '{}'",
                other
            ))),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            CycleSpec::Daily => "daily",
            CycleSpec::Weekly => "weekly",
            CycleSpec::Monthly => "monthly",
            CycleSpec::Yearly => "yearly",
            CycleSpec::Custom { .. } => "custom",
        }
    }

    /// Interval and unit as they are persisted.
    pub fn interval_and_unit(&self) -> (i32, CycleUnit) {
        match *self {
            CycleSpec::Daily => (1, CycleUnit::Days),
            CycleSpec::Weekly => (1, CycleUnit::Weeks),
            CycleSpec::Monthly => (1, CycleUnit::Months),
            CycleSpec::Yearly => (1, CycleUnit::Years),
            CycleSpec::Custom { interval, unit } => (interval, unit),
        }
    }

    /// Reject cycles that must never be persisted.
    pub fn validate_for_storage(&self) -> Result<(), CycleError> {
        match self {
            CycleSpec::Custom { interval, .. } if *interval <= 0 => Err(CycleError::InvalidCycle(
                format!("custom interval must be at least 1, got {}", interval),
            )),
            _ => Ok(()),
        }
    }

    /// Human readable label, e.g. "Monthly" or "Every 3 months".
    pub fn label(&self) -> String {
        match self {
            CycleSpec::Daily => "Daily".to_string(),
            CycleSpec::Weekly => "Weekly".to_string(),
            CycleSpec::Monthly => "Monthly".to_string(),
            CycleSpec::Yearly => "Yearly".to_string(),
            CycleSpec::Custom { interval, unit } => {
                format!("Every {} {}", interval, unit.as_str())
            }
        }
    }
}

fn default_interval() -> i32 {
    1
}

fn default_unit() -> String {
    CycleUnit::Months.as_str().to_string()
}

/// Flat serialized form of [`CycleSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    pub kind: String,
    #[serde(default = "default_interval")]
    pub interval: i32,
    #[serde(default = "default_unit")]
    pub unit: String,
}

impl TryFrom<CycleRecord> for CycleSpec {
    type Error = CycleError;

    fn try_from(record: CycleRecord) -> Result<Self, Self::Error> {
        CycleSpec::from_parts(&record.kind, record.interval, &record.unit)
    }
}

impl From<CycleSpec> for CycleRecord {
    fn from(spec: CycleSpec) -> Self {
        let (interval, unit) = spec.interval_and_unit();
        CycleRecord {
            kind: spec.kind_str().to_string(),
            interval,
            unit: unit.as_str().to_string(),
        }
    }
}
