//! Subscription model.

use super::CycleSpec;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const DEFAULT_PAYMENT_METHOD: &str = "Not Specified";
pub const DEFAULT_ACCENT_COLOR: &str = "#FFFFFF";

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Paused,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Currencies a subscription can be priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    #[default]
    Inr,
    Jpy,
    Cny,
    Aud,
    Cad,
    Chf,
    Nzd,
}

impl Currency {
    pub const ALL: [Currency; 10] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Inr,
        Currency::Jpy,
        Currency::Cny,
        Currency::Aud,
        Currency::Cad,
        Currency::Chf,
        Currency::Nzd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Inr => "INR",
            Currency::Jpy => "JPY",
            Currency::Cny => "CNY",
            Currency::Aud => "AUD",
            Currency::Cad => "CAD",
            Currency::Chf => "CHF",
            Currency::Nzd => "NZD",
        }
    }

    /// Lowercase code used by the exchange rate API.
    pub fn code(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| format!("Unsupported currency: {}", s))
    }
}

/// Subscription record as persisted.
///
/// `renewal_date` is the original anchor; it is never advanced in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub price: Decimal,
    pub currency: Currency,
    pub renewal_date: NaiveDate,
    pub cycle: CycleSpec,
    pub payment_method: String,
    #[serde(default)]
    pub category: Vec<String>,
    pub status: SubscriptionStatus,
    pub accent_color: String,
    #[serde(default)]
    pub notes: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub name: String,
    pub price: Decimal,
    pub currency: Currency,
    pub renewal_date: NaiveDate,
    pub cycle: CycleSpec,
    pub payment_method: Option<String>,
    pub category: Vec<String>,
    pub status: SubscriptionStatus,
    pub accent_color: Option<String>,
    pub notes: Option<String>,
}

/// Partial update of a subscription. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionChanges {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<Currency>,
    pub renewal_date: Option<NaiveDate>,
    pub cycle: Option<CycleSpec>,
    pub payment_method: Option<String>,
    pub category: Option<Vec<String>>,
    pub status: Option<SubscriptionStatus>,
    pub accent_color: Option<String>,
    pub notes: Option<String>,
}

fn normalize_categories(categories: Vec<String>) -> Vec<String> {
    let cleaned: Vec<String> = categories
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if cleaned.is_empty() {
        vec![UNCATEGORIZED.to_string()]
    } else {
        cleaned
    }
}

fn non_blank_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

impl Subscription {
    pub fn new(owner_id: String, input: NewSubscription) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            name: input.name.trim().to_string(),
            price: input.price,
            currency: input.currency,
            renewal_date: input.renewal_date,
            cycle: input.cycle,
            payment_method: non_blank_or(
                input.payment_method.unwrap_or_default(),
                DEFAULT_PAYMENT_METHOD,
            ),
            category: normalize_categories(input.category),
            status: input.status,
            accent_color: non_blank_or(
                input.accent_color.unwrap_or_default(),
                DEFAULT_ACCENT_COLOR,
            ),
            notes: input.notes.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// First category, or "Uncategorized".
    pub fn primary_category(&self) -> &str {
        self.category
            .first()
            .map(String::as_str)
            .unwrap_or(UNCATEGORIZED)
    }

    pub fn apply(&mut self, changes: SubscriptionChanges) {
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(currency) = changes.currency {
            self.currency = currency;
        }
        if let Some(renewal_date) = changes.renewal_date {
            self.renewal_date = renewal_date;
        }
        if let Some(cycle) = changes.cycle {
            self.cycle = cycle;
        }
        if let Some(payment_method) = changes.payment_method {
            self.payment_method = non_blank_or(payment_method, DEFAULT_PAYMENT_METHOD);
        }
        if let Some(category) = changes.category {
            self.category = normalize_categories(category);
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(accent_color) = changes.accent_color {
            self.accent_color = non_blank_or(accent_color, DEFAULT_ACCENT_COLOR);
        }
        if let Some(notes) = changes.notes {
            self.notes = notes;
        }
        self.updated_at = Utc::now();
    }
}
