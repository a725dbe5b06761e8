use crate::models::{
    CycleSpec, Currency, NewSubscription, Subscription, SubscriptionChanges, SubscriptionStatus,
};
use crate::renewal::parse_anchor_date;
use crate::reporting::{SortKey, SubscriptionQuery, Valuation};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::{Validate, ValidationError};

/// Largest accepted price in any currency.
pub const MAX_PRICE: i64 = 1_000_000_000;

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        let mut err = ValidationError::new("price");
        err.message = Some("Price must not be negative".into());
        return Err(err);
    }
    if *price > Decimal::from(MAX_PRICE) {
        let mut err = ValidationError::new("price");
        err.message = Some("Price must be at most 1000000000".into());
        return Err(err);
    }
    Ok(())
}

fn parse_renewal_date(raw: &str) -> Result<NaiveDate, AppError> {
    parse_anchor_date(raw).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Invalid renewal date '{}', expected YYYY-MM-DD",
            raw
        ))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,

    #[serde(default)]
    pub currency: Currency,

    #[validate(length(min = 1, message = "Renewal date is required"))]
    pub renewal_date: String,

    #[serde(default)]
    pub cycle: CycleSpec,

    #[validate(length(max = 60, message = "Payment method must be at most 60 characters"))]
    pub payment_method: Option<String>,

    #[serde(default)]
    pub category: Vec<String>,

    #[serde(default)]
    pub status: SubscriptionStatus,

    #[validate(length(max = 16, message = "Accent color must be at most 16 characters"))]
    pub accent_color: Option<String>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

impl CreateSubscriptionRequest {
    /// Domain checks that run after field validation.
    pub fn into_new(self) -> Result<NewSubscription, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Name must not be blank")));
        }
        let renewal_date = parse_renewal_date(&self.renewal_date)?;
        self.cycle.validate_for_storage()?;

        Ok(NewSubscription {
            name: self.name,
            price: self.price,
            currency: self.currency,
            renewal_date,
            cycle: self.cycle,
            payment_method: self.payment_method,
            category: self.category,
            status: self.status,
            accent_color: self.accent_color,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSubscriptionRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,

    pub currency: Option<Currency>,

    pub renewal_date: Option<String>,

    pub cycle: Option<CycleSpec>,

    #[validate(length(max = 60, message = "Payment method must be at most 60 characters"))]
    pub payment_method: Option<String>,

    pub category: Option<Vec<String>>,

    pub status: Option<SubscriptionStatus>,

    #[validate(length(max = 16, message = "Accent color must be at most 16 characters"))]
    pub accent_color: Option<String>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

impl UpdateSubscriptionRequest {
    pub fn into_changes(self) -> Result<SubscriptionChanges, AppError> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::BadRequest(anyhow::anyhow!("Name must not be blank")));
        }
        let renewal_date = self
            .renewal_date
            .as_deref()
            .map(parse_renewal_date)
            .transpose()?;
        if let Some(cycle) = &self.cycle {
            cycle.validate_for_storage()?;
        }

        Ok(SubscriptionChanges {
            name: self.name,
            price: self.price,
            currency: self.currency,
            renewal_date,
            cycle: self.cycle,
            payment_method: self.payment_method,
            category: self.category,
            status: self.status,
            accent_color: self.accent_color,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub currency: Currency,
    pub renewal_date: NaiveDate,
    pub cycle: CycleSpec,
    pub cycle_label: String,
    pub payment_method: String,
    pub category: Vec<String>,
    pub status: SubscriptionStatus,
    pub accent_color: String,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: sub.id.clone(),
            name: sub.name.clone(),
            price: sub.price,
            currency: sub.currency,
            renewal_date: sub.renewal_date,
            cycle: sub.cycle,
            cycle_label: sub.cycle.label(),
            payment_method: sub.payment_method.clone(),
            category: sub.category.clone(),
            status: sub.status,
            accent_color: sub.accent_color.clone(),
            notes: sub.notes.clone(),
            created_at: sub.created_at.to_rfc3339(),
            updated_at: sub.updated_at.to_rfc3339(),
        }
    }
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self::from(&sub)
    }
}

/// A listed subscription with its projected renewal and display amounts.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardItem {
    #[serde(flatten)]
    pub subscription: SubscriptionResponse,
    pub next_renewal: Option<NaiveDate>,
    pub display_price: Option<Decimal>,
    pub monthly_equivalent: Option<Decimal>,
}

impl From<&Valuation<'_>> for DashboardItem {
    fn from(v: &Valuation<'_>) -> Self {
        Self {
            subscription: SubscriptionResponse::from(v.subscription),
            next_renewal: v.next_renewal,
            display_price: v.price.map(|p| p.round_dp(2)),
            monthly_equivalent: v.monthly.map(|m| m.round_dp(2)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardListResponse {
    pub currency: Currency,
    pub reference_date: NaiveDate,
    pub items: Vec<DashboardItem>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardListParams {
    pub currency: Option<Currency>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub payment_method: Option<String>,
    pub sort: Option<SortKey>,
}

impl DashboardListParams {
    pub fn query(&self) -> SubscriptionQuery {
        SubscriptionQuery {
            search: self.search.clone(),
            category: self.category.clone(),
            status: self.status,
            payment_method: self.payment_method.clone(),
            sort: self.sort,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    pub currency: Option<Currency>,
    pub within_days: Option<i64>,
    pub active_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CurrencyParams {
    pub currency: Option<Currency>,
}

#[derive(Debug, Serialize)]
pub struct UpcomingResponse {
    pub id: String,
    pub reference_date: NaiveDate,
    pub next_renewal: Option<NaiveDate>,
    pub days_until: Option<i64>,
    pub cycle_label: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusRequest {
    pub status: SubscriptionStatus,
}

#[derive(Debug, Serialize)]
pub struct BulkStatusResponse {
    pub status: SubscriptionStatus,
    pub updated: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImportRequest {
    #[validate(
        length(max = 1000, message = "At most 1000 subscriptions per import"),
        nested
    )]
    pub items: Vec<CreateSubscriptionRequest>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub items: Vec<SubscriptionResponse>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub currency: Currency,
    pub items: Vec<SubscriptionResponse>,
    pub export_date: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CycleUnit;
    use serde_json::json;

    fn create(body: serde_json::Value) -> CreateSubscriptionRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_create_request_defaults() {
        let request = create(json!({
            "name": "Netflix",
            "price": 649,
            "renewal_date": "2024-01-15"
        }));
        assert!(request.validate().is_ok());

        let new = request.into_new().unwrap();
        assert_eq!(new.currency, Currency::Inr);
        assert_eq!(new.cycle, CycleSpec::Monthly);
        assert_eq!(new.status, SubscriptionStatus::Active);
        assert_eq!(new.renewal_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_create_request_field_validation() {
        let long_name = create(json!({
            "name": "x".repeat(101),
            "price": 1,
            "renewal_date": "2024-01-15"
        }));
        assert!(long_name.validate().is_err());

        let negative = create(json!({
            "name": "Netflix",
            "price": -1,
            "renewal_date": "2024-01-15"
        }));
        assert!(negative.validate().is_err());

        let long_notes = create(json!({
            "name": "Netflix",
            "price": 1,
            "renewal_date": "2024-01-15",
            "notes": "n".repeat(1001)
        }));
        assert!(long_notes.validate().is_err());
    }

    #[test]
    fn test_create_request_rejects_price_above_cap() {
        let huge = create(json!({
            "name": "Yacht club",
            "price": 1e27,
            "renewal_date": "2024-01-15"
        }));
        assert!(huge.validate().is_err());

        let at_cap = create(json!({
            "name": "Yacht club",
            "price": MAX_PRICE,
            "renewal_date": "2024-01-15"
        }));
        assert!(at_cap.validate().is_ok());
    }

    #[test]
    fn test_import_request_limits_batch_size() {
        let item = json!({ "name": "Netflix", "price": 1, "renewal_date": "2024-01-15" });

        let full: ImportRequest =
            serde_json::from_value(json!({ "items": vec![item.clone(); 1000] })).unwrap();
        assert!(full.validate().is_ok());

        let oversized: ImportRequest =
            serde_json::from_value(json!({ "items": vec![item; 1001] })).unwrap();
        assert!(oversized.validate().is_err());
    }

    #[test]
    fn test_import_request_validates_each_item() {
        let request: ImportRequest = serde_json::from_value(json!({
            "items": [
                { "name": "Netflix", "price": 1, "renewal_date": "2024-01-15" },
                { "name": "", "price": 1, "renewal_date": "2024-01-15" }
            ]
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_request_domain_checks() {
        let bad_date = create(json!({
            "name": "Netflix",
            "price": 1,
            "renewal_date": "15/01/2024"
        }));
        assert!(matches!(bad_date.into_new(), Err(AppError::BadRequest(_))));

        let zero_interval = create(json!({
            "name": "Netflix",
            "price": 1,
            "renewal_date": "2024-01-15",
            "cycle": { "kind": "custom", "interval": 0, "unit": "days" }
        }));
        assert!(zero_interval.validate().is_ok());
        assert!(matches!(zero_interval.into_new(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_create_request_accepts_timestamp_and_custom_cycle() {
        let request = create(json!({
            "name": "Gym",
            "price": 2999.5,
            "renewal_date": "2024-03-01T10:00:00Z",
            "cycle": { "kind": "custom", "interval": 3, "unit": "months" }
        }));
        let new = request.into_new().unwrap();

        assert_eq!(new.renewal_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(new.cycle, CycleSpec::custom(3, CycleUnit::Months));
    }

    #[test]
    fn test_update_request_rejects_blank_name() {
        let request = UpdateSubscriptionRequest {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(request.into_changes().is_err());
    }

    #[test]
    fn test_update_request_parses_date() {
        let request = UpdateSubscriptionRequest {
            renewal_date: Some("2024-02-29".to_string()),
            ..Default::default()
        };
        let changes = request.into_changes().unwrap();
        assert_eq!(
            changes.renewal_date,
            Some(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(changes.name.is_none());
    }
}
