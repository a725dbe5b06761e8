use crate::dtos::{DashboardItem, DashboardListParams, DashboardListResponse, SummaryParams};
use crate::middleware::UserId;
use crate::models::{Currency, Subscription};
use crate::renewal::today;
use crate::reporting::{evaluate, summarize, Conversion};
use crate::services::metrics;
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};

/// Resolve a rate into `display_currency` for every currency present in
/// `items`.
///
/// A currency whose rate cannot be fetched is left out of the conversion, so
/// its records show no display amount and stay out of totals.
async fn conversion_for(
    state: &AppState,
    display_currency: Currency,
    items: &[Subscription],
) -> Conversion {
    let mut rates = HashMap::new();
    let mut unavailable = HashSet::new();
    for item in items {
        let from = item.currency;
        if from == display_currency || rates.contains_key(&from) || unavailable.contains(&from) {
            continue;
        }
        match state.rates.rate(from, display_currency).await {
            Ok(rate) => {
                rates.insert(from, rate);
            }
            Err(e) => {
                tracing::warn!(
                    from = %from,
                    to = %display_currency,
                    error = %e,
                    "Exchange rate unavailable; affected subscriptions are left unconverted"
                );
                unavailable.insert(from);
            }
        }
    }
    Conversion::new(display_currency, rates)
}

async fn list_owned(state: &AppState, owner_id: &str) -> Result<Vec<Subscription>, AppError> {
    let result = state.store.list(owner_id).await;
    metrics::record_operation("list", result.is_ok());
    result
}

/// Filtered, sorted list with next renewal dates projected from today.
#[tracing::instrument(skip_all, fields(owner_id = %user.0))]
pub async fn list_dashboard(
    State(state): State<AppState>,
    user: UserId,
    Query(params): Query<DashboardListParams>,
) -> Result<impl IntoResponse, AppError> {
    let display_currency = params
        .currency
        .unwrap_or(state.config.reporting.default_currency);
    let items = list_owned(&state, &user.0).await?;
    let conversion = conversion_for(&state, display_currency, &items).await;
    let reference = today();

    let valuations = params
        .query()
        .apply(evaluate(&items, &state.projector, reference, &conversion));
    let items: Vec<DashboardItem> = valuations.iter().map(DashboardItem::from).collect();

    tracing::debug!(count = items.len(), currency = %display_currency, "Dashboard listed");

    Ok(Json(DashboardListResponse {
        currency: display_currency,
        reference_date: reference,
        total: items.len(),
        items,
    }))
}

#[tracing::instrument(skip_all, fields(owner_id = %user.0))]
pub async fn dashboard_summary(
    State(state): State<AppState>,
    user: UserId,
    Query(params): Query<SummaryParams>,
) -> Result<impl IntoResponse, AppError> {
    let reporting = &state.config.reporting;
    let display_currency = params.currency.unwrap_or(reporting.default_currency);
    let within_days = params
        .within_days
        .unwrap_or(reporting.upcoming_window_days);
    if !(0..=366).contains(&within_days) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "within_days must be between 0 and 366"
        )));
    }

    let items = list_owned(&state, &user.0).await?;
    let conversion = conversion_for(&state, display_currency, &items).await;
    let reference = today();

    let valuations = evaluate(&items, &state.projector, reference, &conversion);
    let summary = summarize(
        &valuations,
        display_currency,
        reference,
        within_days,
        params.active_only.unwrap_or(false),
        reporting.monthly_budget,
    );

    Ok(Json(summary))
}
