use crate::dtos::{
    BulkStatusRequest, BulkStatusResponse, CreateSubscriptionRequest, CurrencyParams,
    ExportResponse, ImportRequest, ImportResponse, PurgeResponse, SubscriptionResponse,
    UpcomingResponse, UpdateSubscriptionRequest,
};
use crate::middleware::UserId;
use crate::models::{Subscription, SubscriptionStatus};
use crate::renewal::today;
use crate::services::metrics;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use validator::Validate;

fn not_found(id: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Subscription {} not found", id))
}

async fn load(state: &AppState, owner_id: &str, id: &str) -> Result<Subscription, AppError> {
    let found = state.store.find(owner_id, id).await;
    metrics::record_operation("find", found.is_ok());
    found?.ok_or_else(|| not_found(id))
}

#[tracing::instrument(skip_all, fields(owner_id = %user.0))]
pub async fn create_subscription(
    State(state): State<AppState>,
    user: UserId,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let subscription = Subscription::new(user.0, request.into_new()?);

    let result = state.store.insert(&subscription).await;
    metrics::record_operation("create", result.is_ok());
    result?;

    tracing::info!(subscription_id = %subscription.id, "Subscription created");

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::from(subscription)),
    ))
}

#[tracing::instrument(skip_all, fields(owner_id = %user.0, subscription_id = %id))]
pub async fn get_subscription(
    State(state): State<AppState>,
    user: UserId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = load(&state, &user.0, &id).await?;
    Ok(Json(SubscriptionResponse::from(subscription)))
}

#[tracing::instrument(skip_all, fields(owner_id = %user.0, subscription_id = %id))]
pub async fn update_subscription(
    State(state): State<AppState>,
    user: UserId,
    Path(id): Path<String>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let changes = request.into_changes()?;

    let mut subscription = load(&state, &user.0, &id).await?;
    subscription.apply(changes);

    let result = state.store.replace(&subscription).await;
    metrics::record_operation("update", result.is_ok());
    if !result? {
        return Err(not_found(&id));
    }

    tracing::info!("Subscription updated");

    Ok(Json(SubscriptionResponse::from(subscription)))
}

#[tracing::instrument(skip_all, fields(owner_id = %user.0, subscription_id = %id))]
pub async fn delete_subscription(
    State(state): State<AppState>,
    user: UserId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.store.delete(&user.0, &id).await;
    metrics::record_operation("delete", result.is_ok());
    if !result? {
        return Err(not_found(&id));
    }

    tracing::info!("Subscription deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Next renewal of one subscription as of today.
#[tracing::instrument(skip_all, fields(owner_id = %user.0, subscription_id = %id))]
pub async fn upcoming_renewal(
    State(state): State<AppState>,
    user: UserId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = load(&state, &user.0, &id).await?;
    let reference = today();

    let next = state.projector.next_occurrence(
        subscription.renewal_date,
        &subscription.cycle,
        reference,
    );
    metrics::record_projection(next.is_some());
    if next.is_none() {
        tracing::warn!(
            anchor = %subscription.renewal_date,
            cycle = %subscription.cycle.label(),
            "No renewal within projection limit"
        );
    }

    Ok(Json(UpcomingResponse {
        id: subscription.id,
        reference_date: reference,
        next_renewal: next,
        days_until: next.map(|d| (d - reference).num_days()),
        cycle_label: subscription.cycle.label(),
    }))
}

/// Pause every active subscription, or resume every inactive one.
#[tracing::instrument(skip_all, fields(owner_id = %user.0))]
pub async fn bulk_set_status(
    State(state): State<AppState>,
    user: UserId,
    Json(request): Json<BulkStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let from: &[SubscriptionStatus] = match request.status {
        SubscriptionStatus::Paused => &[SubscriptionStatus::Active],
        SubscriptionStatus::Active => &[SubscriptionStatus::Paused, SubscriptionStatus::Cancelled],
        SubscriptionStatus::Cancelled => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Bulk status must be 'paused' or 'active'"
            )))
        }
    };

    let result = state
        .store
        .set_status_all(&user.0, from, request.status)
        .await;
    metrics::record_operation("bulk_status", result.is_ok());
    let updated = result?;

    tracing::info!(status = %request.status, updated, "Bulk status change applied");

    Ok(Json(BulkStatusResponse {
        status: request.status,
        updated,
    }))
}

#[tracing::instrument(skip_all, fields(owner_id = %user.0))]
pub async fn import_subscriptions(
    State(state): State<AppState>,
    user: UserId,
    Json(request): Json<ImportRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let subscriptions = request
        .items
        .into_iter()
        .map(|item| -> Result<Subscription, AppError> {
            Ok(Subscription::new(user.0.clone(), item.into_new()?))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let result = state.store.insert_many(&subscriptions).await;
    metrics::record_operation("import", result.is_ok());
    result?;

    tracing::info!(count = subscriptions.len(), "Subscriptions imported");

    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            imported: subscriptions.len(),
            items: subscriptions.iter().map(SubscriptionResponse::from).collect(),
        }),
    ))
}

#[tracing::instrument(skip_all, fields(owner_id = %user.0))]
pub async fn export_subscriptions(
    State(state): State<AppState>,
    user: UserId,
    Query(params): Query<CurrencyParams>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.store.list(&user.0).await;
    metrics::record_operation("list", result.is_ok());
    let items = result?;

    Ok(Json(ExportResponse {
        currency: params
            .currency
            .unwrap_or(state.config.reporting.default_currency),
        items: items.iter().map(SubscriptionResponse::from).collect(),
        export_date: Utc::now().to_rfc3339(),
    }))
}

#[tracing::instrument(skip_all, fields(owner_id = %user.0))]
pub async fn purge_subscriptions(
    State(state): State<AppState>,
    user: UserId,
) -> Result<impl IntoResponse, AppError> {
    let result = state.store.delete_all(&user.0).await;
    metrics::record_operation("purge", result.is_ok());
    let deleted = result?;

    tracing::warn!(deleted, "All subscriptions purged");

    Ok(Json(PurgeResponse { deleted }))
}
