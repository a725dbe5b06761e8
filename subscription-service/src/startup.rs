use crate::config::{StorageBackend, SubscriptionConfig};
use crate::handlers;
use crate::renewal::RenewalProjector;
use crate::services::{
    HttpRateSource, InMemorySubscriptionStore, MongoDb, MongoSubscriptionStore, RateSource,
    StaticRateSource, SubscriptionStore,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: SubscriptionConfig,
    pub store: Arc<dyn SubscriptionStore>,
    pub rates: Arc<dyn RateSource>,
    pub projector: RenewalProjector,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

async fn build_store(config: &SubscriptionConfig) -> Result<Arc<dyn SubscriptionStore>, AppError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory subscription store; data is lost on restart");
            Ok(Arc::new(InMemorySubscriptionStore::new()))
        }
        StorageBackend::Mongo => {
            let mongo = config.storage.mongodb.as_ref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("MongoDB settings missing for mongo backend"))
            })?;
            let db = MongoDb::connect(&mongo.uri, &mongo.database)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to MongoDB: {}", e);
                    e
                })?;
            db.initialize_indexes().await.map_err(|e| {
                tracing::error!("Failed to initialize database indexes: {}", e);
                e
            })?;
            Ok(Arc::new(MongoSubscriptionStore::new(db)))
        }
    }
}

fn build_rates(config: &SubscriptionConfig) -> Result<Arc<dyn RateSource>, AppError> {
    if config.rates.enabled {
        Ok(Arc::new(HttpRateSource::new(
            config.rates.endpoint.clone(),
            Duration::from_secs(config.rates.cache_ttl_secs),
            Duration::from_secs(config.rates.timeout_secs),
        )?))
    } else {
        tracing::info!("Exchange rates disabled; only same-currency conversion is available");
        Ok(Arc::new(StaticRateSource::new()))
    }
}

impl Application {
    pub async fn build(config: SubscriptionConfig) -> Result<Self, AppError> {
        let store = build_store(&config).await?;
        let rates = build_rates(&config)?;
        Self::build_with(config, store, rates).await
    }

    /// Build against explicit collaborators instead of the configured ones.
    pub async fn build_with(
        config: SubscriptionConfig,
        store: Arc<dyn SubscriptionStore>,
        rates: Arc<dyn RateSource>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            projector: RenewalProjector::new(config.reporting.max_projection_iterations),
            config: config.clone(),
            store,
            rates,
        };

        let limiter = create_ip_rate_limiter(config.rate_limit.requests_per_minute, 60);

        let api = Router::new()
            .route(
                "/api/dashboard",
                get(handlers::list_dashboard)
                    .post(handlers::create_subscription)
                    .delete(handlers::purge_subscriptions),
            )
            .route("/api/dashboard/addSub", post(handlers::create_subscription))
            .route("/api/dashboard/summary", get(handlers::dashboard_summary))
            .route("/api/dashboard/status", post(handlers::bulk_set_status))
            .route("/api/dashboard/import", post(handlers::import_subscriptions))
            .route("/api/dashboard/export", get(handlers::export_subscriptions))
            .route(
                "/api/dashboard/:id",
                get(handlers::get_subscription)
                    .put(handlers::update_subscription)
                    .delete(handlers::delete_subscription),
            )
            .route("/api/dashboard/:id/upcoming", get(handlers::upcoming_renewal))
            .layer(middleware::from_fn_with_state(
                limiter,
                ip_rate_limit_middleware,
            ));

        let app = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .merge(api)
            .layer(middleware::from_fn(metrics_middleware))
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        );

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
