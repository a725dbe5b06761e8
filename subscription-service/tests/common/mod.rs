#![allow(dead_code)]

use rust_decimal::Decimal;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use subscription_service::config::{
    RateLimitConfig, RatesConfig, ReportingConfig, StorageBackend, StorageConfig,
    SubscriptionConfig,
};
use subscription_service::models::Currency;
use subscription_service::renewal::MAX_PROJECTION_ITERATIONS;
use subscription_service::services::{InMemorySubscriptionStore, StaticRateSource};
use subscription_service::startup::Application;

pub const TEST_USER_ID: &str = "test_user_123";
pub const OTHER_USER_ID: &str = "other_user_456";

pub fn test_config() -> SubscriptionConfig {
    SubscriptionConfig {
        common: CoreConfig { port: 0 },
        service_name: "subscription-service".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            mongodb: None,
        },
        rates: RatesConfig {
            enabled: false,
            endpoint: "http://127.0.0.1:9".to_string(),
            cache_ttl_secs: 3600,
            timeout_secs: 5,
        },
        reporting: ReportingConfig {
            max_projection_iterations: MAX_PROJECTION_ITERATIONS,
            upcoming_window_days: 30,
            monthly_budget: Decimal::from(2000),
            default_currency: Currency::Inr,
        },
        rate_limit: RateLimitConfig {
            requests_per_minute: 10_000,
        },
    }
}

/// 1 USD = 80 INR, 1 EUR = 90 INR.
pub fn test_rates() -> StaticRateSource {
    StaticRateSource::new()
        .with_rate(Currency::Usd, Currency::Inr, Decimal::from(80))
        .with_rate(Currency::Eur, Currency::Inr, Decimal::from(90))
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: SubscriptionConfig) -> Self {
        let app = Application::build_with(
            config,
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(test_rates()),
        )
        .await
        .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn create(&self, user_id: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/dashboard"))
            .header("X-User-ID", user_id)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Create and return the stored record, asserting 201.
    pub async fn create_ok(&self, body: serde_json::Value) -> serde_json::Value {
        let response = self.create(TEST_USER_ID, body).await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse JSON")
    }

    pub async fn get(&self, user_id: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("X-User-ID", user_id)
            .send()
            .await
            .expect("Failed to execute request")
    }
}
