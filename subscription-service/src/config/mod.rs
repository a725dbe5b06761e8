use crate::models::Currency;
use crate::renewal::MAX_PROJECTION_ITERATIONS;
use crate::services::rates::DEFAULT_RATES_ENDPOINT;
use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::config::{self as core_config, get_env, get_env_parsed, is_production};
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub storage: StorageConfig,
    pub rates: RatesConfig,
    pub reporting: ReportingConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub mongodb: Option<MongoConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    /// When false, only same-currency conversions succeed.
    pub enabled: bool,
    pub endpoint: String,
    pub cache_ttl_secs: u64,
    /// Upper bound on one rate fetch, connect to body.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    pub max_projection_iterations: u32,
    pub upcoming_window_days: i64,
    pub monthly_budget: Decimal,
    pub default_currency: Currency,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
}

impl SubscriptionConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = is_production();

        let backend: StorageBackend = get_env("STORAGE_BACKEND", Some("mongo"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let mongodb = match backend {
            StorageBackend::Mongo => Some(MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("subscription_db"), is_prod)?,
            }),
            StorageBackend::Memory => None,
        };

        Ok(SubscriptionConfig {
            common,
            service_name: get_env("SERVICE_NAME", Some("subscription-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            storage: StorageConfig { backend, mongodb },
            rates: RatesConfig {
                enabled: get_env_parsed("RATES_ENABLED", true, is_prod)?,
                endpoint: get_env("RATES_ENDPOINT", Some(DEFAULT_RATES_ENDPOINT), is_prod)?,
                cache_ttl_secs: get_env_parsed("RATES_CACHE_TTL_SECS", 3600, is_prod)?,
                timeout_secs: get_env_parsed("RATES_TIMEOUT_SECS", 10, is_prod)?,
            },
            reporting: ReportingConfig {
                max_projection_iterations: get_env_parsed(
                    "PROJECTION_MAX_ITERATIONS",
                    MAX_PROJECTION_ITERATIONS,
                    is_prod,
                )?,
                upcoming_window_days: get_env_parsed("UPCOMING_WINDOW_DAYS", 30, is_prod)?,
                monthly_budget: get_env_parsed("MONTHLY_BUDGET", Decimal::from(200), is_prod)?,
                default_currency: get_env_parsed("DEFAULT_CURRENCY", Currency::default(), is_prod)?,
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: get_env_parsed("RATE_LIMIT_PER_MINUTE", 120, is_prod)?,
            },
        })
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}
