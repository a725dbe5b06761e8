//! Exchange rates for converting subscription prices into a display
//! currency.

use crate::models::Currency;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_RATES_ENDPOINT: &str =
    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1";

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Units of `to` per unit of `from`.
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, AppError>;
}

/// Fixed rate table.
#[derive(Debug, Clone, Default)]
pub struct StaticRateSource {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl StaticRateSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `from -> to` and its inverse.
    pub fn with_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
        if let Some(inverse) = Decimal::ONE.checked_div(rate) {
            self.rates.insert((to, from), inverse);
        }
        self.rates.insert((from, to), rate);
        self
    }
}

#[async_trait]
impl RateSource for StaticRateSource {
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, AppError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.rates.get(&(from, to)).copied().ok_or_else(|| {
            AppError::BadGateway(format!("No exchange rate from {} to {}", from, to))
        })
    }
}

struct CachedTable {
    fetched_at: Instant,
    rates: HashMap<Currency, Decimal>,
}

/// Rates fetched from the public currency API, cached per base currency.
pub struct HttpRateSource {
    client: Client,
    endpoint: String,
    ttl: Duration,
    cache: DashMap<Currency, CachedTable>,
}

impl HttpRateSource {
    /// `ttl` bounds how long a fetched table is reused; `timeout` bounds a
    /// single request to the API.
    pub fn new(
        endpoint: impl Into<String>,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            ttl,
            cache: DashMap::new(),
        })
    }

    fn cached(&self, from: Currency, to: Currency) -> Option<Decimal> {
        let table = self.cache.get(&from)?;
        if table.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        table.rates.get(&to).copied()
    }

    async fn fetch_table(&self, from: Currency) -> Result<HashMap<Currency, Decimal>, AppError> {
        let url = format!("{}/currencies/{}.json", self.endpoint, from.code());
        tracing::debug!(url = %url, "Fetching exchange rates");

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::error!(base = %from, "Failed to reach exchange rate API: {}", e);
            AppError::BadGateway(format!("Exchange rate API unreachable: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(base = %from, status = %status, "Exchange rate API returned an error");
            return Err(AppError::BadGateway(format!(
                "Exchange rate API returned status {}",
                status
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::BadGateway(format!("Failed to parse exchange rate response: {}", e))
        })?;

        parse_rate_table(&body, from)
    }
}

/// Extract `body[from][to]` for every supported `to`.
fn parse_rate_table(
    body: &serde_json::Value,
    from: Currency,
) -> Result<HashMap<Currency, Decimal>, AppError> {
    let table = body
        .get(from.code())
        .and_then(|v| v.as_object())
        .ok_or_else(|| {
            AppError::BadGateway(format!("Exchange rate response has no '{}' table", from.code()))
        })?;

    Ok(Currency::ALL
        .into_iter()
        .filter_map(|to| {
            let raw = table.get(&to.code())?.as_f64()?;
            Decimal::try_from(raw).ok().map(|rate| (to, rate))
        })
        .collect())
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, AppError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        if let Some(rate) = self.cached(from, to) {
            return Ok(rate);
        }

        let rates = self.fetch_table(from).await?;
        let rate = rates.get(&to).copied();
        tracing::info!(base = %from, count = rates.len(), "Cached exchange rates");
        self.cache.insert(
            from,
            CachedTable {
                fetched_at: Instant::now(),
                rates,
            },
        );

        rate.ok_or_else(|| AppError::BadGateway(format!("No exchange rate from {} to {}", from, to)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn spawn_rates_api(hits: Arc<AtomicUsize>) -> String {
        let app = Router::new().route(
            "/currencies/usd.json",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "date": "2024-03-01", "usd": { "inr": 83.25, "eur": 0.92 } }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_static_rates_are_symmetric() {
        let source = StaticRateSource::new().with_rate(Currency::Usd, Currency::Inr, Decimal::from(80));

        assert_eq!(
            source.rate(Currency::Usd, Currency::Inr).await.unwrap(),
            Decimal::from(80)
        );
        assert_eq!(
            source.rate(Currency::Inr, Currency::Usd).await.unwrap(),
            Decimal::new(125, 4)
        );
        assert_eq!(
            source.rate(Currency::Eur, Currency::Eur).await.unwrap(),
            Decimal::ONE
        );
        assert!(matches!(
            source.rate(Currency::Eur, Currency::Inr).await,
            Err(AppError::BadGateway(_))
        ));
    }

    #[test]
    fn test_parse_rate_table_keeps_supported_currencies() {
        let body = json!({ "usd": { "inr": 83.5, "btc": 0.00001, "eur": "n/a" } });
        let table = parse_rate_table(&body, Currency::Usd).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table[&Currency::Inr], Decimal::new(835, 1));
        assert!(parse_rate_table(&json!({}), Currency::Usd).is_err());
    }

    #[tokio::test]
    async fn test_http_source_caches_table_per_base() {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn_rates_api(hits.clone()).await;
        let source = HttpRateSource::new(endpoint, Duration::from_secs(3600), TIMEOUT).unwrap();

        let inr = source.rate(Currency::Usd, Currency::Inr).await.unwrap();
        let eur = source.rate(Currency::Usd, Currency::Eur).await.unwrap();

        assert_eq!(inr, Decimal::new(8325, 2));
        assert_eq!(eur, Decimal::new(92, 2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_source_refetches_after_ttl() {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn_rates_api(hits.clone()).await;
        let source = HttpRateSource::new(endpoint, Duration::ZERO, TIMEOUT).unwrap();

        source.rate(Currency::Usd, Currency::Inr).await.unwrap();
        source.rate(Currency::Usd, Currency::Inr).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_http_source_missing_rate_is_bad_gateway() {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn_rates_api(hits).await;
        let source = HttpRateSource::new(endpoint, Duration::from_secs(60), TIMEOUT).unwrap();

        assert!(matches!(
            source.rate(Currency::Usd, Currency::Jpy).await,
            Err(AppError::BadGateway(_))
        ));
        assert!(matches!(
            source.rate(Currency::Gbp, Currency::Inr).await,
            Err(AppError::BadGateway(_))
        ));
    }

    #[tokio::test]
    async fn test_http_source_times_out_on_slow_api() {
        let app = Router::new().route(
            "/currencies/usd.json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "usd": { "inr": 83.25 } }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let source = HttpRateSource::new(
            format!("http://{}", addr),
            Duration::from_secs(60),
            Duration::from_millis(200),
        )
        .unwrap();

        let started = Instant::now();
        let result = source.rate(Currency::Usd, Currency::Inr).await;

        assert!(matches!(result, Err(AppError::BadGateway(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
