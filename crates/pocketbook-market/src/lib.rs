//! Read-through aggregation of third-party market data.
//!
//! Five independent sources are queried concurrently. A source that fails or
//! returns an unexpected payload degrades to `None` in the overview instead
//! of failing the whole response.

pub mod sources;

use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sources::{FxRates, GoldPrice, Holiday, Quote};

const OVERVIEW_KEY: &str = "overview";

#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub indices_url: String,
    pub crypto_url: String,
    pub fx_url: String,
    pub gold_url: String,
    /// May contain `{year}` and `{country}` placeholders.
    pub holidays_url: String,
    pub holiday_country: String,
    pub api_key: Option<String>,
    pub cache_secs: u64,
    pub request_timeout: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            indices_url: "https://query1.finance.yahoo.com/v7/finance/quote?symbols=%5EIBEX,%5EGSPC,%5EIXIC,%5ESTOXX50E".into(),
            crypto_url: "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin,ethereum,solana&vs_currencies=eur&include_24hr_change=true".into(),
            fx_url: "https://api.frankfurter.app/latest?from=EUR&to=USD,GBP,JPY,CHF".into(),
            gold_url: "https://api.metalpriceapi.com/v1/latest?base=EUR&currencies=XAU".into(),
            holidays_url: "https://date.nager.at/api/v3/PublicHolidays/{year}/{country}".into(),
            holiday_country: "ES".into(),
            api_key: None,
            cache_secs: 300,
            request_timeout: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOverview {
    pub indices: Option<Vec<Quote>>,
    pub crypto: Option<Vec<Quote>>,
    pub fx: Option<FxRates>,
    pub gold: Option<GoldPrice>,
    pub holidays: Option<Vec<Holiday>>,
    pub fetched_at: DateTime<Utc>,
}

impl MarketOverview {
    fn is_empty(&self) -> bool {
        self.indices.is_none()
            && self.crypto.is_none()
            && self.fx.is_none()
            && self.gold.is_none()
            && self.holidays.is_none()
    }
}

pub struct MarketClient {
    http: reqwest::Client,
    config: MarketConfig,
    cache: Cache<&'static str, MarketOverview>,
}

impl MarketClient {
    pub fn new(config: MarketConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pocketbook/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.request_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(4)
            .time_to_live(Duration::from_secs(config.cache_secs.max(1)))
            .build();

        Ok(Self { http, config, cache })
    }

    /// Cached overview of every source. An overview where every source
    /// failed is returned but not cached.
    pub async fn overview(&self) -> MarketOverview {
        if let Some(hit) = self.cache.get(OVERVIEW_KEY) {
            debug!("Market overview served from cache");
            return hit;
        }

        let overview = self.fetch_overview().await;
        if overview.is_empty() {
            warn!("Every market source failed; overview not cached");
        } else {
            self.cache.insert(OVERVIEW_KEY, overview.clone());
        }
        overview
    }

    async fn fetch_overview(&self) -> MarketOverview {
        let now = Utc::now();
        let holidays_url = self.holidays_url(now.year());

        let (indices, crypto, fx, gold, holidays) = tokio::join!(
            self.fetch_source("indices", &self.config.indices_url, sources::normalize_indices),
            self.fetch_source("crypto", &self.config.crypto_url, sources::normalize_crypto),
            self.fetch_source("fx", &self.config.fx_url, sources::normalize_fx),
            self.fetch_source("gold", &self.config.gold_url, sources::normalize_gold),
            self.fetch_source("holidays", &holidays_url, |payload| {
                sources::upcoming_holidays(payload, now.date_naive())
            }),
        );

        info!(
            indices = indices.is_some(),
            crypto = crypto.is_some(),
            fx = fx.is_some(),
            gold = gold.is_some(),
            holidays = holidays.is_some(),
            "Market overview fetched"
        );

        MarketOverview {
            indices,
            crypto,
            fx,
            gold,
            holidays,
            fetched_at: now,
        }
    }

    /// Full holiday calendar for one year. Not cached.
    pub async fn holidays(&self, year: i32) -> anyhow::Result<Vec<Holiday>> {
        let payload = self.get_json(&self.holidays_url(year)).await?;
        sources::normalize_holidays(payload)
    }

    fn holidays_url(&self, year: i32) -> String {
        self.config
            .holidays_url
            .replace("{year}", &year.to_string())
            .replace("{country}", &self.config.holiday_country)
    }

    async fn fetch_source<T>(
        &self,
        name: &str,
        url: &str,
        normalize: impl FnOnce(serde_json::Value) -> anyhow::Result<T>,
    ) -> Option<T> {
        let result = match self.get_json(url).await {
            Ok(payload) => normalize(payload),
            Err(e) => Err(e),
        };
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Market source {} unavailable: {:#}", name, e);
                None
            }
        }
    }

    async fn get_json(&self, url: &str) -> anyhow::Result<serde_json::Value> {
        let mut request = self.http.get(url);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-api-key", key);
        }
        let payload = request.send().await?.error_for_status()?.json().await?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::routing::{MethodRouter, get};
    use axum::{Json, Router};
    use serde_json::json;

    fn unreachable_config() -> MarketConfig {
        let dead = "http://127.0.0.1:9/unreachable".to_string();
        MarketConfig {
            indices_url: dead.clone(),
            crypto_url: dead.clone(),
            fx_url: dead.clone(),
            gold_url: dead.clone(),
            holidays_url: format!("{}/{{year}}/{{country}}", dead),
            request_timeout: Duration::from_secs(2),
            ..MarketConfig::default()
        }
    }

    #[tokio::test]
    async fn failed_sources_degrade_to_none() {
        let client = MarketClient::new(unreachable_config()).unwrap();
        let overview = client.overview().await;

        assert!(overview.indices.is_none());
        assert!(overview.crypto.is_none());
        assert!(overview.fx.is_none());
        assert!(overview.gold.is_none());
        assert!(overview.holidays.is_none());
        assert!(client.cache.get(OVERVIEW_KEY).is_none());
    }

    #[test]
    fn holidays_url_fills_placeholders() {
        let client = MarketClient::new(MarketConfig {
            holiday_country: "PT".into(),
            ..MarketConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.holidays_url(2027),
            "https://date.nager.at/api/v3/PublicHolidays/2027/PT"
        );
    }

    /// Serves canned payloads for every source and counts the requests.
    fn counted(hits: &Arc<AtomicUsize>, body: serde_json::Value) -> MethodRouter {
        let hits = hits.clone();
        get(move || {
            hits.fetch_add(1, Ordering::SeqCst);
            let body = body.clone();
            async move { Json(body) }
        })
    }

    async fn stub_config(hits: &Arc<AtomicUsize>) -> MarketConfig {
        let app = Router::new()
            .route(
                "/indices",
                counted(hits, json!({"quoteResponse": {"result": [
                    {"symbol": "^GSPC", "shortName": "S&P 500", "regularMarketPrice": 5000.0, "regularMarketChangePercent": 0.5}
                ]}})),
            )
            .route("/crypto", counted(hits, json!({"bitcoin": {"eur": 60000.0, "eur_24h_change": 1.0}})))
            .route("/fx", counted(hits, json!({"base": "EUR", "date": "2026-10-16", "rates": {"USD": 1.09}})))
            .route("/gold", counted(hits, json!({"base": "EUR", "rates": {"XAU": 0.0005}})))
            .route(
                "/holidays/{year}/{country}",
                counted(hits, json!([
                    {"date": "2099-12-25", "localName": "Navidad", "name": "Christmas Day"},
                    {"date": "2099-01-01", "localName": "Año Nuevo", "name": "New Year's Day"}
                ])),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MarketConfig {
            indices_url: format!("{}/indices", base),
            crypto_url: format!("{}/crypto", base),
            fx_url: format!("{}/fx", base),
            gold_url: format!("{}/gold", base),
            holidays_url: format!("{}/holidays/{{year}}/{{country}}", base),
            request_timeout: Duration::from_secs(5),
            ..MarketConfig::default()
        }
    }

    #[tokio::test]
    async fn successful_overview_is_served_from_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let client = MarketClient::new(stub_config(&hits).await).unwrap();

        let first = client.overview().await;
        assert_eq!(first.indices.as_ref().unwrap()[0].symbol, "^GSPC");
        assert_eq!(first.crypto.as_ref().unwrap()[0].symbol, "BTC");
        assert_eq!(first.fx.as_ref().unwrap().rates["USD"], 1.09);
        assert_eq!(first.gold.as_ref().unwrap().price_per_ounce, 2000.0);
        assert_eq!(first.holidays.as_ref().unwrap().len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 5);

        let second = client.overview().await;
        assert_eq!(hits.load(Ordering::SeqCst), 5);
        assert_eq!(second.fetched_at, first.fetched_at);
    }

    #[tokio::test]
    async fn holidays_bypass_the_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let client = MarketClient::new(stub_config(&hits).await).unwrap();

        let holidays = client.holidays(2099).await.unwrap();
        let names: Vec<&str> = holidays.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["New Year's Day", "Christmas Day"]);

        client.holidays(2099).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
