use crate::config::Settings;
use crate::ingest::types::{
    DividendsResponse, FinancialsResponse, FundamentalsResponse, HistoryResponse, NewsResponse,
};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRange {
    FiveDays,
    TenDays,
    OneMonth,
}

impl HistoryRange {
    pub fn as_query(&self) -> &'static str {
        match self {
            HistoryRange::FiveDays => "5d",
            HistoryRange::TenDays => "10d",
            HistoryRange::OneMonth => "1mo",
        }
    }
}

/// Per-asset access to the external quote/history/fundamentals provider.
/// One implementation speaks HTTP JSON; tests provide fixtures.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_history(&self, symbol: &str, range: HistoryRange) -> Result<HistoryResponse>;

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalsResponse>;

    async fn fetch_dividends(&self, symbol: &str) -> Result<DividendsResponse>;

    async fn fetch_news(&self, symbol: &str) -> Result<NewsResponse>;

    async fn fetch_financials(&self, symbol: &str) -> Result<FinancialsResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpJsonMarketData {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retries: u32,
}

impl HttpJsonMarketData {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_market_data_base_url()?.to_string();
        let api_key = settings.market_data_api_key.clone();

        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("MARKET_DATA_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let res = self
            .http
            .get(self.url(path))
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;

        if !status.is_success() {
            anyhow::bail!("market data HTTP {status}: {text}");
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("market data response is not valid JSON for {path}: {text}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.get_json_once::<T>(path, query).await {
                Ok(parsed) => return Ok(parsed),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, path, ?backoff, error = %err, "market data fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for HttpJsonMarketData {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_history(&self, symbol: &str, range: HistoryRange) -> Result<HistoryResponse> {
        self.get_json("/v1/history", &[("symbol", symbol), ("range", range.as_query())])
            .await
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalsResponse> {
        self.get_json("/v1/fundamentals", &[("symbol", symbol)]).await
    }

    async fn fetch_dividends(&self, symbol: &str) -> Result<DividendsResponse> {
        self.get_json("/v1/dividends", &[("symbol", symbol)]).await
    }

    async fn fetch_news(&self, symbol: &str) -> Result<NewsResponse> {
        self.get_json("/v1/news", &[("symbol", symbol)]).await
    }

    async fn fetch_financials(&self, symbol: &str) -> Result<FinancialsResponse> {
        self.get_json("/v1/financials", &[("symbol", symbol)]).await
    }
}
