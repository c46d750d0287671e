//! Alpaca market-data REST client.
//!
//! Historical minute bars and latest trades. Credentials come from the
//! `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY` environment variables
//! (dotenv-loaded by the binary). Transport failures and HTTP 429 are
//! retried with bounded exponential backoff.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use super::models::{Bar, BarsResponse, LatestTradesResponse, Trade};

const KEY_ENV: &str = "APCA_API_KEY_ID";
const SECRET_ENV: &str = "APCA_API_SECRET_KEY";

const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_BASE_SECS: u64 = 4;
const BACKOFF_CAP_SECS: u64 = 60;
const RATE_LIMIT_WAIT_SECS: u64 = 60;
const BARS_PAGE_LIMIT: u32 = 10_000;

/// Market data feed errors.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API credentials not found: set {KEY_ENV} and {SECRET_ENV}")]
    MissingCredentials,

    #[error("request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("rate limited and retries exhausted")]
    RateLimited,
}

/// REST client for the Alpaca data API.
#[derive(Debug, Clone)]
pub struct AlpacaClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl AlpacaClient {
    /// Build a client with credentials taken from the environment.
    pub fn from_env(base_url: impl Into<String>) -> Result<Self, FeedError> {
        let api_key = std::env::var(KEY_ENV).map_err(|_| FeedError::MissingCredentials)?;
        let api_secret = std::env::var(SECRET_ENV).map_err(|_| FeedError::MissingCredentials)?;
        if api_key.is_empty() || api_secret.is_empty() {
            return Err(FeedError::MissingCredentials);
        }
        Self::new(base_url, api_key, api_secret)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, FeedError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        })
    }

    /// Fetch minute bars for one symbol over `[start, end]`, following
    /// pagination until the window is exhausted.
    pub async fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timeframe: &str,
    ) -> Result<Vec<Bar>, FeedError> {
        let url = format!("{}/v2/stocks/bars", self.base_url);
        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("symbols", symbol.to_string()),
                ("timeframe", timeframe.to_string()),
                ("start", start.to_rfc3339()),
                ("end", end.to_rfc3339()),
                ("limit", BARS_PAGE_LIMIT.to_string()),
                ("adjustment", "split".to_string()),
                ("feed", "sip".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let response: BarsResponse = self.get_with_retry(&url, &query).await?;
            if let Some(page) = response.bars.get(symbol) {
                bars.extend(page.iter().cloned());
            }

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::info!(symbol, count = bars.len(), "fetched historical bars");
        Ok(bars)
    }

    /// Fetch bars for a set of symbols; symbols with no data in the window
    /// are omitted from the result.
    pub async fn fetch_bars_for_symbols(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timeframe: &str,
    ) -> Result<HashMap<String, Vec<Bar>>, FeedError> {
        let mut out = HashMap::new();
        for symbol in symbols {
            let bars = self.fetch_bars(symbol, start, end, timeframe).await?;
            if bars.is_empty() {
                tracing::warn!(symbol, "no historical data received");
            } else {
                out.insert(symbol.clone(), bars);
            }
        }
        Ok(out)
    }

    /// Latest trade per symbol.
    pub async fn latest_trades(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Trade>, FeedError> {
        let url = format!("{}/v2/stocks/trades/latest", self.base_url);
        let query = vec![("symbols", symbols.join(","))];
        let response: LatestTradesResponse = self.get_with_retry(&url, &query).await?;
        Ok(response.trades)
    }

    async fn get_with_retry<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FeedError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = self
                .http
                .get(url)
                .header("APCA-API-KEY-ID", &self.api_key)
                .header("APCA-API-SECRET-KEY", &self.api_secret)
                .query(query)
                .send()
                .await;

            match result {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(FeedError::RateLimited);
                    }
                    tracing::warn!(attempt, "rate limit exceeded, waiting before retry");
                    tokio::time::sleep(Duration::from_secs(RATE_LIMIT_WAIT_SECS)).await;
                }
                Ok(response) if !response.status().is_success() => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(FeedError::Status { status, body });
                }
                Ok(response) => return Ok(response.json::<T>().await?),
                Err(err) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(FeedError::Http(err));
                    }
                    let wait = (BACKOFF_BASE_SECS << (attempt - 1)).min(BACKOFF_CAP_SECS);
                    tracing::warn!(attempt, wait, "transport error, retrying: {err}");
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_credentials() {
        std::env::remove_var(KEY_ENV);
        std::env::remove_var(SECRET_ENV);
        assert!(matches!(
            AlpacaClient::from_env("https://data.example.com"),
            Err(FeedError::MissingCredentials)
        ));
    }

    #[test]
    fn test_client_construction() {
        let client = AlpacaClient::new("https://data.example.com", "key", "secret");
        assert!(client.is_ok());
    }
}
