#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/kungsiuchun/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Client for the pre-computed static feeds behind the dashboard.
//!
//! This crate implements the folio-core source traits for JSON and CSV files
//! published by upstream jobs:
//!
//! - `data/processed/{TICKER}_combined.json` - financial statement records
//! - `data/results/{TICKER}/valuation_summary.json` - valuation band document
//! - a daily OHLCV CSV for a fixed basket of symbols
//! - `stats.json` - page-view statistics
//!
//! # Usage
//!
//! ```rust,ignore
//! use folio_core::{CancellationToken, FinancialsSource, Symbol};
//! use folio_feeds::FeedClient;
//!
//! #[tokio::main]
//! async fn main() -> folio_core::Result<()> {
//!     let client = FeedClient::new();
//!     let cancel = CancellationToken::new();
//!
//!     let records = client.fetch_financials(&Symbol::new("AAPL"), &cancel).await?;
//!     println!("{} periods", records.len());
//!
//!     Ok(())
//! }
//! ```

/// Endpoint configuration.
pub mod config;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use folio_core::{
    AnalyticsSource, CancellationToken, DailyBar, DataError, FeedProvider, FinancialPeriodRecord,
    FinancialsSource, PriceSource, Result, SiteStats, Symbol, ValuationDocument,
    ValuationSource, bars, cancellable,
};
use polars::prelude::DataFrame;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

pub use config::FeedConfig;

/// Client for the static financials, valuation, bars and analytics feeds.
#[derive(Clone, Debug)]
pub struct FeedClient {
    client: Client,
    config: FeedConfig,
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedClient {
    /// Create a client for the default endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            config: FeedConfig::default(),
        }
    }

    /// Create a client for custom endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Other`] if the HTTP client cannot be built.
    pub fn with_config(config: FeedConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DataError::Other(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create a client with a custom HTTP client.
    #[must_use]
    pub const fn with_client(client: Client, config: FeedConfig) -> Self {
        Self { client, config }
    }

    /// Returns the endpoint configuration.
    #[must_use]
    pub const fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Appends the cache-busting query when enabled.
    fn url(&self, url: String) -> String {
        if !self.config.cache_bust {
            return url;
        }
        let t = Utc::now().timestamp_millis();
        if url.contains('?') {
            format!("{url}&t={t}")
        } else {
            format!("{url}?t={t}")
        }
    }

    fn financials_url(&self, symbol: &Symbol) -> String {
        self.url(format!(
            "{}/data/processed/{}_combined.json",
            self.config.data_base_url, symbol
        ))
    }

    fn valuation_url(&self, symbol: &Symbol) -> String {
        self.url(format!(
            "{}/data/results/{}/valuation_summary.json",
            self.config.data_base_url, symbol
        ))
    }

    fn stats_url(&self) -> String {
        self.url(format!("{}/stats.json", self.config.site_url))
    }

    fn bars_url(&self) -> String {
        self.url(self.config.bars_url.clone())
    }

    /// GET a resource and return its body, mapping statuses to errors.
    async fn get_text(
        &self,
        url: &str,
        resource: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        debug!("Feed request: {}", url);

        cancellable(cancel, async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| DataError::FetchFailed(e.to_string()))?;

            match response.status() {
                StatusCode::NOT_FOUND => {
                    return Err(DataError::NotFound(format!("Data for {resource} not found")));
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    return Err(DataError::RateLimited {
                        provider: "Feeds".to_string(),
                        retry_after: None,
                    });
                }
                status if !status.is_success() => {
                    let text = response.text().await.unwrap_or_default();
                    return Err(DataError::FetchFailed(format!("HTTP {status}: {text}")));
                }
                _ => {}
            }

            response
                .text()
                .await
                .map_err(|e| DataError::FetchFailed(e.to_string()))
        })
        .await
    }

    /// GET a JSON resource and decode it.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        resource: &str,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let text = self.get_text(url, resource, cancel).await?;
        serde_json::from_str(&text).map_err(|e| DataError::ParseFailed(format!("{resource}: {e}")))
    }
}

fn check_symbol(symbol: &Symbol) -> Result<()> {
    if symbol.is_valid() {
        Ok(())
    } else {
        Err(DataError::InvalidParameter(format!("Invalid symbol: {symbol:?}")))
    }
}

impl FeedProvider for FeedClient {
    fn name(&self) -> &str {
        "Feeds"
    }

    fn description(&self) -> &str {
        "Pre-computed financials, valuation bands, daily bars and site statistics"
    }
}

#[async_trait]
impl FinancialsSource for FeedClient {
    #[instrument(skip(self, cancel), fields(symbol = %symbol))]
    async fn fetch_financials(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<Vec<FinancialPeriodRecord>> {
        check_symbol(symbol)?;
        let records: Vec<FinancialPeriodRecord> = self
            .get_json(&self.financials_url(symbol), symbol.as_str(), cancel)
            .await?;

        if records.is_empty() {
            return Err(DataError::NotFound(format!("Data for {symbol} not found")));
        }

        debug!(periods = records.len(), "Fetched financials");
        Ok(records)
    }
}

#[async_trait]
impl ValuationSource for FeedClient {
    #[instrument(skip(self, cancel), fields(symbol = %symbol))]
    async fn fetch_valuation(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<ValuationDocument> {
        check_symbol(symbol)?;
        let doc: ValuationDocument = self
            .get_json(&self.valuation_url(symbol), symbol.as_str(), cancel)
            .await?;

        debug!(points = doc.len(), "Fetched valuation document");
        Ok(doc)
    }
}

#[async_trait]
impl PriceSource for FeedClient {
    #[instrument(skip(self, cancel))]
    async fn fetch_daily_bars(&self, cancel: &CancellationToken) -> Result<DataFrame> {
        let text = self.get_text(&self.bars_url(), "daily bars", cancel).await?;
        let bars = parse_bars_csv(&text)?;
        debug!(rows = bars.len(), "Fetched daily bars");
        bars::bars_frame(&bars)
    }
}

#[async_trait]
impl AnalyticsSource for FeedClient {
    #[instrument(skip(self, cancel))]
    async fn fetch_site_stats(&self, cancel: &CancellationToken) -> Result<SiteStats> {
        self.get_json(&self.stats_url(), "stats.json", cancel).await
    }
}

/// Parses the daily bars CSV (`date,T,o,h,l,c,v`).
///
/// Rows without a date, ticker or non-zero close are dropped, as are rows
/// whose fields do not decode. Missing open/high/low/volume become `NaN`.
///
/// # Errors
///
/// Returns [`DataError::ParseFailed`] if the header lacks a required column.
pub fn parse_bars_csv(text: &str) -> Result<Vec<DailyBar>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DataError::ParseFailed(e.to_string()))?;
    for required in ["date", "T", "c"] {
        if !headers.iter().any(|h| h == required) {
            return Err(DataError::ParseFailed(format!(
                "daily bars: missing column {required}"
            )));
        }
    }

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    for row in reader.deserialize::<BarRow>() {
        match row.ok().and_then(BarRow::into_bar) {
            Some(bar) => bars.push(bar),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, "Dropped incomplete bar rows");
    }
    Ok(bars)
}

// ============================================================================
// Feed Response Types
// ============================================================================

/// One row of the daily bars CSV.
#[derive(Debug, Deserialize)]
struct BarRow {
    date: Option<String>,
    #[serde(rename = "T")]
    ticker: Option<String>,
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    c: Option<f64>,
    v: Option<f64>,
}

impl BarRow {
    fn into_bar(self) -> Option<DailyBar> {
        let date = self.date.filter(|d| !d.is_empty())?;
        let date = NaiveDate::parse_from_str(date.get(..10).unwrap_or(&date), "%Y-%m-%d").ok()?;
        let ticker = self.ticker.filter(|t| !t.is_empty())?;
        let close = self.c.filter(|c| *c != 0.0 && !c.is_nan())?;

        Some(DailyBar {
            symbol: Symbol::new(ticker),
            date,
            open: self.o.unwrap_or(f64::NAN),
            high: self.h.unwrap_or(f64::NAN),
            low: self.l.unwrap_or(f64::NAN),
            close,
            volume: self.v.unwrap_or(f64::NAN),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> FeedClient {
        FeedClient::with_config(FeedConfig::with_base(server.uri()).cache_bust(false)).unwrap()
    }

    #[test]
    fn test_url_building() {
        let client = FeedClient::with_config(
            FeedConfig::with_base("https://example.com/").cache_bust(false),
        )
        .unwrap();
        let symbol = Symbol::new("aapl");
        assert_eq!(
            client.financials_url(&symbol),
            "https://example.com/data/processed/AAPL_combined.json"
        );
        assert_eq!(
            client.valuation_url(&symbol),
            "https://example.com/data/results/AAPL/valuation_summary.json"
        );
        assert_eq!(client.stats_url(), "https://example.com/stats.json");
    }

    #[test]
    fn test_cache_bust_query() {
        let client = FeedClient::new();
        let url = client.financials_url(&Symbol::new("MSFT"));
        assert!(url.contains("MSFT_combined.json?t="));
    }

    #[test]
    fn test_provider_metadata() {
        let client = FeedClient::new();
        assert_eq!(client.name(), "Feeds");
        assert!(!client.description().is_empty());
    }

    #[test]
    fn test_parse_bars_drops_incomplete_rows() {
        let csv = "date,T,o,h,l,c,v\n\
                   2024-01-02,AAPL,185.0,186.1,183.9,185.6,82488700\n\
                   2024-01-02,MSFT,373.9,375.9,366.8,370.9,25258600\n\
                   ,AAPL,1,1,1,1,1\n\
                   2024-01-03,,1,1,1,1,1\n\
                   2024-01-03,AAPL,184.2,185.9,183.4,,58414500\n\
                   2024-01-03,KO,59.1,59.6,58.9,0,1000\n\
                   2024-01-04,AAPL,182.1,183.1,180.9,181.9,\n";

        let bars = parse_bars_csv(csv).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].symbol, Symbol::new("AAPL"));
        assert_eq!(bars[1].close, 370.9);
        assert!(bars[2].volume.is_nan());
    }

    #[test]
    fn test_parse_bars_requires_columns() {
        let err = parse_bars_csv("date,ticker,close\n2024-01-02,AAPL,1\n").unwrap_err();
        assert!(matches!(err, DataError::ParseFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_financials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/processed/AAPL_combined.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"date": "2024-09-28", "period": "FY", "revenue": 391035000000.0,
                 "grossProfit": 180683000000.0, "netIncome": 93736000000.0},
                {"date": "2023-09-30", "period": "FY", "revenue": 383285000000.0}
            ])))
            .mount(&server)
            .await;

        let records = client_for(&server)
            .fetch_financials(&Symbol::new("AAPL"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, "2024-09-28");
        assert_eq!(records[1].gross_profit, None);
    }

    #[tokio::test]
    async fn test_missing_ticker_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_financials(&Symbol::new("ZZZZ"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
        assert!(err.is_fetch_failure());
    }

    #[tokio::test]
    async fn test_server_error_is_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_site_stats(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::FetchFailed(ref m) if m.contains("maintenance")));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/results/AAPL/valuation_summary.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_valuation(&Symbol::new("AAPL"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::ParseFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_valuation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/results/NVDA/valuation_summary.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ticker": "NVDA",
                "averages": {"pe": {"2Y": 55.2}},
                "last_updated": "2024-06-04 22:15",
                "data": [{"date": "2024-06-03", "price": 115.0,
                          "valuation": {"2Y": {"pe": {"mean": 100.0}}}}]
            })))
            .mount(&server)
            .await;

        let doc = client_for(&server)
            .fetch_valuation(&Symbol::new("NVDA"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(doc.ticker, "NVDA");
        assert_eq!(doc.last_updated.as_deref(), Some("2024-06-04 22:15"));
        assert_eq!(doc.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_daily_bars_and_series() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dow30.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "date,T,o,h,l,c,v\n\
                 2024-01-03,AAPL,184.2,185.9,183.4,184.3,58414500\n\
                 2024-01-02,AAPL,185.0,186.1,183.9,185.6,82488700\n\
                 2024-01-02,MSFT,373.9,375.9,366.8,370.9,25258600\n",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        let frame = client.fetch_daily_bars(&cancel).await.unwrap();
        assert_eq!(frame.height(), 3);

        let series = client
            .fetch_ticker_series(&Symbol::new("AAPL"), &cancel)
            .await
            .unwrap();
        let bars = bars::frame_to_bars(&series).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[0].date < bars[1].date);
    }

    #[tokio::test]
    async fn test_fetch_site_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "last_updated": "2025-01-01 08:00",
                "top_pages": [{"title": "Home", "users": 42}]
            })))
            .mount(&server)
            .await;

        let stats = client_for(&server)
            .fetch_site_stats(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stats.total_users(), 42);
    }

    #[tokio::test]
    async fn test_invalid_symbol_rejected_before_request() {
        let err = FeedClient::new()
            .fetch_financials(&Symbol::new("../x"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_slow_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = client_for(&server)
            .fetch_financials(&Symbol::new("AAPL"), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
