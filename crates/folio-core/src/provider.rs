//! Source traits for the remote feeds the widgets read from.
//!
//! This module defines the core source traits:
//!
//! - [`FeedProvider`] - Base trait for all sources
//! - [`FinancialsSource`] - Per-ticker financial statement records
//! - [`ValuationSource`] - Per-ticker valuation band documents
//! - [`PriceSource`] - Daily OHLCV bars for the price basket
//! - [`RepositorySource`] - Repository metadata for language statistics
//! - [`AnalyticsSource`] - Pre-aggregated page-view statistics
//!
//! Every fetch takes the caller's [`CancellationToken`]; a cancelled token
//! resolves the fetch to [`DataError::Cancelled`](crate::DataError::Cancelled).

use async_trait::async_trait;
use polars::prelude::DataFrame;
use std::fmt::Debug;

use crate::{
    bars,
    cancel::CancellationToken,
    error::Result,
    types::{FinancialPeriodRecord, Repository, SiteStats, Symbol},
    valuation::ValuationDocument,
};

/// Base trait for all data sources.
pub trait FeedProvider: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "GitHub").
    fn name(&self) -> &str;

    /// Returns a description of this source.
    fn description(&self) -> &str;
}

/// Source of raw financial statement records.
#[async_trait]
pub trait FinancialsSource: FeedProvider {
    /// Fetches the records for a ticker, newest first.
    async fn fetch_financials(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<Vec<FinancialPeriodRecord>>;
}

/// Source of valuation band documents.
#[async_trait]
pub trait ValuationSource: FeedProvider {
    /// Fetches the valuation document for a ticker.
    async fn fetch_valuation(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<ValuationDocument>;
}

/// Source of daily OHLCV bars for a fixed basket of symbols.
#[async_trait]
pub trait PriceSource: FeedProvider {
    /// Fetches every bar of the basket.
    ///
    /// Returns a DataFrame with columns: symbol, date, open, high, low, close, volume.
    async fn fetch_daily_bars(&self, cancel: &CancellationToken) -> Result<DataFrame>;

    /// Fetches the bars of a single symbol, oldest first.
    ///
    /// Default implementation filters the full basket. Sources with a
    /// per-symbol endpoint can override it.
    async fn fetch_ticker_series(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<DataFrame> {
        let frame = self.fetch_daily_bars(cancel).await?;
        bars::ticker_series(&frame, symbol)
    }
}

/// Source of repository metadata.
#[async_trait]
pub trait RepositorySource: FeedProvider {
    /// Fetches the public repositories owned by `owner`.
    async fn fetch_repositories(
        &self,
        owner: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Repository>>;
}

/// Source of page-view statistics.
#[async_trait]
pub trait AnalyticsSource: FeedProvider {
    /// Fetches the latest statistics snapshot.
    async fn fetch_site_stats(&self, cancel: &CancellationToken) -> Result<SiteStats>;
}
