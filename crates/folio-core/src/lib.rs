#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/kungsiuchun/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the dashboard data layer.
//!
//! This crate provides the foundational abstractions shared by the feed
//! clients, the metrics builder and the widgets:
//!
//! - [`FeedProvider`](provider::FeedProvider) - Base trait for all sources
//! - [`FinancialsSource`](provider::FinancialsSource) - Financial statement records
//! - [`ValuationSource`](provider::ValuationSource) - Valuation band documents
//! - [`PriceSource`](provider::PriceSource) - Daily OHLCV bars
//! - [`RepositorySource`](provider::RepositorySource) - Repository metadata
//! - [`AnalyticsSource`](provider::AnalyticsSource) - Page-view statistics
//! - [`SettingsHandle`](settings::SettingsHandle) - Persisted user settings

/// DataFrame helpers for daily bars.
pub mod bars;
/// Cancellation token plumbing for fetches.
pub mod cancel;
/// Error types for data operations.
pub mod error;
/// Source traits for the remote feeds.
pub mod provider;
/// Seasonal overlay selection.
pub mod season;
/// Persisted user settings.
pub mod settings;
/// Core record types (Symbol, FinancialPeriodRecord, DailyBar, etc.).
pub mod types;
/// Valuation band document and selection keys.
pub mod valuation;

// Re-export commonly used items at crate root
pub use cancel::{CancellationToken, cancellable};
pub use error::{DataError, Result};
pub use provider::{
    AnalyticsSource, FeedProvider, FinancialsSource, PriceSource, RepositorySource,
    ValuationSource,
};
pub use season::SeasonalEffect;
pub use settings::{
    InMemorySettingsStore, JsonFileSettingsStore, Settings, SettingsHandle, SettingsStore, Theme,
};
pub use types::{DailyBar, FinancialPeriodRecord, PageViews, Repository, SiteStats, Symbol};
pub use valuation::{
    Band, BandStats, TimeWindow, ValuationBandPoint, ValuationDocument, ValuationModel,
};
