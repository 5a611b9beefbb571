#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/kungsiuchun/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Dashboard data layer.
//!
//! This crate re-exports the core types, the metrics and band selection
//! functions and the feed clients, and provides a [`Dashboard`] that wires
//! sources to cancellable [`Widget`] request slots.
//!
//! # Features
//!
//! - `feeds` - Static financials, valuation, daily bars and stats feeds
//! - `github` - GitHub repository metadata for the language chart

// Core types and traits
pub use folio_core::*;

// Pure transformations
pub use folio_metrics::{
    AreaKind, BandArea, BandRow, BandSelection, BandTuple, DerivedMetrics, EnrichPolicy,
    EnrichedRecord, EnrichedSeries, LanguageShare, MetricsBuilder, counted_repos, derive,
    language_shares, select_bands, try_derive,
};

// Sources
#[cfg(feature = "feeds")]
pub use folio_feeds::{FeedClient, FeedConfig};
#[cfg(feature = "github")]
pub use folio_github::{GithubClient, GithubConfig};

mod dashboard;
mod widget;
pub use dashboard::Dashboard;
pub use widget::{Widget, WidgetState};
