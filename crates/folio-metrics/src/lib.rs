#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/kungsiuchun/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Pure transformations behind the dashboard widgets.
//!
//! - [`MetricsBuilder`] - Derives margins, returns and leverage per period
//! - [`select_bands`] - Picks valuation band lines for a window and model
//! - [`language_shares`] - Counts primary languages across repositories
//!
//! Nothing here performs I/O; every function is deterministic in its inputs.

/// Valuation band selection.
pub mod bands;
/// Derived financial metrics.
pub mod enrich;
/// Repository language statistics.
pub mod languages;

pub use bands::{AreaKind, BandArea, BandRow, BandSelection, BandTuple, select_bands};
pub use enrich::{
    DerivedMetrics, EnrichPolicy, EnrichedRecord, EnrichedSeries, MetricsBuilder, derive,
    try_derive,
};
pub use languages::{LanguageShare, counted_repos, language_shares};
