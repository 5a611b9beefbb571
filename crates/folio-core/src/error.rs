//! Error types for dashboard data operations.
//!
//! This module defines [`DataError`] which covers every failure a widget can
//! observe while fetching, parsing, or enriching remote data.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during data operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Transport failure or a non-success HTTP status.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// The remote resource for a symbol or user does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded by a remote service.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The service that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<Duration>,
    },

    /// The payload could not be decoded into the expected shape.
    #[error("Parse failed: {0}")]
    ParseFailed(String),

    /// A record decoded fine but lacks the inputs a derived value needs.
    #[error("Incomplete record {date}: {field} is not a finite number")]
    IncompleteRecord {
        /// Reporting date of the offending record.
        date: String,
        /// Name of the first field that could not be computed.
        field: &'static str,
    },

    /// A record lacks a raw input that a derived value needs.
    #[error("Record {date} has no {field}")]
    MissingInput {
        /// Reporting date of the record.
        date: String,
        /// Feed name of the first absent input.
        field: &'static str,
    },

    /// The request was superseded or its owner went away.
    #[error("Request cancelled")]
    Cancelled,

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No source is registered for the requested data.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// Reading or writing the settings store failed.
    #[error("Settings error: {0}")]
    Settings(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl DataError {
    /// Returns true for the transport family: fetch, not-found and rate-limit errors.
    #[must_use]
    pub const fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed(_) | Self::NotFound(_) | Self::RateLimited { .. }
        )
    }

    /// Returns true if the error only means a newer request took over.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;
