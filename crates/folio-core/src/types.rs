//! Core data types for the dashboard feeds.
//!
//! This module defines the records the widgets consume:
//!
//! - [`Symbol`] - Ticker symbol
//! - [`FinancialPeriodRecord`] - One reporting period of statement data
//! - [`DailyBar`] - One daily OHLCV row of the price basket
//! - [`Repository`] - Source-control repository metadata
//! - [`SiteStats`] - Pre-aggregated page-view statistics

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A ticker symbol.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the symbol is empty or contains characters that
    /// cannot appear in a feed path.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Raw per-period financial statement record, as delivered by the
/// financials feed (newest first).
///
/// Every numeric field is nullable; derived ratios are computed by the
/// metrics builder and never stored here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialPeriodRecord {
    /// Reporting date, `YYYY-MM-DD`.
    pub date: String,
    /// Fiscal period label (e.g. "FY", "Q3").
    #[serde(default)]
    pub period: Option<String>,
    /// Ticker symbol as reported by the feed.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Fiscal year, delivered either as a number or a string.
    #[serde(default, deserialize_with = "string_or_number")]
    pub fiscal_year: Option<String>,
    /// Date the statement was filed.
    #[serde(default)]
    pub filing_date: Option<String>,

    // Income statement
    /// Total revenue.
    pub revenue: Option<f64>,
    /// Gross profit.
    pub gross_profit: Option<f64>,
    /// Operating income.
    pub operating_income: Option<f64>,
    /// Net income.
    pub net_income: Option<f64>,
    /// Earnings per share.
    pub eps: Option<f64>,

    // Balance sheet
    /// Total assets.
    pub total_assets: Option<f64>,
    /// Total current assets.
    pub total_current_assets: Option<f64>,
    /// Total current liabilities.
    pub total_current_liabilities: Option<f64>,
    /// Total stockholders' equity.
    pub total_stockholders_equity: Option<f64>,
    /// Total debt.
    pub total_debt: Option<f64>,
    /// Cash and short-term investments.
    pub cash_and_short_term_investments: Option<f64>,

    // Cash flow statement
    /// Operating cash flow.
    pub operating_cash_flow: Option<f64>,
    /// Capital expenditure (usually negative).
    pub capital_expenditure: Option<f64>,
    /// Free cash flow.
    pub free_cash_flow: Option<f64>,
    /// Cash spent on share repurchases (usually negative).
    pub common_stock_repurchased: Option<f64>,
    /// Cash paid as common dividends (usually negative).
    pub common_dividends_paid: Option<f64>,

    // Market
    /// Share price at the reporting date.
    pub stock_price: Option<f64>,

    // Growth, precomputed upstream
    /// Revenue growth year over year, in percent.
    #[serde(rename = "revenue_yoy")]
    pub revenue_yoy: Option<f64>,
    /// Net income growth year over year, in percent.
    #[serde(rename = "netIncome_yoy")]
    pub net_income_yoy: Option<f64>,
    /// Revenue growth quarter over quarter, in percent.
    #[serde(rename = "revenue_qoq")]
    pub revenue_qoq: Option<f64>,
    /// Net income growth quarter over quarter, in percent.
    #[serde(rename = "netIncome_qoq")]
    pub net_income_qoq: Option<f64>,
}

impl FinancialPeriodRecord {
    /// Creates an empty record for a reporting date.
    #[must_use]
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Default::default()
        }
    }

    /// Parses the reporting date, if it is a well-formed `YYYY-MM-DD`.
    #[must_use]
    pub fn period_end(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }

    /// Year-month prefix of the date, used as a chart axis label.
    #[must_use]
    pub fn short_date(&self) -> &str {
        self.date.get(..7).unwrap_or(&self.date)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    }))
}

/// One daily OHLCV bar from the price basket feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Ticker symbol.
    pub symbol: Symbol,
    /// Trading date.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Highest price of the day.
    pub high: f64,
    /// Lowest price of the day.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
}

impl DailyBar {
    /// Returns true when the bar closed at or above its open.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }

    /// Volume in millions of shares.
    #[must_use]
    pub fn volume_millions(&self) -> f64 {
        self.volume / 1_000_000.0
    }
}

/// Repository metadata from the source-control API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository name.
    pub name: String,
    /// Whether the repository is a fork.
    #[serde(default)]
    pub fork: bool,
    /// Primary language detected by the host, if any.
    #[serde(default)]
    pub language: Option<String>,
    /// Star count.
    #[serde(default, rename = "stargazers_count")]
    pub stars: u64,
    /// Web URL of the repository.
    #[serde(default)]
    pub html_url: Option<String>,
}

impl Repository {
    /// Creates repository metadata with a name and language.
    #[must_use]
    pub fn new(name: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            name: name.into(),
            language: language.map(str::to_string),
            ..Default::default()
        }
    }

    /// Marks the repository as a fork.
    #[must_use]
    pub fn forked(mut self) -> Self {
        self.fork = true;
        self
    }
}

/// Visitor count for a single page title.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViews {
    /// Page title.
    pub title: String,
    /// Active users over the reporting window.
    pub users: u64,
}

/// Pre-aggregated page-view statistics for the site.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteStats {
    /// When the statistics were generated, `YYYY-MM-DD HH:MM`.
    pub last_updated: String,
    /// Most visited pages.
    #[serde(default)]
    pub top_pages: Vec<PageViews>,
}

impl SiteStats {
    /// Sum of active users over all listed pages.
    #[must_use]
    pub fn total_users(&self) -> u64 {
        self.top_pages.iter().map(|p| p.users).sum()
    }
}
