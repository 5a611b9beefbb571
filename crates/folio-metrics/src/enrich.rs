//! Derived financial metrics.
//!
//! [`derive`] computes per-period ratios from a single
//! [`FinancialPeriodRecord`]. It is a pure function: no cross-record state,
//! no windowing, and the same input always yields the same output.
//!
//! Inputs follow the feed's "falsy means missing" convention: a field that is
//! absent, zero or `NaN` takes the documented default or sentinel, and a
//! missing field without a default propagates as `NaN`.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use folio_core::{DataError, FinancialPeriodRecord, Result};

/// Returns `value` unless it is missing, zero or `NaN`, in which case `fallback`.
fn or_else(value: Option<f64>, fallback: f64) -> f64 {
    match value {
        Some(v) if v != 0.0 && !v.is_nan() => v,
        _ => fallback,
    }
}

/// A missing raw field behaves as `NaN` in arithmetic.
fn raw(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

/// Ratios derived from one reporting period.
///
/// Percentages are expressed on a 0-100 scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    /// Gross profit / revenue × 100.
    pub gross_margin_pct: f64,
    /// Operating income / revenue × 100.
    pub op_margin_pct: f64,
    /// Net income / revenue × 100.
    pub net_margin_pct: f64,
    /// |repurchases| + |dividends|.
    pub shareholder_return: f64,
    /// |repurchases|.
    pub buybacks: f64,
    /// |dividends paid|.
    pub dividends: f64,
    /// Net income / equity × 100, with equity floored to a sentinel of 1.
    pub roe: f64,
    /// Debt + equity − cash.
    pub invested_capital: f64,
    /// Net income / invested capital × 100, or 0 when invested capital is not positive.
    pub roic: f64,
    /// Current assets / current liabilities, liabilities floored to 1.
    pub current_ratio: f64,
    /// Debt / equity.
    pub debt_to_equity: f64,
    /// Revenue / total assets.
    pub asset_turnover: f64,
    /// Total assets / equity.
    pub leverage: f64,
}

impl DerivedMetrics {
    /// Named values checked by [`try_derive`], in report order.
    fn checked_fields(&self) -> [(&'static str, f64); 11] {
        [
            ("grossMarginPct", self.gross_margin_pct),
            ("opMarginPct", self.op_margin_pct),
            ("netMarginPct", self.net_margin_pct),
            ("shareholderReturn", self.shareholder_return),
            ("roe", self.roe),
            ("investedCapital", self.invested_capital),
            ("roic", self.roic),
            ("currentRatio", self.current_ratio),
            ("debtToEquity", self.debt_to_equity),
            ("assetTurnover", self.asset_turnover),
            ("leverage", self.leverage),
        ]
    }

    /// Returns the first derived field that is `NaN` or infinite.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<&'static str> {
        self.checked_fields()
            .into_iter()
            .find(|(_, v)| !v.is_finite())
            .map(|(name, _)| name)
    }

    /// Returns true when every derived field is finite.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.first_non_finite().is_none()
    }
}

/// Computes the derived metrics of a record.
///
/// Never fails: malformed inputs surface as `NaN` or infinity in the output.
/// Use [`try_derive`] to reject them.
#[must_use]
pub fn derive(record: &FinancialPeriodRecord) -> DerivedMetrics {
    let revenue = raw(record.revenue);
    let net_income = raw(record.net_income);
    let total_assets = raw(record.total_assets);

    let buybacks = or_else(record.common_stock_repurchased, 0.0).abs();
    let dividends = or_else(record.common_dividends_paid, 0.0).abs();
    let equity = or_else(record.total_stockholders_equity, 1.0);
    let total_debt = or_else(record.total_debt, 0.0);
    let cash = or_else(record.cash_and_short_term_investments, 0.0);

    let invested_capital = total_debt + equity - cash;
    // Non-positive invested capital reports 0 rather than a signed ratio.
    // Kept as-is pending review of whether this is intended business logic.
    let roic = if invested_capital > 0.0 {
        net_income / invested_capital * 100.0
    } else {
        0.0
    };

    DerivedMetrics {
        gross_margin_pct: raw(record.gross_profit) / revenue * 100.0,
        op_margin_pct: raw(record.operating_income) / revenue * 100.0,
        net_margin_pct: net_income / revenue * 100.0,
        shareholder_return: buybacks + dividends,
        buybacks,
        dividends,
        roe: net_income / equity * 100.0,
        invested_capital,
        roic,
        current_ratio: raw(record.total_current_assets)
            / or_else(record.total_current_liabilities, 1.0),
        debt_to_equity: total_debt / equity,
        asset_turnover: revenue / total_assets,
        leverage: total_assets / equity,
    }
}

/// Raw inputs without a default that `field` is computed from.
fn required_inputs(
    record: &FinancialPeriodRecord,
    field: &str,
) -> Vec<(&'static str, Option<f64>)> {
    match field {
        "grossMarginPct" => vec![
            ("grossProfit", record.gross_profit),
            ("revenue", record.revenue),
        ],
        "opMarginPct" => vec![
            ("operatingIncome", record.operating_income),
            ("revenue", record.revenue),
        ],
        "netMarginPct" => vec![("netIncome", record.net_income), ("revenue", record.revenue)],
        "roe" | "roic" => vec![("netIncome", record.net_income)],
        "currentRatio" => vec![("totalCurrentAssets", record.total_current_assets)],
        "assetTurnover" => vec![
            ("revenue", record.revenue),
            ("totalAssets", record.total_assets),
        ],
        "leverage" => vec![("totalAssets", record.total_assets)],
        _ => Vec::new(),
    }
}

/// Classifies the first non-finite field of `metrics`.
///
/// A field whose inputs include an absent value is [`DataError::MissingInput`];
/// one computed from present inputs is [`DataError::IncompleteRecord`].
fn check(record: &FinancialPeriodRecord, metrics: &DerivedMetrics) -> Result<()> {
    let Some(field) = metrics.first_non_finite() else {
        return Ok(());
    };
    let absent = required_inputs(record, field)
        .into_iter()
        .find(|(_, value)| value.is_none())
        .map(|(name, _)| name);

    Err(match absent {
        Some(input) => DataError::MissingInput {
            date: record.date.clone(),
            field: input,
        },
        None => DataError::IncompleteRecord {
            date: record.date.clone(),
            field,
        },
    })
}

/// Computes the derived metrics, failing on the first non-finite field.
///
/// # Errors
///
/// Returns [`DataError::MissingInput`] naming the absent raw field when the
/// record simply lacks data, or [`DataError::IncompleteRecord`] naming the
/// derived field when present inputs produce `NaN` or infinity (for example
/// zero revenue).
pub fn try_derive(record: &FinancialPeriodRecord) -> Result<DerivedMetrics> {
    let metrics = derive(record);
    check(record, &metrics)?;
    Ok(metrics)
}

/// A raw record together with its derived metrics.
///
/// Serializes flat, in the same camelCase shape charts consume.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    /// The record as delivered by the feed.
    #[serde(flatten)]
    pub raw: FinancialPeriodRecord,
    /// Ratios computed from `raw`.
    #[serde(flatten)]
    pub derived: DerivedMetrics,
    /// Year-month axis label, `YYYY-MM`.
    pub short_date: String,
}

impl EnrichedRecord {
    /// Enriches a record without validation.
    #[must_use]
    pub fn new(raw: FinancialPeriodRecord) -> Self {
        let derived = derive(&raw);
        Self::from_parts(raw, derived)
    }

    fn from_parts(raw: FinancialPeriodRecord, derived: DerivedMetrics) -> Self {
        let short_date = raw.short_date().to_string();
        Self {
            raw,
            derived,
            short_date,
        }
    }

    /// Reporting date.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.raw.date
    }
}

/// How the builder treats records whose metrics are not all finite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EnrichPolicy {
    /// Fail the whole build on the first record whose present inputs yield
    /// a non-finite metric. Records that only lack inputs are kept, their
    /// affected metrics `NaN` so charts show a gap.
    #[default]
    Strict,
    /// Keep incomplete records, `NaN` and infinities included.
    Lenient,
    /// Drop incomplete records and log them.
    SkipIncomplete,
}

/// Builds an [`EnrichedSeries`] from raw feed records.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsBuilder {
    policy: EnrichPolicy,
}

impl MetricsBuilder {
    /// Create a builder with the default, strict policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with a specific policy.
    #[must_use]
    pub const fn with_policy(policy: EnrichPolicy) -> Self {
        Self { policy }
    }

    /// Returns the configured policy.
    #[must_use]
    pub const fn policy(&self) -> EnrichPolicy {
        self.policy
    }

    /// Enriches every record, preserving the newest-first input order.
    ///
    /// # Errors
    ///
    /// Under [`EnrichPolicy::Strict`], returns [`DataError::IncompleteRecord`]
    /// for the first record whose present inputs yield a non-finite metric.
    #[instrument(skip(self, records), fields(policy = ?self.policy, count = records.len()))]
    pub fn build(&self, records: Vec<FinancialPeriodRecord>) -> Result<EnrichedSeries> {
        if records.windows(2).any(|w| w[0].date < w[1].date) {
            warn!("Records are not newest-first; keeping delivered order");
        }

        let mut enriched = Vec::with_capacity(records.len());
        for record in records {
            let derived = derive(&record);
            if let Err(e) = check(&record, &derived) {
                match (self.policy, &e) {
                    (EnrichPolicy::Lenient, _) => {}
                    (EnrichPolicy::SkipIncomplete, _) => {
                        warn!(date = %record.date, error = %e, "Skipping incomplete record");
                        continue;
                    }
                    (EnrichPolicy::Strict, DataError::MissingInput { field, .. }) => {
                        debug!(date = %record.date, field, "Keeping record with absent input");
                    }
                    (EnrichPolicy::Strict, _) => return Err(e),
                }
            }
            enriched.push(EnrichedRecord::from_parts(record, derived));
        }

        debug!(enriched = enriched.len(), "Built enriched series");
        Ok(EnrichedSeries { records: enriched })
    }
}

/// Enriched records in feed order (newest first).
///
/// Tables read [`newest_first`](Self::newest_first); charts read
/// [`chronological`](Self::chronological). Both views borrow the same records.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EnrichedSeries {
    records: Vec<EnrichedRecord>,
}

impl EnrichedSeries {
    /// Wraps already-enriched records, newest first.
    #[must_use]
    pub const fn from_records(records: Vec<EnrichedRecord>) -> Self {
        Self { records }
    }

    /// The most recent period.
    #[must_use]
    pub fn latest(&self) -> Option<&EnrichedRecord> {
        self.records.first()
    }

    /// Records newest first, for tabular display.
    #[must_use]
    pub fn newest_first(&self) -> &[EnrichedRecord] {
        &self.records
    }

    /// Records oldest first, for charting.
    pub fn chronological(
        &self,
    ) -> impl DoubleEndedIterator<Item = &EnrichedRecord> + ExactSizeIterator {
        self.records.iter().rev()
    }

    /// Number of periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no periods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the series and returns the records, newest first.
    #[must_use]
    pub fn into_inner(self) -> Vec<EnrichedRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a EnrichedSeries {
    type Item = &'a EnrichedRecord;
    type IntoIter = std::slice::Iter<'a, EnrichedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn scenario() -> FinancialPeriodRecord {
        FinancialPeriodRecord {
            revenue: Some(100.0),
            gross_profit: Some(40.0),
            operating_income: Some(20.0),
            net_income: Some(10.0),
            total_stockholders_equity: Some(50.0),
            total_debt: Some(30.0),
            cash_and_short_term_investments: Some(5.0),
            total_current_assets: Some(80.0),
            total_current_liabilities: Some(40.0),
            total_assets: Some(200.0),
            ..FinancialPeriodRecord::new("2024-09-28")
        }
    }

    #[test]
    fn test_scenario_record() {
        let m = derive(&scenario());
        assert_close(m.gross_margin_pct, 40.0);
        assert_close(m.op_margin_pct, 20.0);
        assert_close(m.net_margin_pct, 10.0);
        assert_close(m.roe, 20.0);
        assert_close(m.invested_capital, 75.0);
        assert!((m.roic - 13.33).abs() < 0.01);
        assert_close(m.current_ratio, 2.0);
        assert_close(m.debt_to_equity, 0.6);
        assert_close(m.asset_turnover, 0.5);
        assert_close(m.leverage, 4.0);
        assert_close(m.shareholder_return, 0.0);
        assert!(m.is_complete());
    }

    #[test]
    fn test_gross_margin_recombines() {
        let cases = [(100.0, 40.0), (391_035.0, 180_683.0), (0.5, 0.49), (7.0, -2.0)];
        for (revenue, gross) in cases {
            let record = FinancialPeriodRecord {
                revenue: Some(revenue),
                gross_profit: Some(gross),
                ..scenario()
            };
            let m = derive(&record);
            let recombined = m.gross_margin_pct / 100.0 * revenue;
            assert!((recombined - gross).abs() < 1e-9 * revenue.max(1.0));
        }
    }

    #[test]
    fn test_roic_zero_for_non_positive_invested_capital() {
        for net_income in [-500.0, 0.0, 500.0] {
            // debt 10 + equity 20 - cash 30 = 0
            let record = FinancialPeriodRecord {
                net_income: Some(net_income),
                total_debt: Some(10.0),
                total_stockholders_equity: Some(20.0),
                cash_and_short_term_investments: Some(30.0),
                ..scenario()
            };
            let m = derive(&record);
            assert_close(m.invested_capital, 0.0);
            assert_eq!(m.roic, 0.0);

            let record = FinancialPeriodRecord {
                cash_and_short_term_investments: Some(1_000.0),
                ..record
            };
            assert_eq!(derive(&record).roic, 0.0);
        }
    }

    #[test]
    fn test_roe_equity_sentinel() {
        let record = FinancialPeriodRecord {
            net_income: Some(500.0),
            total_stockholders_equity: Some(0.0),
            ..scenario()
        };
        assert_close(derive(&record).roe, 50_000.0);

        let record = FinancialPeriodRecord {
            total_stockholders_equity: None,
            ..record
        };
        assert_close(derive(&record).roe, 50_000.0);
    }

    #[test]
    fn test_missing_current_liabilities_uses_sentinel() {
        let record = FinancialPeriodRecord {
            total_current_liabilities: None,
            ..scenario()
        };
        assert_close(derive(&record).current_ratio, 80.0);
    }

    #[test]
    fn test_shareholder_return_uses_magnitudes() {
        let record = FinancialPeriodRecord {
            common_stock_repurchased: Some(-90.0),
            common_dividends_paid: Some(-15.0),
            ..scenario()
        };
        let m = derive(&record);
        assert_close(m.buybacks, 90.0);
        assert_close(m.dividends, 15.0);
        assert_close(m.shareholder_return, 105.0);

        let record = FinancialPeriodRecord {
            common_dividends_paid: None,
            ..record
        };
        assert_close(derive(&record).shareholder_return, 90.0);
    }

    #[test]
    fn test_zero_revenue_propagates_non_finite() {
        let record = FinancialPeriodRecord {
            revenue: Some(0.0),
            ..scenario()
        };
        let m = derive(&record);
        assert!(m.gross_margin_pct.is_infinite());
        assert_eq!(m.first_non_finite(), Some("grossMarginPct"));

        let err = try_derive(&record).unwrap_err();
        assert!(matches!(
            err,
            DataError::IncompleteRecord { ref date, field: "grossMarginPct" }
                if date == "2024-09-28"
        ));
    }

    #[test]
    fn test_missing_revenue_is_nan() {
        let record = FinancialPeriodRecord {
            revenue: None,
            ..scenario()
        };
        let m = derive(&record);
        assert!(m.gross_margin_pct.is_nan());
        assert!(m.asset_turnover.is_nan());
    }

    #[test]
    fn test_absent_input_distinct_from_degenerate_input() {
        let absent = FinancialPeriodRecord {
            revenue: None,
            ..scenario()
        };
        assert!(matches!(
            try_derive(&absent).unwrap_err(),
            DataError::MissingInput { field: "revenue", .. }
        ));

        let zero = FinancialPeriodRecord {
            revenue: Some(0.0),
            ..scenario()
        };
        assert!(matches!(
            try_derive(&zero).unwrap_err(),
            DataError::IncompleteRecord { field: "grossMarginPct", .. }
        ));
    }

    #[test]
    fn test_null_net_income_keeps_record_under_strict() {
        let record: FinancialPeriodRecord = serde_json::from_value(serde_json::json!({
            "date": "2024-12-31",
            "revenue": 100.0,
            "grossProfit": 40.0,
            "operatingIncome": 20.0,
            "netIncome": null,
            "totalStockholdersEquity": 50.0,
            "totalCurrentAssets": 80.0,
            "totalCurrentLiabilities": 40.0,
            "totalAssets": 200.0
        }))
        .unwrap();

        assert!(matches!(
            try_derive(&record).unwrap_err(),
            DataError::MissingInput { field: "netIncome", .. }
        ));

        let series = MetricsBuilder::new().build(vec![record]).unwrap();
        let latest = series.latest().unwrap();
        assert!(latest.derived.roe.is_nan());
        assert_close(latest.derived.gross_margin_pct, 40.0);
    }

    #[test]
    fn test_derive_is_idempotent() {
        let record = scenario();
        assert_eq!(derive(&record), derive(&record));
        assert_eq!(EnrichedRecord::new(record.clone()), EnrichedRecord::new(record));
    }

    fn dated(date: &str, revenue: Option<f64>) -> FinancialPeriodRecord {
        FinancialPeriodRecord {
            revenue,
            ..FinancialPeriodRecord {
                date: date.to_string(),
                ..scenario()
            }
        }
    }

    #[test]
    fn test_builder_policies() {
        let records = vec![
            dated("2024-12-31", Some(120.0)),
            dated("2024-09-30", None),
            dated("2024-06-30", Some(100.0)),
        ];

        let strict = MetricsBuilder::new().build(records.clone()).unwrap();
        assert_eq!(strict.len(), 3);

        let mut degenerate = records.clone();
        degenerate[1].revenue = Some(0.0);
        let err = MetricsBuilder::new().build(degenerate).unwrap_err();
        assert!(matches!(
            err,
            DataError::IncompleteRecord { ref date, .. } if date == "2024-09-30"
        ));

        let lenient = MetricsBuilder::with_policy(EnrichPolicy::Lenient)
            .build(records.clone())
            .unwrap();
        assert_eq!(lenient.len(), 3);
        assert!(lenient.newest_first()[1].derived.gross_margin_pct.is_nan());

        let skipped = MetricsBuilder::with_policy(EnrichPolicy::SkipIncomplete)
            .build(records)
            .unwrap();
        let dates: Vec<_> = skipped.newest_first().iter().map(EnrichedRecord::date).collect();
        assert_eq!(dates, vec!["2024-12-31", "2024-06-30"]);
    }

    #[test]
    fn test_series_views_share_records() {
        let series = MetricsBuilder::new()
            .build(vec![
                dated("2024-12-31", Some(120.0)),
                dated("2024-09-30", Some(110.0)),
                dated("2024-06-30", Some(100.0)),
            ])
            .unwrap();

        assert_eq!(series.latest().map(EnrichedRecord::date), Some("2024-12-31"));

        let chart: Vec<_> = series.chronological().collect();
        assert_eq!(chart.len(), 3);
        assert_eq!(chart[0].date(), "2024-06-30");
        assert_eq!(chart[0].short_date, "2024-06");
        assert!(std::ptr::eq(chart[2], &series.newest_first()[0]));
    }

    #[test]
    fn test_enriched_record_serializes_flat() {
        let json = serde_json::to_value(EnrichedRecord::new(scenario())).unwrap();
        assert_eq!(json["date"], "2024-09-28");
        assert_eq!(json["revenue"], 100.0);
        assert_eq!(json["grossMarginPct"], 40.0);
        assert_eq!(json["investedCapital"], 75.0);
        assert_eq!(json["shortDate"], "2024-09");
    }
}
