//! Valuation band document and its selection keys.
//!
//! The valuation feed delivers, per date, the observed market price and for
//! every `(window, model)` pair a mean multiple-implied price with ±1σ and
//! ±2σ bounds. Bands are precomputed upstream; this module only models the
//! document and exposes typed accessors in place of dynamic key paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// Rolling look-back window used to compute a band.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum TimeWindow {
    /// One year.
    #[serde(rename = "1Y")]
    OneYear,
    /// Two years.
    #[default]
    #[serde(rename = "2Y")]
    TwoYears,
    /// Three years.
    #[serde(rename = "3Y")]
    ThreeYears,
    /// Five years.
    #[serde(rename = "5Y")]
    FiveYears,
}

impl TimeWindow {
    /// All windows in display order.
    pub const ALL: [Self; 4] = [
        Self::OneYear,
        Self::TwoYears,
        Self::ThreeYears,
        Self::FiveYears,
    ];

    /// Key used by the valuation document.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneYear => "1Y",
            Self::TwoYears => "2Y",
            Self::ThreeYears => "3Y",
            Self::FiveYears => "5Y",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DataError::InvalidParameter(format!(
                    "Unknown time window: {s}. Supported: 1Y, 2Y, 3Y, 5Y"
                ))
            })
    }
}

/// Valuation multiple a band is derived from.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ValuationModel {
    /// Price to earnings.
    #[default]
    Pe,
    /// Price to free cash flow.
    Fcf,
    /// Price to sales.
    Ps,
}

impl ValuationModel {
    /// All models in display order.
    pub const ALL: [Self; 3] = [Self::Pe, Self::Fcf, Self::Ps];

    /// Key used by the valuation document.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pe => "pe",
            Self::Fcf => "fcf",
            Self::Ps => "ps",
        }
    }

    /// Human readable label, e.g. "P/E".
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pe => "P/E",
            Self::Fcf => "P/FCF",
            Self::Ps => "P/S",
        }
    }
}

impl fmt::Display for ValuationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValuationModel {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DataError::InvalidParameter(format!(
                    "Unknown valuation model: {s}. Supported: pe, fcf, ps"
                ))
            })
    }
}

/// One line of a band overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    /// Mean + 2σ.
    Up2,
    /// Mean + 1σ.
    Up1,
    /// Mean.
    Mean,
    /// Mean − 1σ.
    Down1,
    /// Mean − 2σ.
    Down2,
}

impl Band {
    /// All bands from the top of the chart to the bottom.
    pub const ALL: [Self; 5] = [Self::Up2, Self::Up1, Self::Mean, Self::Down1, Self::Down2];
}

/// Band statistics for one `(window, model)` pair on one date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BandStats {
    /// Mean implied price.
    pub mean: Option<f64>,
    /// Mean + 1σ.
    pub up1: Option<f64>,
    /// Mean + 2σ.
    pub up2: Option<f64>,
    /// Mean − 1σ.
    pub down1: Option<f64>,
    /// Mean − 2σ.
    pub down2: Option<f64>,
}

impl BandStats {
    /// Returns the value of one band line.
    #[must_use]
    pub const fn get(&self, band: Band) -> Option<f64> {
        match band {
            Band::Up2 => self.up2,
            Band::Up1 => self.up1,
            Band::Mean => self.mean,
            Band::Down1 => self.down1,
            Band::Down2 => self.down2,
        }
    }
}

/// One dated point of the valuation document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationBandPoint {
    /// Observation date, `YYYY-MM-DD`.
    pub date: String,
    /// Observed market price.
    #[serde(default)]
    pub price: Option<f64>,
    /// Band statistics keyed by window label, then model label.
    #[serde(default)]
    pub valuation: BTreeMap<String, BTreeMap<String, BandStats>>,
}

impl ValuationBandPoint {
    /// Looks up the band statistics for a window and model.
    ///
    /// Returns `None` when either key is absent; callers render that as a gap.
    #[must_use]
    pub fn band(&self, window: TimeWindow, model: ValuationModel) -> Option<&BandStats> {
        self.valuation.get(window.as_str())?.get(model.as_str())
    }

    /// Looks up a single band value.
    #[must_use]
    pub fn band_value(&self, window: TimeWindow, model: ValuationModel, band: Band) -> Option<f64> {
        self.band(window, model)?.get(band)
    }
}

/// Valuation band document for one ticker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationDocument {
    /// Ticker the document describes.
    #[serde(default)]
    pub ticker: String,
    /// Rolling average multiple keyed by model label, then window label.
    #[serde(default)]
    pub averages: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    /// When the upstream job last produced the document, as published.
    #[serde(default)]
    pub last_updated: Option<String>,
    /// Dated band points, oldest first.
    #[serde(default)]
    pub data: Vec<ValuationBandPoint>,
}

impl ValuationDocument {
    /// Returns the rolling average multiple for a model and window.
    ///
    /// The document nests averages as `model → window`, the reverse of the
    /// per-point `window → model` nesting.
    #[must_use]
    pub fn average(&self, model: ValuationModel, window: TimeWindow) -> Option<f64> {
        self.averages
            .get(model.as_str())?
            .get(window.as_str())
            .copied()
            .flatten()
    }

    /// Returns the number of dated points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the document has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
