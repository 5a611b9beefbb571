//! Valuation band selection for chart overlays.
//!
//! Selection is a pure lookup: for the active `(window, model)` pair each
//! dated point yields a [`BandTuple`] whose values are `None` wherever the
//! document has no entry. A `None` renders as a gap in the line, never as 0.

use serde::Serialize;
use tracing::debug;

use folio_core::{
    Band, BandStats, TimeWindow, ValuationBandPoint, ValuationDocument, ValuationModel,
};

/// The five band lines of one date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BandTuple {
    /// Mean + 2σ.
    pub up2: Option<f64>,
    /// Mean + 1σ.
    pub up1: Option<f64>,
    /// Mean.
    pub mean: Option<f64>,
    /// Mean − 1σ.
    pub down1: Option<f64>,
    /// Mean − 2σ.
    pub down2: Option<f64>,
}

impl BandTuple {
    /// Builds the tuple from optional stats; `None` yields an all-gap tuple.
    #[must_use]
    pub fn from_stats(stats: Option<&BandStats>) -> Self {
        let get = |band| stats.and_then(|s| s.get(band));
        Self {
            up2: get(Band::Up2),
            up1: get(Band::Up1),
            mean: get(Band::Mean),
            down1: get(Band::Down1),
            down2: get(Band::Down2),
        }
    }

    /// Returns the value of one line.
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

    /// Returns true when no line has a value on this date.
    #[must_use]
    pub fn is_gap(&self) -> bool {
        Band::ALL.iter().all(|&b| self.get(b).is_none())
    }
}

/// Shaded region between two adjacent band lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaKind {
    /// Between +1σ and +2σ.
    Overheated,
    /// Between −1σ and +1σ.
    Core,
    /// Between −2σ and −1σ.
    Oversold,
}

/// One shaded range on one date.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BandArea {
    /// Which region this is.
    pub kind: AreaKind,
    /// Lower bound, if present.
    pub lower: Option<f64>,
    /// Upper bound, if present.
    pub upper: Option<f64>,
}

/// Selected overlay values for one date.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BandRow {
    /// Observation date.
    pub date: String,
    /// Observed market price.
    pub price: Option<f64>,
    /// Band lines for the active window and model.
    pub band: BandTuple,
}

impl BandRow {
    fn from_point(point: &ValuationBandPoint, window: TimeWindow, model: ValuationModel) -> Self {
        Self {
            date: point.date.clone(),
            price: point.price,
            band: BandTuple::from_stats(point.band(window, model)),
        }
    }

    /// The three shaded ranges, top to bottom.
    #[must_use]
    pub fn areas(&self) -> [BandArea; 3] {
        let b = &self.band;
        [
            BandArea {
                kind: AreaKind::Overheated,
                lower: b.up1,
                upper: b.up2,
            },
            BandArea {
                kind: AreaKind::Core,
                lower: b.down1,
                upper: b.up1,
            },
            BandArea {
                kind: AreaKind::Oversold,
                lower: b.down2,
                upper: b.down1,
            },
        ]
    }
}

/// Overlay rows for one `(window, model)` selection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BandSelection {
    /// Ticker of the source document.
    pub ticker: String,
    /// Active window.
    pub window: TimeWindow,
    /// Active model.
    pub model: ValuationModel,
    /// Rolling average multiple for the selection, if published.
    pub average: Option<f64>,
    /// One row per document point, in document order.
    pub rows: Vec<BandRow>,
}

impl BandSelection {
    /// Number of rows without any band value.
    #[must_use]
    pub fn gap_count(&self) -> usize {
        self.rows.iter().filter(|r| r.band.is_gap()).count()
    }

    /// Values of one line across all rows, `None` marking gaps.
    pub fn line(&self, band: Band) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(move |r| r.band.get(band))
    }
}

/// Selects the overlay rows of `doc` for `window` and `model`.
#[must_use]
pub fn select_bands(
    doc: &ValuationDocument,
    window: TimeWindow,
    model: ValuationModel,
) -> BandSelection {
    let rows: Vec<BandRow> = doc
        .data
        .iter()
        .map(|p| BandRow::from_point(p, window, model))
        .collect();

    let selection = BandSelection {
        ticker: doc.ticker.clone(),
        window,
        model,
        average: doc.average(model, window),
        rows,
    };
    debug!(
        ticker = %selection.ticker,
        %window,
        %model,
        rows = selection.rows.len(),
        gaps = selection.gap_count(),
        "Selected valuation bands"
    );
    selection
}
