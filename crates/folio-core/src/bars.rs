//! DataFrame helpers for the daily price basket.
//!
//! Bars are held as a polars [`DataFrame`] with columns
//! `symbol, date, open, high, low, close, volume`, where `date` uses the
//! polars `Date` dtype.

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::HashSet;

use crate::{
    error::{DataError, Result},
    types::{DailyBar, Symbol},
};

/// Days between 0001-01-01 and the Unix epoch; polars dates count from the epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn polars_err(e: PolarsError) -> DataError {
    DataError::ParseFailed(e.to_string())
}

/// Builds the bars DataFrame from typed rows.
pub fn bars_frame(bars: &[DailyBar]) -> Result<DataFrame> {
    let symbols: Vec<&str> = bars.iter().map(|b| b.symbol.as_str()).collect();
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| b.date.num_days_from_ce() - EPOCH_DAYS_FROM_CE)
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let df = DataFrame::new(vec![
        Column::new("symbol".into(), symbols),
        Column::new("date".into(), dates),
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(polars_err)?;

    df.lazy()
        .with_column(col("date").cast(DataType::Date))
        .collect()
        .map_err(polars_err)
}

/// Returns the distinct symbols of a bars frame in first-seen order.
pub fn tickers(frame: &DataFrame) -> Result<Vec<Symbol>> {
    let symbols = frame
        .column("symbol")
        .and_then(|c| c.str())
        .map_err(polars_err)?;

    let mut seen = HashSet::new();
    Ok(symbols
        .into_iter()
        .flatten()
        .filter(|s| seen.insert(*s))
        .map(Symbol::new)
        .collect())
}

/// Filters a bars frame to one symbol, sorted oldest first.
pub fn ticker_series(frame: &DataFrame, symbol: &Symbol) -> Result<DataFrame> {
    frame
        .clone()
        .lazy()
        .filter(col("symbol").eq(lit(symbol.as_str())))
        .sort(["date"], Default::default())
        .collect()
        .map_err(polars_err)
}

/// Converts a bars frame back into typed rows.
///
/// Rows with a null symbol or date are skipped; null prices become `NaN`.
pub fn frame_to_bars(frame: &DataFrame) -> Result<Vec<DailyBar>> {
    let symbols = frame
        .column("symbol")
        .and_then(|c| c.str())
        .map_err(polars_err)?;
    let days = frame
        .column("date")
        .and_then(|c| c.cast(&DataType::Int32))
        .map_err(polars_err)?;
    let days = days.i32().map_err(polars_err)?;

    let price = |name: &str| -> Result<Vec<f64>> {
        Ok(frame
            .column(name)
            .and_then(|c| c.f64())
            .map_err(polars_err)?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    };
    let opens = price("open")?;
    let highs = price("high")?;
    let lows = price("low")?;
    let closes = price("close")?;
    let volumes = price("volume")?;

    let mut bars = Vec::with_capacity(frame.height());
    for (i, (symbol, day)) in symbols.into_iter().zip(days.into_iter()).enumerate() {
        let (Some(symbol), Some(day)) = (symbol, day) else {
            continue;
        };
        let Some(date) = NaiveDate::from_num_days_from_ce_opt(day + EPOCH_DAYS_FROM_CE) else {
            continue;
        };
        bars.push(DailyBar {
            symbol: Symbol::new(symbol),
            date,
            open: opens[i],
            high: highs[i],
            low: lows[i],
            close: closes[i],
            volume: volumes[i],
        });
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(symbol: &str, day: u32, open: f64, close: f64) -> DailyBar {
        DailyBar {
            symbol: Symbol::new(symbol),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 1_000_000.0,
        }
    }

    fn basket() -> Vec<DailyBar> {
        vec![
            bar("MSFT", 3, 370.0, 372.0),
            bar("AAPL", 3, 184.0, 183.0),
            bar("AAPL", 2, 185.0, 186.0),
            bar("MSFT", 2, 368.0, 370.0),
            bar("KO", 2, 59.0, 59.5),
        ]
    }

    #[test]
    fn test_frame_shape() {
        let df = bars_frame(&basket()).unwrap();
        assert_eq!(df.height(), 5);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn test_tickers_keep_first_seen_order() {
        let df = bars_frame(&basket()).unwrap();
        let tickers = tickers(&df).unwrap();
        assert_eq!(
            tickers,
            vec![Symbol::new("MSFT"), Symbol::new("AAPL"), Symbol::new("KO")]
        );
    }

    #[test]
    fn test_ticker_series_filters_and_sorts() {
        let df = bars_frame(&basket()).unwrap();
        let series = ticker_series(&df, &Symbol::new("AAPL")).unwrap();
        let bars = frame_to_bars(&series).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert!(bars[0].is_up());
        assert!(!bars[1].is_up());
    }

    #[test]
    fn test_unknown_ticker_yields_empty_series() {
        let df = bars_frame(&basket()).unwrap();
        let series = ticker_series(&df, &Symbol::new("TSLA")).unwrap();
        assert_eq!(series.height(), 0);
    }
}
