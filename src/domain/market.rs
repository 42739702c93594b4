//! One consistent market snapshot per cycle.
//!
//! Every gate, ranking and sizing decision of a cycle reads from the same
//! snapshot; nothing re-fetches prices mid-cycle.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::error::MomtraderError;
use crate::domain::price_series::PriceSeries;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub index_symbol: String,
    pub index: PriceSeries,
    pub series: HashMap<String, PriceSeries>,
    /// Universe tickers the source had no data for.
    pub missing: Vec<String>,
}

impl MarketSnapshot {
    /// Latest close of every series whose final session has one.
    pub fn latest_prices(&self) -> HashMap<String, f64> {
        self.series
            .iter()
            .filter_map(|(ticker, s)| s.latest_close().map(|p| (ticker.clone(), p)))
            .collect()
    }
}

/// Fetches the index and every universe ticker over one date window.
///
/// A ticker the source does not know is recorded in `missing`; any other
/// fetch failure aborts, as does any failure fetching the index.
pub fn fetch_snapshot(
    data_port: &dyn DataPort,
    universe: &[String],
    index_symbol: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<MarketSnapshot, MomtraderError> {
    let index = data_port.fetch_closes(index_symbol, start_date, end_date)?;
    log::info!(
        "index {}: {} sessions to {}",
        index_symbol,
        index.len(),
        index
            .last_date()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into())
    );

    let mut series = HashMap::with_capacity(universe.len());
    let mut missing = Vec::new();

    for ticker in universe {
        match data_port.fetch_closes(ticker, start_date, end_date) {
            Ok(s) if s.is_empty() => {
                log::warn!("skipping {ticker} (no data found)");
                missing.push(ticker.clone());
            }
            Ok(s) => {
                series.insert(ticker.clone(), s);
            }
            Err(MomtraderError::NoData { .. }) => {
                log::warn!("skipping {ticker} (unknown to data source)");
                missing.push(ticker.clone());
            }
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "fetched {} of {} universe series",
        series.len(),
        universe.len()
    );

    Ok(MarketSnapshot {
        index_symbol: index_symbol.to_string(),
        index,
        series,
        missing,
    })
}
