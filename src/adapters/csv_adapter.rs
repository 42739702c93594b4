//! CSV file price adapter.
//!
//! One file per instrument, `<price_dir>/<ticker>.csv`, with at least a
//! `date` and a `close` column. An empty close is a session without a
//! price.

use crate::domain::error::MomtraderError;
use crate::domain::price_series::{PricePoint, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

impl DataPort for CsvPriceAdapter {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, MomtraderError> {
        let path = self.csv_path(ticker);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MomtraderError::NoData {
                    ticker: ticker.to_string(),
                })
            }
            Err(e) => {
                return Err(MomtraderError::DataSource {
                    reason: format!("failed to read {}: {}", path.display(), e),
                })
            }
        };

        let source_err = |reason: String| MomtraderError::DataSource {
            reason: format!("{}: {}", path.display(), reason),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| source_err(format!("CSV parse error: {e}")))?
            .clone();
        let date_col =
            column(&headers, "date").ok_or_else(|| source_err("missing date column".into()))?;
        let close_col =
            column(&headers, "close").ok_or_else(|| source_err("missing close column".into()))?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| source_err(format!("CSV parse error: {e}")))?;

            let date_str = record.get(date_col).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .map_err(|e| source_err(format!("invalid date {date_str:?}: {e}")))?;
            if date < start_date || date > end_date {
                continue;
            }

            let close = match record.get(close_col).map(str::trim) {
                None | Some("") => None,
                Some(raw) => Some(
                    raw.parse::<f64>()
                        .map_err(|e| source_err(format!("invalid close {raw:?}: {e}")))?,
                ),
            };
            points.push(PricePoint { date, close });
        }

        log::debug!("{}: {} sessions from {}", ticker, points.len(), path.display());
        Ok(PriceSeries::new(points))
    }
}
