//! CSV file storage: position book, equity history and order reports.
//!
//! File layouts:
//! - positions: `Ticker,Shares,Avg_Cost,Adds`, rewritten atomically
//! - equity history: `Date,Equity`, append-only
//! - order report: `Sector,Ticker,Action,Quantity,Price,Allocation_Value`
//!   in `<output_dir>/weekly_orders_<run_id>.csv`

use crate::domain::accountant::EquitySnapshot;
use crate::domain::book::PositionBook;
use crate::domain::error::MomtraderError;
use crate::domain::order::Order;
use crate::domain::position::Position;
use crate::domain::universe::{normalize_ticker, Universe};
use crate::ports::report_port::ReportPort;
use crate::ports::store_port::{BookStore, EquityLog};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const POSITION_HEADERS: [&str; 4] = ["Ticker", "Shares", "Avg_Cost", "Adds"];
const ORDER_HEADERS: [&str; 6] = [
    "Sector",
    "Ticker",
    "Action",
    "Quantity",
    "Price",
    "Allocation_Value",
];
pub const UNKNOWN_SECTOR: &str = "Unknown";

fn storage_err(path: &Path, e: impl std::fmt::Display) -> MomtraderError {
    MomtraderError::Storage {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

/// Reads a whole CSV file, or `None` when it does not exist.
fn read_existing(path: &Path) -> Result<Option<String>, MomtraderError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(storage_err(path, e)),
    }
}

fn parse_shares(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

pub struct CsvBookStore {
    path: PathBuf,
}

impl CsvBookStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl BookStore for CsvBookStore {
    fn load(&self) -> Result<PositionBook, MomtraderError> {
        let Some(content) = read_existing(&self.path)? else {
            return Ok(PositionBook::new());
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| storage_err(&self.path, e))?
            .clone();
        let col = |name: &str| {
            column(&headers, name)
                .ok_or_else(|| storage_err(&self.path, format!("missing {name} column")))
        };
        let ticker_col = col("Ticker")?;
        let shares_col = col("Shares")?;
        let cost_col = col("Avg_Cost")?;
        // Books written before pyramiding have no Adds column
        let adds_col = column(&headers, "Adds");

        let mut positions = Vec::new();
        let mut seen = HashSet::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| storage_err(&self.path, e))?;
            let field = |i: usize| record.get(i).unwrap_or_default().trim();
            let bad = |what: &str, raw: &str| {
                storage_err(
                    &self.path,
                    format!("row {}: invalid {what} {raw:?}", line + 2),
                )
            };

            let ticker = field(ticker_col);
            if ticker.is_empty() {
                continue;
            }
            if !seen.insert(ticker.to_string()) {
                return Err(MomtraderError::MalformedBook {
                    ticker: ticker.to_string(),
                    reason: format!("duplicate row {} in {}", line + 2, self.path.display()),
                });
            }
            let shares = parse_shares(field(shares_col))
                .ok_or_else(|| bad("Shares", field(shares_col)))?;
            let avg_cost = field(cost_col)
                .parse::<f64>()
                .map_err(|_| bad("Avg_Cost", field(cost_col)))?;
            let adds = match adds_col.map(field) {
                None | Some("") => 0,
                Some(raw) => parse_shares(raw)
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| bad("Adds", raw))?,
            };

            positions.push(Position {
                ticker: ticker.to_string(),
                shares,
                avg_cost,
                adds,
            });
        }

        Ok(PositionBook::from_positions(positions))
    }

    fn save(&self, book: &PositionBook) -> Result<(), MomtraderError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| storage_err(parent, e))?;
        }

        let tmp = self.path.with_extension("csv.tmp");
        let mut wtr = csv::Writer::from_path(&tmp).map_err(|e| storage_err(&tmp, e))?;
        wtr.write_record(POSITION_HEADERS)
            .map_err(|e| storage_err(&tmp, e))?;
        for p in book.sorted_positions() {
            wtr.write_record([
                p.ticker.clone(),
                p.shares.to_string(),
                p.avg_cost.to_string(),
                p.adds.to_string(),
            ])
            .map_err(|e| storage_err(&tmp, e))?;
        }
        wtr.flush().map_err(|e| storage_err(&tmp, e))?;
        drop(wtr);

        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            storage_err(&self.path, e)
        })
    }
}

pub struct CsvEquityLog {
    path: PathBuf,
}

impl CsvEquityLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl EquityLog for CsvEquityLog {
    fn append(&self, snapshot: &EquitySnapshot) -> Result<(), MomtraderError> {
        let path = &self.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| storage_err(parent, e))?;
        }

        let needs_header = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| storage_err(path, e))?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            wtr.write_record(["Date", "Equity"])
                .map_err(|e| storage_err(path, e))?;
        }
        wtr.write_record([
            snapshot.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", snapshot.total_equity),
        ])
        .map_err(|e| storage_err(path, e))?;
        wtr.flush().map_err(|e| storage_err(path, e))
    }

    fn history(&self) -> Result<Vec<EquitySnapshot>, MomtraderError> {
        let Some(content) = read_existing(&self.path)? else {
            return Ok(Vec::new());
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut history = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| storage_err(&self.path, e))?;
            let ts = record.get(0).unwrap_or_default().trim();
            let timestamp = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
                .map_err(|e| storage_err(&self.path, format!("invalid Date {ts:?}: {e}")))?;
            let raw = record.get(1).unwrap_or_default().trim();
            let total_equity = raw
                .parse::<f64>()
                .map_err(|e| storage_err(&self.path, format!("invalid Equity {raw:?}: {e}")))?;
            history.push(EquitySnapshot {
                timestamp,
                total_equity,
            });
        }
        Ok(history)
    }
}

pub struct CsvOrderReport {
    output_dir: PathBuf,
    sectors: HashMap<String, String>,
}

impl CsvOrderReport {
    pub fn new(output_dir: PathBuf, sectors: HashMap<String, String>) -> Self {
        Self {
            output_dir,
            sectors,
        }
    }

    pub fn sector_of(&self, ticker: &str) -> &str {
        self.sectors
            .get(ticker)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SECTOR)
    }

    /// First free `weekly_orders_<run_id>[_n].csv` path.
    fn artifact_path(&self, run_id: &str) -> PathBuf {
        let mut path = self.output_dir.join(format!("weekly_orders_{run_id}.csv"));
        let mut n = 1;
        while path.exists() {
            path = self
                .output_dir
                .join(format!("weekly_orders_{run_id}_{n}.csv"));
            n += 1;
        }
        path
    }
}

impl ReportPort for CsvOrderReport {
    fn write_orders(&self, run_id: &str, orders: &[Order]) -> Result<String, MomtraderError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| storage_err(&self.output_dir, e))?;
        let path = self.artifact_path(run_id);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| storage_err(&path, e))?;
        let mut wtr = csv::Writer::from_writer(file);
        wtr.write_record(ORDER_HEADERS)
            .map_err(|e| storage_err(&path, e))?;
        for order in orders {
            wtr.write_record([
                self.sector_of(&order.ticker).to_string(),
                order.ticker.clone(),
                order.action.to_string(),
                order.quantity.to_string(),
                order.price.map(|p| format!("{p:.2}")).unwrap_or_default(),
                order.notional.map(|v| format!("{v:.2}")).unwrap_or_default(),
            ])
            .map_err(|e| storage_err(&path, e))?;
        }
        wtr.flush().map_err(|e| storage_err(&path, e))?;

        Ok(path.display().to_string())
    }

    fn discard(&self, location: &str) -> Result<(), MomtraderError> {
        match fs::remove_file(location) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err(Path::new(location), e)),
        }
    }
}

/// Universe from the first column of a CSV file with a header row.
pub fn load_universe(path: &Path, suffix: Option<&str>) -> Result<Universe, MomtraderError> {
    let content = fs::read_to_string(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut raw = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| MomtraderError::ConfigInvalid {
            section: "data".into(),
            key: "universe_file".into(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        if let Some(first) = record.get(0) {
            raw.push(first.to_string());
        }
    }

    Ok(Universe::from_raw(raw, suffix)?)
}

/// `Symbol,Sector` mapping keyed by normalized ticker. A missing file or a
/// file without both columns yields an empty map.
pub fn load_sector_map(
    path: &Path,
    suffix: Option<&str>,
) -> Result<HashMap<String, String>, MomtraderError> {
    let Some(content) = read_existing(path)? else {
        log::warn!("sector file {} not found; sectors default to {UNKNOWN_SECTOR}", path.display());
        return Ok(HashMap::new());
    };

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr.headers().map_err(|e| storage_err(path, e))?.clone();
    let (Some(symbol_col), Some(sector_col)) =
        (column(&headers, "Symbol"), column(&headers, "Sector"))
    else {
        log::warn!("sector file {} lacks Symbol/Sector columns", path.display());
        return Ok(HashMap::new());
    };

    let mut sectors = HashMap::new();
    for result in rdr.records() {
        let record = result.map_err(|e| storage_err(path, e))?;
        let symbol = record.get(symbol_col).unwrap_or_default().trim();
        let sector = record.get(sector_col).unwrap_or_default().trim();
        if !symbol.is_empty() && !sector.is_empty() {
            sectors.insert(normalize_ticker(symbol, suffix), sector.to_string());
        }
    }
    Ok(sectors)
}
