#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use momtrader::domain::accountant::EquitySnapshot;
use momtrader::domain::book::PositionBook;
use momtrader::domain::cycle::{CyclePorts, EngineConfig, RunOptions};
use momtrader::domain::error::{MomtraderError, NotifyError};
use momtrader::domain::momentum::MomentumConfig;
use momtrader::domain::order::Order;
use momtrader::domain::order_engine::SizingConfig;
use momtrader::domain::position::Position;
use momtrader::domain::price_series::{PricePoint, PriceSeries};
use momtrader::ports::data_port::DataPort;
use momtrader::ports::notify_port::Notifier;
use momtrader::ports::report_port::ReportPort;
use momtrader::ports::store_port::{BookStore, EquityLog};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, ticker: &str, series: PriceSeries) -> Self {
        self.data.insert(ticker.to_string(), series);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, MomtraderError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(MomtraderError::DataSource {
                reason: reason.clone(),
            });
        }
        let series = self
            .data
            .get(ticker)
            .ok_or_else(|| MomtraderError::NoData {
                ticker: ticker.to_string(),
            })?;
        let points = series
            .points
            .iter()
            .filter(|p| p.date >= start_date && p.date <= end_date)
            .copied()
            .collect();
        Ok(PriceSeries::new(points))
    }
}

#[derive(Default)]
pub struct MemoryBookStore {
    pub book: RefCell<PositionBook>,
    pub saves: Cell<usize>,
    pub fail_save: bool,
}

impl MemoryBookStore {
    pub fn with_positions(positions: Vec<Position>) -> Self {
        Self {
            book: RefCell::new(PositionBook::from_positions(positions)),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_save: true,
            ..Default::default()
        }
    }
}

impl BookStore for MemoryBookStore {
    fn load(&self) -> Result<PositionBook, MomtraderError> {
        Ok(self.book.borrow().clone())
    }

    fn save(&self, book: &PositionBook) -> Result<(), MomtraderError> {
        if self.fail_save {
            return Err(MomtraderError::Storage {
                reason: "disk full".into(),
            });
        }
        self.saves.set(self.saves.get() + 1);
        *self.book.borrow_mut() = book.clone();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEquityLog {
    pub entries: RefCell<Vec<EquitySnapshot>>,
    pub fail: bool,
}

impl EquityLog for MemoryEquityLog {
    fn append(&self, snapshot: &EquitySnapshot) -> Result<(), MomtraderError> {
        if self.fail {
            return Err(MomtraderError::Storage {
                reason: "equity log locked".into(),
            });
        }
        self.entries.borrow_mut().push(snapshot.clone());
        Ok(())
    }

    fn history(&self) -> Result<Vec<EquitySnapshot>, MomtraderError> {
        Ok(self.entries.borrow().clone())
    }
}

#[derive(Default)]
pub struct MemoryReports {
    pub written: RefCell<Vec<(String, Vec<Order>)>>,
    pub discarded: RefCell<Vec<String>>,
}

impl ReportPort for MemoryReports {
    fn write_orders(&self, run_id: &str, orders: &[Order]) -> Result<String, MomtraderError> {
        let location = format!("memory://weekly_orders_{run_id}.csv");
        self.written
            .borrow_mut()
            .push((location.clone(), orders.to_vec()));
        Ok(location)
    }

    fn discard(&self, location: &str) -> Result<(), MomtraderError> {
        self.discarded.borrow_mut().push(location.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
    pub fail: bool,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        self.messages.borrow_mut().push(text.to_string());
        if self.fail {
            return Err(NotifyError::Rejected { status: 502 });
        }
        Ok(())
    }
}

/// All in-memory collaborators of one cycle.
pub struct Harness {
    pub data: MockDataPort,
    pub book: MemoryBookStore,
    pub equity: MemoryEquityLog,
    pub reports: MemoryReports,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new(data: MockDataPort) -> Self {
        Self {
            data,
            book: MemoryBookStore::default(),
            equity: MemoryEquityLog::default(),
            reports: MemoryReports::default(),
            notifier: RecordingNotifier::default(),
        }
    }

    pub fn ports(&self) -> CyclePorts<'_> {
        CyclePorts {
            data: &self.data,
            book_store: &self.book,
            equity_log: &self.equity,
            reports: &self.reports,
            notifier: &self.notifier,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifier.messages.borrow().clone()
    }
}

/// Friday 2024-06-07, 16:00.
pub fn run_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 7)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap()
}

pub fn options(dry_run: bool) -> RunOptions {
    RunOptions {
        now: run_time(),
        dry_run,
    }
}

/// Two slots of 5000 each, default pyramiding limits.
pub fn small_engine() -> EngineConfig {
    EngineConfig {
        sizing: SizingConfig {
            capital: 10_000.0,
            slots: 2,
            max_adds: 2,
            max_position_multiplier: 2.0,
        },
        momentum: MomentumConfig {
            top_n: 2,
            ..MomentumConfig::default()
        },
        ..EngineConfig::default()
    }
}

/// The `count` weekdays ending on `end` (or the weekday before it).
pub fn weekdays_ending(end: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut d = end;
    while dates.len() < count {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(d);
        }
        d -= Duration::days(1);
    }
    dates.reverse();
    dates
}

/// Weekday closes moving linearly from `first` to `last`.
pub fn ramp(end: NaiveDate, count: usize, first: f64, last: f64) -> PriceSeries {
    let dates = weekdays_ending(end, count);
    let n = dates.len();
    let points = dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let close = if i + 1 == n {
                last
            } else {
                first + (last - first) * i as f64 / (n - 1) as f64
            };
            PricePoint {
                date,
                close: Some(close),
            }
        })
        .collect();
    PriceSeries::new(points)
}

/// Index that rises steadily into the run date.
pub fn bull_index() -> PriceSeries {
    ramp(run_time().date(), 260, 18_000.0, 23_000.0)
}

/// Index sliding below its long average into the run date.
pub fn bear_index() -> PriceSeries {
    ramp(run_time().date(), 260, 23_000.0, 18_000.0)
}

/// Market with AAA.NS leading, BBB.NS second and CCC.NS falling.
pub fn market(index: PriceSeries) -> MockDataPort {
    let end = run_time().date();
    MockDataPort::new()
        .with_series("^NSEI", index)
        .with_series("AAA.NS", ramp(end, 120, 100.0, 250.0))
        .with_series("BBB.NS", ramp(end, 120, 90.0, 100.0))
        .with_series("CCC.NS", ramp(end, 120, 200.0, 150.0))
}

pub fn universe_tickers() -> Vec<String> {
    vec!["AAA.NS".into(), "BBB.NS".into(), "CCC.NS".into()]
}

pub fn position(ticker: &str, shares: i64, avg_cost: f64, adds: u32) -> Position {
    Position {
        ticker: ticker.to_string(),
        shares,
        avg_cost,
        adds,
    }
}
