//! One rebalancing cycle: fetch → gate → rank → decide → commit → notify.
//!
//! EngineConfig bundles every tunable of a run. A cycle either commits the
//! order report, the new book and the equity snapshot together, or leaves
//! storage as it found it.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashSet;

use crate::domain::accountant::{value_book, Valuation};
use crate::domain::book::PositionBook;
use crate::domain::crash::CrashMonitor;
use crate::domain::error::MomtraderError;
use crate::domain::market::{fetch_snapshot, MarketSnapshot};
use crate::domain::momentum::{rank, MomentumConfig, Ranking};
use crate::domain::order_engine::{plan_rebalance, RebalancePlan, SizingConfig};
use crate::domain::price_series::PriceSeries;
use crate::domain::regime::RegimeFilter;
use crate::domain::universe::Universe;
use crate::ports::data_port::DataPort;
use crate::ports::notify_port::Notifier;
use crate::ports::report_port::ReportPort;
use crate::ports::store_port::{BookStore, EquityLog};

pub const DEFAULT_INDEX_SYMBOL: &str = "^NSEI";
pub const DEFAULT_HISTORY_DAYS: i64 = 365;
/// Upper bound on `history_days`: one hundred years.
pub const MAX_HISTORY_DAYS: i64 = 36_500;
pub const RUN_ID_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sizing: SizingConfig,
    pub momentum: MomentumConfig,
    pub regime: RegimeFilter,
    pub crash: CrashMonitor,
    pub index_symbol: String,
    /// Calendar days of history fetched per cycle.
    pub history_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sizing: SizingConfig::default(),
            momentum: MomentumConfig::default(),
            regime: RegimeFilter::default(),
            crash: CrashMonitor::default(),
            index_symbol: DEFAULT_INDEX_SYMBOL.to_string(),
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

pub struct CyclePorts<'a> {
    pub data: &'a dyn DataPort,
    pub book_store: &'a dyn BookStore,
    pub equity_log: &'a dyn EquityLog,
    pub reports: &'a dyn ReportPort,
    pub notifier: &'a dyn Notifier,
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub now: NaiveDateTime,
    /// Decide and report, but write nothing.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateStatus {
    pub bullish: bool,
    pub crash: bool,
    pub index_return: Option<f64>,
}

impl GateStatus {
    pub fn passed(&self) -> bool {
        self.bullish && !self.crash
    }

    pub fn message(&self) -> &'static str {
        if self.crash {
            "CRASH ALERT: market drawdown beyond threshold. Stay in cash!"
        } else if !self.bullish {
            "Market not in bullish stage. Stay in cash!"
        } else {
            "Market filters passed."
        }
    }
}

pub fn evaluate_gates(config: &EngineConfig, index: &PriceSeries) -> GateStatus {
    GateStatus {
        bullish: config.regime.is_bullish(index),
        crash: config.crash.crash_detected(index),
        index_return: config.crash.trailing_return(index),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub run_id: String,
    pub ranking: Ranking,
    pub plan: RebalancePlan,
    pub valuation: Valuation,
    /// Selected tickers that were already held before this cycle.
    pub carried: Vec<String>,
    pub report_location: Option<String>,
    pub committed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A gate failed; nothing was read from or written to storage.
    StayedInCash(GateStatus),
    Rebalanced(Box<CycleReport>),
}

/// Runs one cycle. Every error is also sent to the notifier before it is
/// returned.
pub fn run_cycle(
    ports: &CyclePorts<'_>,
    config: &EngineConfig,
    universe: &Universe,
    options: RunOptions,
) -> Result<CycleOutcome, MomtraderError> {
    let result = execute(ports, config, universe, options);
    if let Err(e) = &result {
        log::error!("cycle aborted: {e}");
        let label = if e.is_engine_fault() {
            "Engine fault"
        } else {
            "Engine error"
        };
        notify(ports.notifier, &format!("{label}: {e}"));
    }
    result
}

/// First date of the fetch window ending on `end`.
pub fn history_start(end: NaiveDate, history_days: i64) -> Result<NaiveDate, MomtraderError> {
    Duration::try_days(history_days)
        .filter(|_| (1..=MAX_HISTORY_DAYS).contains(&history_days))
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| MomtraderError::ConfigInvalid {
            section: "data".into(),
            key: "history_days".into(),
            reason: format!("history_days must be between 1 and {MAX_HISTORY_DAYS}"),
        })
}

fn execute(
    ports: &CyclePorts<'_>,
    config: &EngineConfig,
    universe: &Universe,
    options: RunOptions,
) -> Result<CycleOutcome, MomtraderError> {
    let end_date = options.now.date();
    let start_date = history_start(end_date, config.history_days)?;

    let snapshot = fetch_snapshot(
        ports.data,
        &universe.tickers,
        &config.index_symbol,
        start_date,
        end_date,
    )?;

    let gate = evaluate_gates(config, &snapshot.index);
    log::info!(
        "regime [{}]: {}, crash monitor: {} (index return {})",
        config.regime,
        if gate.bullish { "bullish" } else { "not bullish" },
        if gate.crash { "CRASH" } else { "ok" },
        gate.index_return
            .map(|r| format!("{:.2}%", r * 100.0))
            .unwrap_or_else(|| "n/a".into())
    );
    if !gate.passed() {
        log::warn!("{}", gate.message());
        notify(ports.notifier, gate.message());
        return Ok(CycleOutcome::StayedInCash(gate));
    }

    let (previous, report) = decide(ports, config, universe, &snapshot, options)?;
    let report = if options.dry_run {
        log::info!("dry run: nothing committed");
        report
    } else {
        commit(ports, config, &previous, report, options)?
    };

    notify(ports.notifier, &summary(&report));
    Ok(CycleOutcome::Rebalanced(Box::new(report)))
}

fn decide(
    ports: &CyclePorts<'_>,
    config: &EngineConfig,
    universe: &Universe,
    snapshot: &MarketSnapshot,
    options: RunOptions,
) -> Result<(PositionBook, CycleReport), MomtraderError> {
    let ranking = rank(&universe.tickers, &snapshot.series, &config.momentum)?;
    for dropped in &ranking.dropped {
        log::debug!("ranking dropped {}: {:?}", dropped.ticker, dropped.reason);
    }
    log::info!(
        "week of {}: {} candidates, {} dropped",
        ranking.as_of_week,
        ranking.selected.len(),
        ranking.dropped.len()
    );

    let book = ports.book_store.load()?;
    let candidates = ranking.candidates();
    let prices = snapshot.latest_prices();
    let plan = plan_rebalance(&book, &candidates, &prices, &config.sizing)?;
    for skipped in &plan.skipped {
        log::warn!("skipped {}: {:?}", skipped.ticker, skipped.reason);
    }

    let valuation = value_book(&plan.book, &prices, config.sizing.capital);
    if !valuation.is_complete() {
        log::warn!(
            "no latest price for {}; excluded from market value",
            valuation.unpriced.join(", ")
        );
    }

    let carried = candidates
        .iter()
        .filter(|t| book.has_position(t))
        .cloned()
        .collect();

    let report = CycleReport {
        run_id: options.now.format(RUN_ID_FORMAT).to_string(),
        ranking,
        plan,
        valuation,
        carried,
        report_location: None,
        committed: false,
    };
    Ok((book, report))
}

/// Writes report, book and equity in that order, undoing earlier writes when
/// a later one fails.
fn commit(
    ports: &CyclePorts<'_>,
    config: &EngineConfig,
    previous: &PositionBook,
    mut report: CycleReport,
    options: RunOptions,
) -> Result<CycleReport, MomtraderError> {
    let location = if report.plan.orders.is_empty() {
        None
    } else {
        let location = ports
            .reports
            .write_orders(&report.run_id, &report.plan.orders)?;
        log::info!("orders saved to {location}");
        Some(location)
    };

    if let Err(e) = ports.book_store.save(&report.plan.book) {
        discard_report(ports, location.as_deref());
        return Err(e);
    }

    let snapshot = report.valuation.snapshot(options.now);
    if let Err(e) = ports.equity_log.append(&snapshot) {
        if let Err(restore) = ports.book_store.save(previous) {
            log::error!("failed to restore previous position book: {restore}");
        }
        discard_report(ports, location.as_deref());
        return Err(e);
    }

    log::info!(
        "committed {} orders, {} positions, equity {:.2} (capital {:.2})",
        report.plan.orders.len(),
        report.plan.book.position_count(),
        snapshot.total_equity,
        config.sizing.capital
    );
    report.report_location = location;
    report.committed = true;
    Ok(report)
}

fn discard_report(ports: &CyclePorts<'_>, location: Option<&str>) {
    if let Some(location) = location {
        if let Err(e) = ports.reports.discard(location) {
            log::error!("failed to discard order report {location}: {e}");
        }
    }
}

fn notify(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.notify(text) {
        log::warn!("notification failed: {e}");
    }
}

/// Human-readable cycle summary sent to the notifier.
pub fn summary(report: &CycleReport) -> String {
    let plan = &report.plan;
    let bought: HashSet<&str> = plan.bought().into_iter().collect();
    let incoming: Vec<&str> = report
        .ranking
        .selected
        .iter()
        .map(|s| s.ticker.as_str())
        .filter(|t| bought.contains(t))
        .collect();

    let mut text = String::from("MOMTRADER WEEKLY REPORT\n\n");
    text.push_str(&format!("IN: {}\n", list(&incoming)));
    text.push_str(&format!("OUT: {}\n", list(&plan.sold())));
    let carried: Vec<&str> = report.carried.iter().map(String::as_str).collect();
    text.push_str(&format!("HOLD: {}\n", list(&carried)));
    if !plan.added().is_empty() {
        text.push_str(&format!("ADDED: {}\n", list(&plan.added())));
    }
    text.push('\n');

    if plan.orders.is_empty() {
        text.push_str("No trades this week. Portfolio remains unchanged.\n");
    } else {
        text.push_str(&format!("Orders: {}\n", plan.orders.len()));
        if let Some(location) = &report.report_location {
            text.push_str(&format!("Orders saved: {location}\n"));
        }
    }
    if !report.committed {
        text.push_str("(dry run, nothing committed)\n");
    }

    let valuation = &report.valuation;
    text.push_str(&format!("Balance: {:.2}\n", valuation.cash));
    text.push_str(&format!("Portfolio value: {:.2}\n", valuation.market_value));
    text.push_str(&format!("Total equity: {:.2}", valuation.total_equity));
    if !valuation.unpriced.is_empty() {
        text.push_str(&format!("\nUnpriced: {}", valuation.unpriced.join(", ")));
    }
    text
}

fn list(tickers: &[&str]) -> String {
    if tickers.is_empty() {
        "-".to_string()
    } else {
        tickers.join(", ")
    }
}
