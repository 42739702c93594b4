//! CLI definition and dispatch.

use chrono::Local;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::csv_store::{
    load_sector_map, load_universe, CsvBookStore, CsvEquityLog, CsvOrderReport,
};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::log_notifier::LogNotifier;
use crate::domain::accountant::value_book;
use crate::domain::config_validation::{parse_key, validate_engine_config};
use crate::domain::crash::CrashMonitor;
use crate::domain::cycle::{
    evaluate_gates, history_start, run_cycle, CycleOutcome, CyclePorts, CycleReport, EngineConfig,
    RunOptions, DEFAULT_HISTORY_DAYS, DEFAULT_INDEX_SYMBOL,
};
use crate::domain::error::MomtraderError;
use crate::domain::market::fetch_snapshot;
use crate::domain::momentum::{rank, MomentumConfig};
use crate::domain::order_engine::SizingConfig;
use crate::domain::price_series::parse_weekday;
use crate::domain::regime::{RegimeFilter, DEFAULT_EMA_FAST, DEFAULT_EMA_SLOW, DEFAULT_SMA_PERIOD};
use crate::domain::universe::{parse_tickers, Universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::notify_port::Notifier;
use crate::ports::store_port::{BookStore, EquityLog};

pub const DEFAULT_POSITIONS_FILE: &str = "positions.csv";
pub const DEFAULT_EQUITY_FILE: &str = "equity_history.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "orders";

#[derive(Parser, Debug)]
#[command(name = "momtrader", about = "Weekly momentum portfolio engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one rebalancing cycle
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Compute and print orders without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the current momentum ranking
    Rank {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the stored position book
    Positions {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match &cli.command {
        Command::Run { config, dry_run } => run_engine(config, *dry_run),
        Command::Rank { config } => run_rank(config),
        Command::Positions { config } => run_positions(config),
        Command::Validate { config } => run_validate(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Loads and validates a config file.
pub fn load_config(path: &Path) -> Result<FileConfigAdapter, MomtraderError> {
    log::info!("loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_engine_config(&adapter)?;
    Ok(adapter)
}

fn lower(config: &dyn ConfigPort, section: &str, key: &str, default: &str) -> String {
    config
        .get_string(section, key)
        .unwrap_or_else(|| default.to_string())
        .to_lowercase()
}

fn get_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, MomtraderError> {
    Ok(parse_key::<usize>(config, section, key)?.unwrap_or(default))
}

pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, MomtraderError> {
    let defaults = EngineConfig::default();

    let sizing = SizingConfig {
        capital: parse_key(config, "engine", "capital")?.unwrap_or(defaults.sizing.capital),
        slots: get_usize(config, "engine", "top_n", defaults.sizing.slots)?,
        max_adds: parse_key(config, "engine", "max_adds")?.unwrap_or(defaults.sizing.max_adds),
        max_position_multiplier: parse_key(config, "engine", "max_position_multiplier")?
            .unwrap_or(defaults.sizing.max_position_multiplier),
    };

    let week_anchor = match config.get_string("engine", "week_anchor") {
        None => defaults.momentum.week_anchor,
        Some(raw) => parse_weekday(&raw).ok_or_else(|| MomtraderError::ConfigInvalid {
            section: "engine".into(),
            key: "week_anchor".into(),
            reason: format!("unknown weekday {raw:?}"),
        })?,
    };
    let momentum = MomentumConfig {
        lookback_weeks: get_usize(
            config,
            "engine",
            "momentum_weeks",
            defaults.momentum.lookback_weeks,
        )?,
        top_n: sizing.slots,
        week_anchor,
    };

    let regime = match lower(config, "regime", "strategy", "sma").as_str() {
        "sma" => RegimeFilter::PriceAboveSma {
            period: get_usize(config, "regime", "sma_period", DEFAULT_SMA_PERIOD)?,
        },
        "ema_cross" => RegimeFilter::EmaCross {
            fast: get_usize(config, "regime", "ema_fast", DEFAULT_EMA_FAST)?,
            slow: get_usize(config, "regime", "ema_slow", DEFAULT_EMA_SLOW)?,
        },
        other => {
            return Err(MomtraderError::ConfigInvalid {
                section: "regime".into(),
                key: "strategy".into(),
                reason: format!("unknown strategy {other:?}"),
            })
        }
    };

    let crash = CrashMonitor {
        lookback: get_usize(config, "crash", "lookback", defaults.crash.lookback)?,
        threshold: parse_key(config, "crash", "threshold")?.unwrap_or(defaults.crash.threshold),
    };

    Ok(EngineConfig {
        sizing,
        momentum,
        regime,
        crash,
        index_symbol: config
            .get_string("data", "index_symbol")
            .unwrap_or_else(|| DEFAULT_INDEX_SYMBOL.to_string()),
        history_days: parse_key(config, "data", "history_days")?.unwrap_or(DEFAULT_HISTORY_DAYS),
    })
}

/// Universe from `[data] tickers` when set, otherwise from `universe_file`.
pub fn build_universe(config: &dyn ConfigPort) -> Result<Universe, MomtraderError> {
    let suffix = config.get_string("data", "ticker_suffix");
    let suffix = suffix.as_deref();

    if let Some(list) = config.get_string("data", "tickers") {
        let tickers = parse_tickers(&list, suffix)?;
        return Ok(Universe::from_raw(tickers, None)?);
    }

    let path = config
        .get_string("data", "universe_file")
        .ok_or_else(|| MomtraderError::ConfigMissing {
            section: "data".into(),
            key: "universe_file".into(),
        })?;
    load_universe(Path::new(&path), suffix)
}

pub fn build_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, MomtraderError> {
    match lower(config, "data", "source", "csv").as_str() {
        "csv" => {
            let dir = config
                .get_string("data", "price_dir")
                .ok_or_else(|| MomtraderError::ConfigMissing {
                    section: "data".into(),
                    key: "price_dir".into(),
                })?;
            Ok(Box::new(CsvPriceAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "yahoo")]
        "yahoo" => Ok(Box::new(crate::adapters::yahoo_adapter::YahooAdapter::new()?)),
        other => Err(MomtraderError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unsupported source {other:?}"),
        }),
    }
}

type Stores = (Box<dyn BookStore>, Box<dyn EquityLog>);

pub fn build_stores(config: &dyn ConfigPort) -> Result<Stores, MomtraderError> {
    match lower(config, "storage", "backend", "csv").as_str() {
        "csv" => {
            let positions = config
                .get_string("storage", "positions_file")
                .unwrap_or_else(|| DEFAULT_POSITIONS_FILE.to_string());
            let equity = config
                .get_string("storage", "equity_file")
                .unwrap_or_else(|| DEFAULT_EQUITY_FILE.to_string());
            Ok((
                Box::new(CsvBookStore::new(PathBuf::from(positions))),
                Box::new(CsvEquityLog::new(PathBuf::from(equity))),
            ))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_adapter::SqliteStore;
            Ok((
                Box::new(SqliteStore::from_config(config)?),
                Box::new(SqliteStore::from_config(config)?),
            ))
        }
        other => Err(MomtraderError::ConfigInvalid {
            section: "storage".into(),
            key: "backend".into(),
            reason: format!("unsupported backend {other:?}"),
        }),
    }
}

pub fn build_order_report(config: &dyn ConfigPort) -> Result<CsvOrderReport, MomtraderError> {
    let output_dir = config
        .get_string("storage", "output_dir")
        .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());
    let sectors = match config.get_string("data", "sector_file") {
        Some(path) => {
            let suffix = config.get_string("data", "ticker_suffix");
            load_sector_map(Path::new(&path), suffix.as_deref())?
        }
        None => Default::default(),
    };
    Ok(CsvOrderReport::new(PathBuf::from(output_dir), sectors))
}

/// Telegram when credentials are configured, the log otherwise.
pub fn build_notifier(config: &dyn ConfigPort) -> Box<dyn Notifier> {
    #[cfg(feature = "telegram")]
    {
        use crate::adapters::telegram_adapter::TelegramNotifier;
        match TelegramNotifier::from_config(config) {
            Ok(n) if n.is_configured() => return Box::new(n),
            Ok(_) => {}
            Err(e) => log::warn!("telegram notifier unavailable: {e}"),
        }
    }
    #[cfg(not(feature = "telegram"))]
    let _ = config;
    Box::new(LogNotifier)
}

fn run_engine(config_path: &Path, dry_run: bool) -> Result<(), MomtraderError> {
    let adapter = load_config(config_path)?;
    let engine = build_engine_config(&adapter)?;
    let universe = build_universe(&adapter)?;
    log::info!("universe: {} tickers", universe.count());

    let data = build_data_port(&adapter)?;
    let (book_store, equity_log) = build_stores(&adapter)?;
    let reports = build_order_report(&adapter)?;
    let notifier = build_notifier(&adapter);

    let ports = CyclePorts {
        data: data.as_ref(),
        book_store: book_store.as_ref(),
        equity_log: equity_log.as_ref(),
        reports: &reports,
        notifier: notifier.as_ref(),
    };
    let options = RunOptions {
        now: Local::now().naive_local(),
        dry_run,
    };

    match run_cycle(&ports, &engine, &universe, options)? {
        CycleOutcome::StayedInCash(gate) => println!("{}", gate.message()),
        CycleOutcome::Rebalanced(report) => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("Week of {}", report.ranking.as_of_week);
    if report.plan.orders.is_empty() {
        println!("No trades this week.");
    } else {
        println!(
            "{:<16} {:<9} {:>8} {:>10} {:>12}",
            "Ticker", "Action", "Qty", "Price", "Value"
        );
        for order in &report.plan.orders {
            println!(
                "{:<16} {:<9} {:>8} {:>10} {:>12}",
                order.ticker,
                order.action.to_string(),
                order.quantity,
                order.price.map(|p| format!("{p:.2}")).unwrap_or_default(),
                order.notional.map(|v| format!("{v:.2}")).unwrap_or_default(),
            );
        }
    }
    for skipped in &report.plan.skipped {
        println!("skipped {}: {:?}", skipped.ticker, skipped.reason);
    }

    let v = &report.valuation;
    println!();
    println!("Cash:          {:.2}", v.cash);
    println!("Market value:  {:.2}", v.market_value);
    println!("Total equity:  {:.2}", v.total_equity);
    if !v.unpriced.is_empty() {
        println!("Unpriced:      {}", v.unpriced.join(", "));
    }
    match (&report.report_location, report.committed) {
        (Some(location), _) => println!("Orders saved to {location}"),
        (None, false) => println!("Dry run: nothing written"),
        (None, true) => {}
    }
}

fn run_rank(config_path: &Path) -> Result<(), MomtraderError> {
    let adapter = load_config(config_path)?;
    let engine = build_engine_config(&adapter)?;
    let universe = build_universe(&adapter)?;
    let data = build_data_port(&adapter)?;

    let end = Local::now().date_naive();
    let start = history_start(end, engine.history_days)?;
    let snapshot = fetch_snapshot(
        data.as_ref(),
        &universe.tickers,
        &engine.index_symbol,
        start,
        end,
    )?;

    let gate = evaluate_gates(&engine, &snapshot.index);
    println!(
        "Regime {}: {}   Crash monitor: {}",
        engine.regime,
        if gate.bullish { "bullish" } else { "not bullish" },
        if gate.crash { "CRASH" } else { "ok" }
    );

    let ranking = rank(&universe.tickers, &snapshot.series, &engine.momentum)?;
    println!("Week of {}", ranking.as_of_week);
    println!("{:>4} {:<16} {:>10}", "Rank", "Ticker", "Return");
    for (i, score) in ranking.selected.iter().enumerate() {
        println!(
            "{:>4} {:<16} {:>9.2}%",
            i + 1,
            score.ticker,
            score.weekly_return * 100.0
        );
    }
    if !ranking.dropped.is_empty() {
        println!("{} tickers without enough weekly history", ranking.dropped.len());
    }
    Ok(())
}

fn run_positions(config_path: &Path) -> Result<(), MomtraderError> {
    let adapter = load_config(config_path)?;
    let engine = build_engine_config(&adapter)?;
    let (book_store, equity_log) = build_stores(&adapter)?;

    let book = book_store.load()?;
    if book.is_empty() {
        println!("No open positions.");
    } else {
        println!(
            "{:<16} {:>8} {:>10} {:>12} {:>5}",
            "Ticker", "Shares", "Avg cost", "Cost", "Adds"
        );
        for p in book.sorted_positions() {
            println!(
                "{:<16} {:>8} {:>10.2} {:>12.2} {:>5}",
                p.ticker,
                p.shares,
                p.avg_cost,
                p.cost_basis(),
                p.adds
            );
        }
    }

    // Valued at cost: no prices are fetched here
    let at_cost: HashMap<String, f64> = book
        .sorted_positions()
        .into_iter()
        .map(|p| (p.ticker.clone(), p.avg_cost))
        .collect();
    let valuation = value_book(&book, &at_cost, engine.sizing.capital);
    println!();
    println!("Invested:      {:.2}", valuation.invested_cost);
    println!("Cash:          {:.2}", valuation.cash);

    if let Some(last) = equity_log.history()?.last() {
        println!("Last equity:   {:.2} ({})", last.total_equity, last.timestamp);
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), MomtraderError> {
    let adapter = load_config(config_path)?;
    let engine = build_engine_config(&adapter)?;
    let universe = build_universe(&adapter)?;

    println!("Configuration is valid.");
    println!("  capital:      {:.2}", engine.sizing.capital);
    println!(
        "  slots:        {} (max adds {}, cap x{})",
        engine.sizing.slots, engine.sizing.max_adds, engine.sizing.max_position_multiplier
    );
    println!("  momentum:     {} weeks", engine.momentum.lookback_weeks);
    println!("  regime:       {}", engine.regime);
    println!(
        "  crash:        {} sessions at {:.1}%",
        engine.crash.lookback,
        engine.crash.threshold * 100.0
    );
    println!("  index:        {}", engine.index_symbol);
    println!("  universe:     {} tickers", universe.count());
    Ok(())
}
