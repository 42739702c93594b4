//! CLI integration tests.
//!
//! Tests cover:
//! - Config parsing (build_engine_config, build_universe)
//! - Full `run` cycles against CSV prices and CSV storage on disk
//! - Dry-run, validate and positions commands
//! - Exit codes for config errors

mod common;

use chrono::{Local, NaiveDate};
use common::weekdays_ending;
use momtrader::adapters::file_config_adapter::FileConfigAdapter;
use momtrader::cli::{self, Cli, Command};
use momtrader::domain::error::MomtraderError;
use momtrader::domain::regime::RegimeFilter;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

fn exit_code_of(code: ExitCode) -> String {
    format!("{code:?}")
}

fn write_prices(dir: &Path, ticker: &str, end: NaiveDate, first: f64, last: f64) {
    let dates = weekdays_ending(end, 250);
    let n = dates.len();
    let mut content = String::from("date,close\n");
    for (i, date) in dates.iter().enumerate() {
        let close = if i + 1 == n {
            last
        } else {
            first + (last - first) * i as f64 / (n - 1) as f64
        };
        content.push_str(&format!("{date},{close}\n"));
    }
    fs::write(dir.join(format!("{ticker}.csv")), content).unwrap();
}

/// A workspace with prices up to today and a config pointing at it.
struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let prices = root.join("prices");
        fs::create_dir_all(&prices).unwrap();

        let today = Local::now().date_naive();
        write_prices(&prices, "^NSEI", today, 18_000.0, 23_000.0);
        write_prices(&prices, "AAA.NS", today, 100.0, 250.0);
        write_prices(&prices, "BBB.NS", today, 90.0, 100.0);
        write_prices(&prices, "CCC.NS", today, 200.0, 150.0);
        fs::write(root.join("sectors.csv"), "Symbol,Sector\nAAA,Energy\n").unwrap();

        let config = root.join("momtrader.ini");
        fs::write(
            &config,
            format!(
                "[engine]\n\
                 capital = 10000\n\
                 top_n = 2\n\
                 \n\
                 [data]\n\
                 source = csv\n\
                 price_dir = {prices}\n\
                 tickers = AAA, BBB, CCC\n\
                 ticker_suffix = .NS\n\
                 sector_file = {sectors}\n\
                 \n\
                 [storage]\n\
                 backend = csv\n\
                 positions_file = {positions}\n\
                 equity_file = {equity}\n\
                 output_dir = {orders}\n",
                prices = prices.display(),
                sectors = root.join("sectors.csv").display(),
                positions = root.join("positions.csv").display(),
                equity = root.join("equity_history.csv").display(),
                orders = root.join("orders").display(),
            ),
        )
        .unwrap();

        Self { dir, config }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn order_files(&self) -> Vec<PathBuf> {
        match fs::read_dir(self.path("orders")) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn run(&self, dry_run: bool) -> ExitCode {
        cli::run(Cli {
            command: Command::Run {
                config: self.config.clone(),
                dry_run,
            },
        })
    }
}

mod config_loading {
    use super::*;

    #[test]
    fn build_engine_config_uses_defaults() {
        let adapter = FileConfigAdapter::from_string("[data]\nprice_dir = p\n").unwrap();
        let config = cli::build_engine_config(&adapter).unwrap();

        assert!((config.sizing.capital - 50_000.0).abs() < f64::EPSILON);
        assert_eq!(config.sizing.slots, 10);
        assert_eq!(config.momentum.top_n, 10);
        assert_eq!(config.momentum.lookback_weeks, 12);
        assert_eq!(config.regime, RegimeFilter::PriceAboveSma { period: 200 });
        assert_eq!(config.crash.lookback, 63);
        assert!((config.crash.threshold + 0.12).abs() < f64::EPSILON);
        assert_eq!(config.index_symbol, "^NSEI");
        assert_eq!(config.history_days, 365);
    }

    #[test]
    fn build_engine_config_custom_values() {
        let ini = r#"
[engine]
capital = 100000
top_n = 5
max_adds = 3
max_position_multiplier = 3.0
momentum_weeks = 26
week_anchor = thu

[regime]
strategy = ema_cross
ema_fast = 20
ema_slow = 100

[crash]
lookback = 21
threshold = -0.08

[data]
index_symbol = ^GSPC
history_days = 500
"#;
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let config = cli::build_engine_config(&adapter).unwrap();

        assert!((config.sizing.capital - 100_000.0).abs() < f64::EPSILON);
        assert_eq!(config.sizing.slots, 5);
        assert_eq!(config.momentum.top_n, 5);
        assert_eq!(config.sizing.max_adds, 3);
        assert!((config.sizing.max_position_multiplier - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.momentum.lookback_weeks, 26);
        assert_eq!(config.momentum.week_anchor, chrono::Weekday::Thu);
        assert_eq!(config.regime, RegimeFilter::EmaCross { fast: 20, slow: 100 });
        assert_eq!(config.crash.lookback, 21);
        assert_eq!(config.index_symbol, "^GSPC");
        assert_eq!(config.history_days, 500);
    }

    #[test]
    fn build_engine_config_rejects_garbage() {
        let adapter = FileConfigAdapter::from_string("[engine]\ntop_n = many\n").unwrap();
        let err = cli::build_engine_config(&adapter).unwrap_err();
        assert!(matches!(err, MomtraderError::ConfigInvalid { key, .. } if key == "top_n"));
    }

    #[test]
    fn build_universe_from_ticker_list() {
        let adapter =
            FileConfigAdapter::from_string("[data]\ntickers = tcs, INFY\nticker_suffix = .NS\n")
                .unwrap();
        let universe = cli::build_universe(&adapter).unwrap();
        assert_eq!(universe.tickers, vec!["TCS.NS", "INFY.NS"]);
    }

    #[test]
    fn build_universe_rejects_duplicate_in_list() {
        let adapter =
            FileConfigAdapter::from_string("[data]\ntickers = TCS, tcs\nticker_suffix = .NS\n")
                .unwrap();
        let err = cli::build_universe(&adapter).unwrap_err();
        assert!(matches!(err, MomtraderError::Universe(_)));
    }

    #[test]
    fn build_universe_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("universe.csv");
        fs::write(&path, "Symbol\nTCS\nINFY\n").unwrap();
        let adapter = FileConfigAdapter::from_string(&format!(
            "[data]\nuniverse_file = {}\nticker_suffix = .NS\n",
            path.display()
        ))
        .unwrap();

        let universe = cli::build_universe(&adapter).unwrap();
        assert_eq!(universe.tickers, vec!["TCS.NS", "INFY.NS"]);
    }
}

mod commands {
    use super::*;

    #[test]
    fn run_commits_orders_book_and_equity() {
        let ws = Workspace::new();

        assert_eq!(exit_code_of(ws.run(false)), exit_code_of(ExitCode::SUCCESS));

        let positions = fs::read_to_string(ws.path("positions.csv")).unwrap();
        assert_eq!(
            positions,
            "Ticker,Shares,Avg_Cost,Adds\nAAA.NS,20,250,0\nBBB.NS,50,100,0\n"
        );

        let equity = fs::read_to_string(ws.path("equity_history.csv")).unwrap();
        let lines: Vec<&str> = equity.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Date,Equity");
        assert!(lines[1].ends_with(",10000.00"));

        let orders = ws.order_files();
        assert_eq!(orders.len(), 1);
        let report = fs::read_to_string(&orders[0]).unwrap();
        assert_eq!(
            report,
            "Sector,Ticker,Action,Quantity,Price,Allocation_Value\n\
             Energy,AAA.NS,BUY,20,250.00,5000.00\n\
             Unknown,BBB.NS,BUY,50,100.00,5000.00\n"
        );
    }

    #[test]
    fn second_run_holds_and_logs_equity_again() {
        let ws = Workspace::new();
        assert_eq!(exit_code_of(ws.run(false)), exit_code_of(ExitCode::SUCCESS));
        assert_eq!(exit_code_of(ws.run(false)), exit_code_of(ExitCode::SUCCESS));

        // Nothing to trade at unchanged prices: no second report
        assert_eq!(ws.order_files().len(), 1);
        let equity = fs::read_to_string(ws.path("equity_history.csv")).unwrap();
        assert_eq!(equity.lines().count(), 3);
    }

    #[test]
    fn dry_run_leaves_disk_untouched() {
        let ws = Workspace::new();

        assert_eq!(exit_code_of(ws.run(true)), exit_code_of(ExitCode::SUCCESS));
        assert!(!ws.path("positions.csv").exists());
        assert!(!ws.path("equity_history.csv").exists());
        assert!(ws.order_files().is_empty());
    }

    #[test]
    fn positions_and_validate_succeed() {
        let ws = Workspace::new();
        let positions = cli::run(Cli {
            command: Command::Positions {
                config: ws.config.clone(),
            },
        });
        assert_eq!(exit_code_of(positions), exit_code_of(ExitCode::SUCCESS));

        let validate = cli::run(Cli {
            command: Command::Validate {
                config: ws.config.clone(),
            },
        });
        assert_eq!(exit_code_of(validate), exit_code_of(ExitCode::SUCCESS));
    }

    #[test]
    fn rank_succeeds() {
        let ws = Workspace::new();
        let code = cli::run(Cli {
            command: Command::Rank {
                config: ws.config.clone(),
            },
        });
        assert_eq!(exit_code_of(code), exit_code_of(ExitCode::SUCCESS));
    }

    #[test]
    fn invalid_config_exits_with_config_code() {
        let ws = Workspace::new();
        let content = fs::read_to_string(&ws.config).unwrap();
        fs::write(&ws.config, content.replace("top_n = 2", "top_n = 0")).unwrap();

        let code = cli::run(Cli {
            command: Command::Validate {
                config: ws.config.clone(),
            },
        });
        assert_eq!(exit_code_of(code), exit_code_of(ExitCode::from(2)));
    }

    #[test]
    fn missing_config_file_exits_with_config_code() {
        let code = cli::run(Cli {
            command: Command::Run {
                config: PathBuf::from("/nonexistent/momtrader.ini"),
                dry_run: false,
            },
        });
        assert_eq!(exit_code_of(code), exit_code_of(ExitCode::from(2)));
    }
}
