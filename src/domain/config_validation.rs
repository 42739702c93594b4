//! Configuration validation.
//!
//! Validates every config field before a cycle touches a data source or a
//! store. Numeric keys are parsed strictly: garbage is `ConfigInvalid`, never
//! a silent default.

use std::str::FromStr;

use crate::domain::cycle::MAX_HISTORY_DAYS;
use crate::domain::error::MomtraderError;
use crate::domain::price_series::parse_weekday;
use crate::ports::config_port::ConfigPort;

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    validate_sizing(config)?;
    validate_momentum(config)?;
    validate_regime(config)?;
    validate_crash(config)?;
    validate_data(config)?;
    validate_storage(config)?;
    validate_telegram(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> MomtraderError {
    MomtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> MomtraderError {
    MomtraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// Strictly parses an optional key. Absent keys yield `None`.
pub fn parse_key<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, MomtraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("cannot parse {raw:?}"))),
    }
}

fn check_min(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    min: i64,
) -> Result<Option<i64>, MomtraderError> {
    let value = parse_key::<i64>(config, section, key)?;
    if let Some(v) = value {
        if v < min {
            return Err(invalid(section, key, format!("{key} must be at least {min}")));
        }
    }
    Ok(value)
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    if let Some(capital) = parse_key::<f64>(config, "engine", "capital")? {
        if !capital.is_finite() || capital <= 0.0 {
            return Err(invalid("engine", "capital", "capital must be positive"));
        }
    }
    check_min(config, "engine", "top_n", 1)?;
    check_min(config, "engine", "max_adds", 0)?;
    if let Some(m) = parse_key::<f64>(config, "engine", "max_position_multiplier")? {
        if !m.is_finite() || m < 1.0 {
            return Err(invalid(
                "engine",
                "max_position_multiplier",
                "max_position_multiplier must be at least 1.0",
            ));
        }
    }
    Ok(())
}

fn validate_momentum(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    check_min(config, "engine", "momentum_weeks", 1)?;
    if let Some(anchor) = config.get_string("engine", "week_anchor") {
        if parse_weekday(&anchor).is_none() {
            return Err(invalid(
                "engine",
                "week_anchor",
                format!("unknown weekday {anchor:?}"),
            ));
        }
    }
    Ok(())
}

fn validate_regime(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let strategy = config
        .get_string("regime", "strategy")
        .unwrap_or_else(|| "sma".to_string());
    match strategy.to_lowercase().as_str() {
        "sma" => {
            check_min(config, "regime", "sma_period", 1)?;
        }
        "ema_cross" => {
            let fast = check_min(config, "regime", "ema_fast", 1)?
                .unwrap_or(crate::domain::regime::DEFAULT_EMA_FAST as i64);
            let slow = check_min(config, "regime", "ema_slow", 1)?
                .unwrap_or(crate::domain::regime::DEFAULT_EMA_SLOW as i64);
            if fast >= slow {
                return Err(invalid(
                    "regime",
                    "ema_fast",
                    "ema_fast must be shorter than ema_slow",
                ));
            }
        }
        other => {
            return Err(invalid(
                "regime",
                "strategy",
                format!("unknown strategy {other:?} (expected sma or ema_cross)"),
            ))
        }
    }
    Ok(())
}

fn validate_crash(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    check_min(config, "crash", "lookback", 1)?;
    if let Some(threshold) = parse_key::<f64>(config, "crash", "threshold")? {
        if !(threshold > -1.0 && threshold < 0.0) {
            return Err(invalid(
                "crash",
                "threshold",
                "threshold must be between -1 and 0",
            ));
        }
    }
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.to_lowercase().as_str() {
        "csv" => {
            if config.get_string("data", "price_dir").is_none() {
                return Err(missing("data", "price_dir"));
            }
        }
        "yahoo" => {
            if !cfg!(feature = "yahoo") {
                return Err(invalid(
                    "data",
                    "source",
                    "yahoo source requires the yahoo feature",
                ));
            }
        }
        other => {
            return Err(invalid(
                "data",
                "source",
                format!("unknown source {other:?} (expected csv or yahoo)"),
            ))
        }
    }

    if let Some(days) = check_min(config, "data", "history_days", 1)? {
        if days > MAX_HISTORY_DAYS {
            return Err(invalid(
                "data",
                "history_days",
                format!("history_days must be at most {MAX_HISTORY_DAYS}"),
            ));
        }
    }

    let has_file = config.get_string("data", "universe_file").is_some();
    let has_list = config.get_string("data", "tickers").is_some();
    if !has_file && !has_list {
        return Err(missing("data", "universe_file"));
    }
    Ok(())
}

fn validate_storage(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let backend = config
        .get_string("storage", "backend")
        .unwrap_or_else(|| "csv".to_string());
    match backend.to_lowercase().as_str() {
        "csv" => Ok(()),
        "sqlite" if cfg!(feature = "sqlite") => Ok(()),
        "sqlite" => Err(invalid(
            "storage",
            "backend",
            "sqlite backend requires the sqlite feature",
        )),
        other => Err(invalid(
            "storage",
            "backend",
            format!("unknown backend {other:?} (expected csv or sqlite)"),
        )),
    }
}

fn validate_telegram(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let token = config.get_string("telegram", "bot_token");
    let chat = config.get_string("telegram", "chat_id");
    match (token, chat) {
        (Some(_), None) => Err(missing("telegram", "chat_id")),
        (None, Some(_)) => Err(missing("telegram", "bot_token")),
        _ => Ok(()),
    }
}
