//! Momentum ranker: trailing weekly relative strength across the universe.
//!
//! Daily closes are resampled to one close per week (last observation of the
//! week, keyed by the anchor week-end day) on a grid shared by the whole
//! universe. Each instrument is scored by its return over `lookback_weeks`
//! grid steps ending at the latest week; instruments without enough weekly
//! history, or with a missing endpoint, are dropped rather than failing the
//! run.

use chrono::{Duration, NaiveDate, Weekday};
use std::collections::{BTreeMap, HashMap};

use crate::domain::error::MomtraderError;
use crate::domain::price_series::PriceSeries;

pub const DEFAULT_LOOKBACK_WEEKS: usize = 12;
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumConfig {
    pub lookback_weeks: usize,
    pub top_n: usize,
    pub week_anchor: Weekday,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        MomentumConfig {
            lookback_weeks: DEFAULT_LOOKBACK_WEEKS,
            top_n: DEFAULT_TOP_N,
            week_anchor: Weekday::Fri,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumScore {
    pub ticker: String,
    pub weekly_return: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    NoSeries,
    InsufficientWeeks { weeks: usize },
    MissingEndpoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedTicker {
    pub ticker: String,
    pub reason: DropReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Week-end date of the latest grid point.
    pub as_of_week: NaiveDate,
    /// Top-N candidates, best first.
    pub selected: Vec<MomentumScore>,
    pub dropped: Vec<DroppedTicker>,
}

impl Ranking {
    pub fn candidates(&self) -> Vec<String> {
        self.selected.iter().map(|s| s.ticker.clone()).collect()
    }
}

/// Ranks `universe` by trailing weekly return and keeps the top N.
///
/// Ties keep universe order. Fails only when the shared weekly grid itself is
/// shorter than `lookback_weeks + 1`.
pub fn rank(
    universe: &[String],
    series: &HashMap<String, PriceSeries>,
    config: &MomentumConfig,
) -> Result<Ranking, MomtraderError> {
    let need = config.lookback_weeks + 1;

    let weekly: Vec<(&String, Option<BTreeMap<NaiveDate, f64>>)> = universe
        .iter()
        .map(|ticker| {
            let resampled = series
                .get(ticker)
                .map(|s| s.resample_weekly(config.week_anchor));
            (ticker, resampled)
        })
        .collect();

    let first_week = weekly
        .iter()
        .filter_map(|(_, w)| w.as_ref().and_then(|w| w.keys().next().copied()))
        .min();
    let last_week = weekly
        .iter()
        .filter_map(|(_, w)| w.as_ref().and_then(|w| w.keys().next_back().copied()))
        .max();

    let (first_week, last_week) = match (first_week, last_week) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(MomtraderError::InsufficientHistory {
                subject: "weekly grid".into(),
                have: 0,
                need,
            });
        }
    };

    let grid_len = ((last_week - first_week).num_days() / 7) as usize + 1;
    if grid_len < need {
        return Err(MomtraderError::InsufficientHistory {
            subject: "weekly grid".into(),
            have: grid_len,
            need,
        });
    }
    let base_week = last_week - Duration::weeks(config.lookback_weeks as i64);

    let mut scores = Vec::new();
    let mut dropped = Vec::new();

    for (ticker, weeks) in weekly {
        let Some(weeks) = weeks else {
            dropped.push(DroppedTicker {
                ticker: ticker.clone(),
                reason: DropReason::NoSeries,
            });
            continue;
        };

        if weeks.len() < need {
            dropped.push(DroppedTicker {
                ticker: ticker.clone(),
                reason: DropReason::InsufficientWeeks { weeks: weeks.len() },
            });
            continue;
        }

        match (weeks.get(&base_week), weeks.get(&last_week)) {
            (Some(&base), Some(&latest)) if base > 0.0 && latest.is_finite() => {
                scores.push(MomentumScore {
                    ticker: ticker.clone(),
                    weekly_return: latest / base - 1.0,
                });
            }
            _ => dropped.push(DroppedTicker {
                ticker: ticker.clone(),
                reason: DropReason::MissingEndpoint,
            }),
        }
    }

    // Stable: equal scores keep universe order.
    scores.sort_by(|a, b| b.weekly_return.total_cmp(&a.weekly_return));
    scores.truncate(config.top_n);

    Ok(Ranking {
        as_of_week: last_week,
        selected: scores,
        dropped,
    })
}
