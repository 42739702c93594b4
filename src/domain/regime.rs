//! Market regime filter: is the index trending up strongly enough to deploy
//! capital.
//!
//! Both strategies fail safe: an index series shorter than the longest
//! lookback is never bullish.

use std::fmt;

use crate::domain::indicator::{calculate_ema, calculate_sma, last_valid};
use crate::domain::price_series::PriceSeries;

pub const DEFAULT_SMA_PERIOD: usize = 200;
pub const DEFAULT_EMA_FAST: usize = 50;
pub const DEFAULT_EMA_SLOW: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegimeFilter {
    /// Latest close strictly above the trailing SMA.
    PriceAboveSma { period: usize },
    /// Latest close above the slow EMA, or fast EMA above slow EMA.
    EmaCross { fast: usize, slow: usize },
}

impl Default for RegimeFilter {
    fn default() -> Self {
        RegimeFilter::PriceAboveSma {
            period: DEFAULT_SMA_PERIOD,
        }
    }
}

impl RegimeFilter {
    /// Number of non-missing observations needed before the filter can pass.
    pub fn lookback(&self) -> usize {
        match *self {
            RegimeFilter::PriceAboveSma { period } => period,
            RegimeFilter::EmaCross { fast, slow } => fast.max(slow),
        }
    }

    pub fn is_bullish(&self, index: &PriceSeries) -> bool {
        let closes = index.observations();
        let lookback = self.lookback();
        if lookback == 0 || closes.len() < lookback {
            return false;
        }
        let Some(&latest) = closes.last() else {
            return false;
        };

        match *self {
            RegimeFilter::PriceAboveSma { period } => {
                match last_valid(&calculate_sma(&closes, period)) {
                    Some(ma) => latest > ma,
                    None => false,
                }
            }
            RegimeFilter::EmaCross { fast, slow } => {
                let fast_ema = last_valid(&calculate_ema(&closes, fast));
                let slow_ema = last_valid(&calculate_ema(&closes, slow));
                match (fast_ema, slow_ema) {
                    (Some(fast_ema), Some(slow_ema)) => latest > slow_ema || fast_ema > slow_ema,
                    _ => false,
                }
            }
        }
    }
}

impl fmt::Display for RegimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegimeFilter::PriceAboveSma { period } => write!(f, "close > SMA({})", period),
            RegimeFilter::EmaCross { fast, slow } => {
                write!(f, "close > EMA({slow}) or EMA({fast}) > EMA({slow})")
            }
        }
    }
}
