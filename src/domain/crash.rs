//! Crash monitor: trailing index drawdown over a medium lookback.
//!
//! Fails open: without enough history no crash is reported, so the regime
//! filter alone decides whether the run proceeds.

use crate::domain::price_series::PriceSeries;

pub const DEFAULT_CRASH_LOOKBACK: usize = 63;
pub const DEFAULT_CRASH_THRESHOLD: f64 = -0.12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashMonitor {
    /// Sessions spanned by the trailing return, latest session included.
    pub lookback: usize,
    /// Trailing returns at or below this level signal a crash.
    pub threshold: f64,
}

impl Default for CrashMonitor {
    fn default() -> Self {
        CrashMonitor {
            lookback: DEFAULT_CRASH_LOOKBACK,
            threshold: DEFAULT_CRASH_THRESHOLD,
        }
    }
}

impl CrashMonitor {
    /// `latest / close[len - lookback] - 1`, or `None` without enough history.
    pub fn trailing_return(&self, index: &PriceSeries) -> Option<f64> {
        let closes = index.observations();
        if self.lookback == 0 || closes.len() < self.lookback {
            return None;
        }
        let base = closes[closes.len() - self.lookback];
        let latest = *closes.last()?;
        if base <= 0.0 {
            return None;
        }
        Some(latest / base - 1.0)
    }

    pub fn crash_detected(&self, index: &PriceSeries) -> bool {
        match self.trailing_return(index) {
            Some(ret) => ret <= self.threshold,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), closes)
    }

    /// `n` closes starting at `start` and ending at `end`, linearly spaced.
    fn ramp(start: f64, end: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn short_series_is_not_a_crash() {
        let monitor = CrashMonitor::default();
        assert!(!monitor.crash_detected(&series(&ramp(100.0, 50.0, 62))));
        assert!(!monitor.crash_detected(&series(&[])));
    }

    #[test]
    fn trailing_return_spans_lookback_inclusive() {
        let monitor = CrashMonitor::default();
        let closes = ramp(100.0, 80.0, 63);
        assert_relative_eq!(
            monitor.trailing_return(&series(&closes)).unwrap(),
            -0.2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn drawdown_beyond_threshold_is_crash() {
        let monitor = CrashMonitor::default();
        assert!(monitor.crash_detected(&series(&ramp(100.0, 85.0, 63))));
    }

    #[test]
    fn threshold_is_inclusive() {
        let monitor = CrashMonitor {
            lookback: 2,
            threshold: -0.5,
        };
        assert!(monitor.crash_detected(&series(&[100.0, 50.0])));
        assert!(!monitor.crash_detected(&series(&[100.0, 50.5])));
    }

    #[test]
    fn mild_dip_is_not_crash() {
        let monitor = CrashMonitor::default();
        assert!(!monitor.crash_detected(&series(&ramp(100.0, 95.0, 63))));
    }

    #[test]
    fn uses_only_the_trailing_window() {
        // Early collapse followed by a recovery inside the window.
        let mut closes = ramp(200.0, 50.0, 40);
        closes.extend(ramp(60.0, 66.0, 63));
        let monitor = CrashMonitor::default();
        assert!(!monitor.crash_detected(&series(&closes)));
    }
}
