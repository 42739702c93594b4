//! Moving-average indicators over plain close slices.
//!
//! Each calculator returns one entry per input close. Warmup entries are
//! `None`; callers that only need the latest value use [`last_valid`].

pub mod ema;
pub mod sma;

pub use ema::calculate_ema;
pub use sma::calculate_sma;

/// The final value of an indicator series, if it is past warmup.
pub fn last_valid(values: &[Option<f64>]) -> Option<f64> {
    values.last().copied().flatten()
}
