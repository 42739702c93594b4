//! Order report port trait.

use crate::domain::error::MomtraderError;
use crate::domain::order::Order;

/// Port for writing the per-run order report artifact.
pub trait ReportPort {
    /// Writes the orders of one run and returns the artifact location.
    /// Distinct `run_id`s must never overwrite each other.
    fn write_orders(&self, run_id: &str, orders: &[Order]) -> Result<String, MomtraderError>;

    /// Removes an artifact written earlier in the same run.
    fn discard(&self, location: &str) -> Result<(), MomtraderError>;
}
