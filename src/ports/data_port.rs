//! Price data access port trait.

use crate::domain::error::MomtraderError;
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily closes for `ticker` between `start_date` and `end_date`
    /// inclusive, in date order.
    ///
    /// An unknown ticker is reported as [`MomtraderError::NoData`]; any other
    /// error means the source itself failed.
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, MomtraderError>;
}
