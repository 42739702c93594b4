//! Durable state port traits: the position book and the equity history.

use crate::domain::accountant::EquitySnapshot;
use crate::domain::book::PositionBook;
use crate::domain::error::MomtraderError;

pub trait BookStore {
    /// The stored book, or an empty one when nothing has been saved yet.
    fn load(&self) -> Result<PositionBook, MomtraderError>;

    /// Replaces the stored book. Either the whole book is written or the
    /// previous one is left in place.
    fn save(&self, book: &PositionBook) -> Result<(), MomtraderError>;
}

/// Append-only equity history.
pub trait EquityLog {
    fn append(&self, snapshot: &EquitySnapshot) -> Result<(), MomtraderError>;

    fn history(&self) -> Result<Vec<EquitySnapshot>, MomtraderError>;
}
