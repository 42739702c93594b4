//! The position book: durable state carried between runs.

use std::collections::HashMap;

use super::error::MomtraderError;
use super::position::Position;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionBook {
    pub positions: HashMap<String, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: impl IntoIterator<Item = Position>) -> Self {
        let mut book = Self::new();
        for position in positions {
            book.add_position(position);
        }
        book
    }

    pub fn add_position(&mut self, position: Position) {
        self.positions.insert(position.ticker.clone(), position);
    }

    pub fn get_position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    pub fn has_position(&self, ticker: &str) -> bool {
        self.positions.contains_key(ticker)
    }

    pub fn remove_position(&mut self, ticker: &str) -> Option<Position> {
        self.positions.remove(ticker)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Tickers in ascending order.
    pub fn tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.positions.keys().cloned().collect();
        tickers.sort();
        tickers
    }

    /// Positions in ticker order.
    pub fn sorted_positions(&self) -> Vec<&Position> {
        let mut positions: Vec<&Position> = self.positions.values().collect();
        positions.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        positions
    }

    /// Sum of `shares * avg_cost` over all open positions.
    pub fn invested_cost(&self) -> f64 {
        self.positions.values().map(Position::cost_basis).sum()
    }

    /// Validates every position and that each map key matches its ticker.
    pub fn validate(&self, max_adds: u32) -> Result<(), MomtraderError> {
        for (key, position) in &self.positions {
            if key != &position.ticker {
                return Err(MomtraderError::MalformedBook {
                    ticker: key.clone(),
                    reason: format!("keyed under {key} but holds {}", position.ticker),
                });
            }
            position
                .check(max_adds)
                .map_err(|reason| MomtraderError::MalformedBook {
                    ticker: key.clone(),
                    reason,
                })?;
        }
        Ok(())
    }
}
