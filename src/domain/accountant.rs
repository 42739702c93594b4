//! Equity and capital accounting for a position book.

use chrono::NaiveDateTime;
use std::collections::HashMap;

use super::book::PositionBook;

#[derive(Debug, Clone, PartialEq)]
pub struct EquitySnapshot {
    pub timestamp: NaiveDateTime,
    pub total_equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    /// Sum of `shares * latest_price` over priced positions.
    pub market_value: f64,
    /// Sum of `shares * avg_cost` over every open position.
    pub invested_cost: f64,
    /// `capital - invested_cost`.
    pub cash: f64,
    /// `market_value + cash`.
    pub total_equity: f64,
    /// Positions with no latest price, left out of `market_value`.
    pub unpriced: Vec<String>,
}

impl Valuation {
    pub fn snapshot(&self, timestamp: NaiveDateTime) -> EquitySnapshot {
        EquitySnapshot {
            timestamp,
            total_equity: self.total_equity,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.unpriced.is_empty()
    }
}

pub fn value_book(
    book: &PositionBook,
    latest_prices: &HashMap<String, f64>,
    capital: f64,
) -> Valuation {
    let mut market_value = 0.0;
    let mut unpriced = Vec::new();

    for position in book.sorted_positions() {
        match latest_prices.get(&position.ticker) {
            Some(&price) => market_value += position.market_value(price),
            None => unpriced.push(position.ticker.clone()),
        }
    }

    let invested_cost = book.invested_cost();
    let cash = capital - invested_cost;

    Valuation {
        market_value,
        invested_cost,
        cash,
        total_equity: market_value + cash,
        unpriced,
    }
}
