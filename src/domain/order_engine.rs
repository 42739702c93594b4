//! Order engine: turns a candidate list, the latest prices and the current
//! position book into orders and the next book.
//!
//! Per ticker:
//! - held, not selected: SELL_ALL and remove
//! - selected, not held: BUY `floor(base_allocation / price)` shares
//! - selected and held: ADD_k when the pyramiding rule allows, else hold
//!
//! Sells are decided against the book as loaded; buys and adds then apply to
//! a working copy which becomes the returned book. The input book is never
//! mutated.

use std::collections::{HashMap, HashSet};

use super::book::PositionBook;
use super::error::MomtraderError;
use super::order::{Order, OrderAction};
use super::position::Position;

pub const DEFAULT_CAPITAL: f64 = 50_000.0;
pub const DEFAULT_MAX_ADDS: u32 = 2;
pub const DEFAULT_MAX_POSITION_MULTIPLIER: f64 = 2.0;

/// Fixed-slot capital model.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    pub capital: f64,
    /// Number of slots the capital is split into (the ranker's top N).
    pub slots: usize,
    pub max_adds: u32,
    pub max_position_multiplier: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            capital: DEFAULT_CAPITAL,
            slots: super::momentum::DEFAULT_TOP_N,
            max_adds: DEFAULT_MAX_ADDS,
            max_position_multiplier: DEFAULT_MAX_POSITION_MULTIPLIER,
        }
    }
}

impl SizingConfig {
    pub fn base_allocation(&self) -> f64 {
        self.capital / self.slots as f64
    }

    /// Market value at or above which a position is no longer added to.
    pub fn position_cap(&self) -> f64 {
        self.base_allocation() * self.max_position_multiplier
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    PriceUnavailable,
    /// Base allocation buys less than one share.
    BelowOneShare { price: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: SkipReason,
}

/// Outcome of one decision pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancePlan {
    /// Sells first (ticker order), then buys/adds in candidate order.
    pub orders: Vec<Order>,
    pub book: PositionBook,
    /// Selected tickers already held and left unchanged.
    pub held: Vec<String>,
    pub skipped: Vec<SkippedTicker>,
}

impl RebalancePlan {
    pub fn bought(&self) -> Vec<&str> {
        self.tickers_with(|a| a == OrderAction::Buy)
    }

    pub fn sold(&self) -> Vec<&str> {
        self.tickers_with(|a| a == OrderAction::SellAll)
    }

    pub fn added(&self) -> Vec<&str> {
        self.tickers_with(|a| matches!(a, OrderAction::Add(_)))
    }

    fn tickers_with(&self, pred: impl Fn(OrderAction) -> bool) -> Vec<&str> {
        self.orders
            .iter()
            .filter(|o| pred(o.action))
            .map(|o| o.ticker.as_str())
            .collect()
    }
}

/// Shares purchasable with `allocation` at `price`, whole shares only.
pub fn share_quantity(allocation: f64, price: f64) -> i64 {
    (allocation / price).floor() as i64
}

/// Whether a held, still-selected position may be pyramided at `price`.
pub fn can_add(position: &Position, price: f64, sizing: &SizingConfig) -> bool {
    position.adds < sizing.max_adds
        && price > position.avg_cost
        && position.market_value(price) < sizing.position_cap()
}

pub fn plan_rebalance(
    book: &PositionBook,
    candidates: &[String],
    prices: &HashMap<String, f64>,
    sizing: &SizingConfig,
) -> Result<RebalancePlan, MomtraderError> {
    book.validate(sizing.max_adds)?;

    let base_allocation = sizing.base_allocation();
    let selected: HashSet<&str> = candidates.iter().map(String::as_str).collect();

    let mut orders = Vec::new();
    let mut held = Vec::new();
    let mut skipped = Vec::new();
    let mut next = book.clone();

    for ticker in book.tickers() {
        if selected.contains(ticker.as_str()) {
            continue;
        }
        if let Some(position) = next.remove_position(&ticker) {
            let price = prices.get(&ticker).copied();
            let usable = price.filter(|p| p.is_finite() && *p > 0.0);
            if price.is_some() && usable.is_none() {
                log::warn!("{ticker}: unusable close {price:?}, selling without a price");
            }
            orders.push(Order::sell_all(&ticker, position.shares, usable));
        }
    }

    let mut seen = HashSet::new();
    for ticker in candidates {
        if !seen.insert(ticker.as_str()) {
            continue;
        }

        let Some(&price) = prices.get(ticker) else {
            if book.has_position(ticker) {
                held.push(ticker.clone());
            }
            skipped.push(SkippedTicker {
                ticker: ticker.clone(),
                reason: SkipReason::PriceUnavailable,
            });
            continue;
        };
        if !price.is_finite() || price <= 0.0 {
            return Err(MomtraderError::InvalidPrice {
                ticker: ticker.clone(),
                price,
            });
        }

        match book.get_position(ticker) {
            None => {
                let quantity = share_quantity(base_allocation, price);
                if quantity <= 0 {
                    skipped.push(SkippedTicker {
                        ticker: ticker.clone(),
                        reason: SkipReason::BelowOneShare { price },
                    });
                    continue;
                }
                orders.push(Order::entry(ticker, OrderAction::Buy, quantity, price));
                next.add_position(Position::open(ticker, quantity, price));
            }
            Some(position) => {
                let quantity = share_quantity(base_allocation, price);
                if can_add(position, price, sizing) && quantity > 0 {
                    let added = position.with_addition(quantity, price);
                    orders.push(Order::entry(
                        ticker,
                        OrderAction::Add(added.adds),
                        quantity,
                        price,
                    ));
                    next.add_position(added);
                } else {
                    held.push(ticker.clone());
                }
            }
        }
    }

    Ok(RebalancePlan {
        orders,
        book: next,
        held,
        skipped,
    })
}
