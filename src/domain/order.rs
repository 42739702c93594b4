//! Order records emitted by the order engine.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Buy,
    /// The k-th pyramid addition, k starting at 1.
    Add(u32),
    SellAll,
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderAction::Buy => write!(f, "BUY"),
            OrderAction::Add(k) => write!(f, "ADD_{}", k),
            OrderAction::SellAll => write!(f, "SELL_ALL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub ticker: String,
    pub action: OrderAction,
    pub quantity: i64,
    /// Latest price. Always present on BUY/ADD; a SELL_ALL of an instrument
    /// without a current price carries `None`.
    pub price: Option<f64>,
    pub notional: Option<f64>,
}

impl Order {
    pub fn entry(ticker: &str, action: OrderAction, quantity: i64, price: f64) -> Self {
        Order {
            ticker: ticker.to_string(),
            action,
            quantity,
            price: Some(price),
            notional: Some(quantity as f64 * price),
        }
    }

    pub fn sell_all(ticker: &str, quantity: i64, price: Option<f64>) -> Self {
        Order {
            ticker: ticker.to_string(),
            action: OrderAction::SellAll,
            quantity,
            price,
            notional: price.map(|p| quantity as f64 * p),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} x{}", self.action, self.ticker, self.quantity)?;
        if let Some(price) = self.price {
            write!(f, " @ {:.2}", price)?;
        }
        if let Some(notional) = self.notional {
            write!(f, " = {:.2}", notional)?;
        }
        Ok(())
    }
}
