//! A held instrument with its cost basis and pyramid count.

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticker: String,
    pub shares: i64,
    pub avg_cost: f64,
    /// Pyramid additions applied since the initial entry.
    pub adds: u32,
}

impl Position {
    pub fn open(ticker: &str, shares: i64, price: f64) -> Self {
        Position {
            ticker: ticker.to_string(),
            shares,
            avg_cost: price,
            adds: 0,
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    pub fn cost_basis(&self) -> f64 {
        self.shares as f64 * self.avg_cost
    }

    /// The position after buying `quantity` more shares at `price`: shares
    /// grow, cost is the quantity-weighted average, `adds` increments.
    pub fn with_addition(&self, quantity: i64, price: f64) -> Self {
        let new_shares = self.shares + quantity;
        let new_avg = (self.cost_basis() + quantity as f64 * price) / new_shares as f64;
        Position {
            ticker: self.ticker.clone(),
            shares: new_shares,
            avg_cost: new_avg,
            adds: self.adds + 1,
        }
    }

    /// Checks the book invariants, returning a description of the first
    /// violation.
    pub fn check(&self, max_adds: u32) -> Result<(), String> {
        if self.ticker.trim().is_empty() {
            return Err("empty ticker".into());
        }
        if self.shares <= 0 {
            return Err(format!("shares must be positive, got {}", self.shares));
        }
        if !self.avg_cost.is_finite() || self.avg_cost <= 0.0 {
            return Err(format!("avg_cost must be positive, got {}", self.avg_cost));
        }
        if self.adds > max_adds {
            return Err(format!("adds {} exceeds max {}", self.adds, max_adds));
        }
        Ok(())
    }
}
