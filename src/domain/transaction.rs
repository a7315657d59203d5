//! Executed trades.

use chrono::NaiveDateTime;

/// One executed trade. `amount` is signed: positive buys, negative sells.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub amount: f64,
    pub price: f64,
}

impl Transaction {
    pub fn new(timestamp: NaiveDateTime, symbol: &str, amount: f64, price: f64) -> Self {
        Self {
            timestamp,
            symbol: symbol.to_string(),
            amount,
            price,
        }
    }

    /// Signed cash-equivalent size of the trade.
    pub fn notional(&self) -> f64 {
        self.amount * self.price
    }

    pub fn is_finite(&self) -> bool {
        self.amount.is_finite() && self.price.is_finite()
    }
}
