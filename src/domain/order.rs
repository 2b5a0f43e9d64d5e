//! Orders returned by strategies.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "b" | "buy" => Ok(OrderSide::Buy),
            "s" | "sell" => Ok(OrderSide::Sell),
            other => Err(format!("invalid order side '{other}'")),
        }
    }
}

/// Buy or sell `amount` units of `asset` against the reference asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub side: OrderSide,
    pub asset: String,
    pub amount: f64,
}

impl Order {
    pub fn buy(asset: &str, amount: f64) -> Self {
        Order {
            side: OrderSide::Buy,
            asset: asset.to_string(),
            amount,
        }
    }

    pub fn sell(asset: &str, amount: f64) -> Self {
        Order {
            side: OrderSide::Sell,
            asset: asset.to_string(),
            amount,
        }
    }

    /// Negative, NaN or infinite amounts cannot be executed.
    pub fn is_well_formed(&self) -> bool {
        self.amount.is_finite() && self.amount >= 0.0
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.side, self.amount, self.asset)
    }
}
