//! Non-fatal anomalies raised while executing orders.

use chrono::NaiveDate;
use std::fmt;

use super::order::OrderSide;

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    /// The order could not be afforded beyond rounding noise and was
    /// downgraded to a best-effort fill.
    Unaffordable {
        side: OrderSide,
        asset: String,
        requested: f64,
        available: f64,
        shortfall: f64,
        filled: f64,
    },
    /// The order was dropped without touching the portfolio.
    InvalidOrder {
        side: OrderSide,
        asset: String,
        amount: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub date: NaiveDate,
    pub model: String,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::Unaffordable {
                side,
                asset,
                requested,
                available,
                shortfall,
                filled,
            } => write!(
                f,
                "{} {}: cannot afford to {} {} {} (available {}, short {}); filled {} instead",
                self.date, self.model, side, requested, asset, available, shortfall, filled
            ),
            DiagnosticKind::InvalidOrder {
                side,
                asset,
                amount,
            } => write!(
                f,
                "{} {}: dropped invalid order {} {} {}",
                self.date, self.model, side, amount, asset
            ),
        }
    }
}
