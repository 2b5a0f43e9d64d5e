//! Equal-weight composite of several strategies sharing one portfolio.
//!
//! Each member decides against a fresh `1/N` view of the live portfolio;
//! the views are recomputed every call and never hold state of their own.
//! Member orders are concatenated in member order.

use super::{Momentum, Strategy, StrategyContext};
use crate::domain::error::CoinsimError;
use crate::domain::order::Order;

pub struct Diversified {
    members: Vec<Box<dyn Strategy>>,
}

impl Diversified {
    pub fn new(members: Vec<Box<dyn Strategy>>) -> Self {
        Diversified { members }
    }

    /// Momentum members from `(lookback_days, rebalance_days)` pairs.
    pub fn momentum(asset: &str, params: &[(i64, i64)]) -> Self {
        Diversified::new(
            params
                .iter()
                .map(|&(lookback, rebalance)| {
                    Box::new(Momentum::new(asset, lookback, rebalance)) as Box<dyn Strategy>
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Strategy for Diversified {
    fn decide(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Order>, CoinsimError> {
        if self.members.is_empty() {
            return Ok(Vec::new());
        }
        let share = 1.0 / self.members.len() as f64;
        let mut orders = Vec::new();
        for member in &self.members {
            let view = ctx.portfolio.scaled(share);
            orders.extend(member.decide(&ctx.with_portfolio(&view))?);
        }
        Ok(orders)
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.members.iter().map(|m| m.describe()).collect();
        format!("diversified[{}]", parts.join(", "))
    }

    fn warmup_days(&self) -> i64 {
        self.members
            .iter()
            .map(|m| m.warmup_days())
            .max()
            .unwrap_or(0)
    }
}
