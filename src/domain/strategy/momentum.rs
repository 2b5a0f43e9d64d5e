//! Time-series momentum.
//!
//! Every `rebalance_days`, compare yesterday's close with the close
//! `lookback_days` before it. A non-negative change moves everything into
//! the risk asset; a negative one moves everything into cash.

use chrono::Duration;

use super::{Strategy, StrategyContext};
use crate::domain::error::CoinsimError;
use crate::domain::order::Order;

#[derive(Debug, Clone, PartialEq)]
pub struct Momentum {
    pub asset: String,
    pub lookback_days: i64,
    pub rebalance_days: i64,
}

impl Momentum {
    pub fn new(asset: &str, lookback_days: i64, rebalance_days: i64) -> Self {
        Momentum {
            asset: asset.to_string(),
            lookback_days,
            rebalance_days,
        }
    }

    /// Active on days where `(day - 1) mod rebalance_days == 0`, so the
    /// first decision can use a full day of history.
    pub fn is_rebalance_day(&self, day: usize) -> bool {
        (day as i64 - 1).rem_euclid(self.rebalance_days) == 0
    }
}

impl Strategy for Momentum {
    fn decide(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Order>, CoinsimError> {
        if !self.is_rebalance_day(ctx.day) {
            return Ok(Vec::new());
        }

        let yesterday = ctx.today() - Duration::days(1);
        let then = ctx
            .history
            .close_on(yesterday - Duration::days(self.lookback_days))?;
        let now = ctx.history.close_on(yesterday)?;

        if now - then >= 0.0 {
            Ok(vec![Order::buy(&self.asset, ctx.affordable(&self.asset)?)])
        } else {
            let held = ctx.portfolio.get_asset(&self.asset)?;
            Ok(vec![Order::sell(&self.asset, held)])
        }
    }

    fn describe(&self) -> String {
        format!("tsmom({}, {})", self.lookback_days, self.rebalance_days)
    }

    fn warmup_days(&self) -> i64 {
        // Day 0 is only active when rebalancing daily; it looks back from start - 1.
        if self.rebalance_days == 1 {
            self.lookback_days + 1
        } else {
            self.lookback_days
        }
    }
}
