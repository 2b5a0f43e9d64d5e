//! Dollar-cost averaging: invest an equal slice of the initial value every day.

use super::{Strategy, StrategyContext};
use crate::domain::error::CoinsimError;
use crate::domain::order::Order;

#[derive(Debug, Clone, PartialEq)]
pub struct DollarCostAverage {
    pub asset: String,
}

impl DollarCostAverage {
    pub fn new(asset: &str) -> Self {
        DollarCostAverage {
            asset: asset.to_string(),
        }
    }
}

impl Strategy for DollarCostAverage {
    /// The slice ignores the current cash balance; overspending is left to
    /// the execution engine's best-effort fill.
    fn decide(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Order>, CoinsimError> {
        let per_day = ctx.initial_value / ctx.planned_days() as f64;
        let amount = per_day / ctx.rates.rate(&self.asset)?;
        Ok(vec![Order::buy(&self.asset, amount)])
    }

    fn describe(&self) -> String {
        "dca".to_string()
    }
}
