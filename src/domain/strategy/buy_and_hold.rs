//! Buy and hold: convert all cash into the risk asset as soon as possible.

use super::{Strategy, StrategyContext};
use crate::domain::error::CoinsimError;
use crate::domain::order::Order;

#[derive(Debug, Clone, PartialEq)]
pub struct BuyAndHold {
    pub asset: String,
}

impl BuyAndHold {
    pub fn new(asset: &str) -> Self {
        BuyAndHold {
            asset: asset.to_string(),
        }
    }
}

impl Strategy for BuyAndHold {
    fn decide(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Order>, CoinsimError> {
        Ok(vec![Order::buy(&self.asset, ctx.affordable(&self.asset)?)])
    }

    fn describe(&self) -> String {
        "hodl".to_string()
    }
}
