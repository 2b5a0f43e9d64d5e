//! Trading strategies.
//!
//! A strategy is a pure decision function: given the history before today,
//! its own portfolio, today's rates and the run bounds, it returns the
//! orders to execute. It never mutates the portfolio itself.

pub mod buy_and_hold;
pub mod dca;
pub mod diversified;
pub mod momentum;
pub mod spec;

use chrono::{Duration, NaiveDate};

use crate::domain::error::CoinsimError;
use crate::domain::order::Order;
use crate::domain::portfolio::Portfolio;
use crate::domain::price::HistoryView;
use crate::domain::rates::ExchangeRates;

pub use buy_and_hold::BuyAndHold;
pub use dca::DollarCostAverage;
pub use diversified::Diversified;
pub use momentum::Momentum;
pub use spec::parse_strategy;

/// Everything a strategy may look at for one decision.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    /// Rows strictly before `today()`.
    pub history: HistoryView<'a>,
    pub portfolio: &'a Portfolio,
    pub rates: &'a ExchangeRates,
    /// The model's portfolio value on the first simulated day.
    pub initial_value: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Days elapsed since `start`.
    pub day: usize,
}

impl<'a> StrategyContext<'a> {
    pub fn today(&self) -> NaiveDate {
        self.start + Duration::days(self.day as i64)
    }

    /// Number of days the run will simulate.
    pub fn planned_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Same context seen through a different portfolio.
    pub fn with_portfolio<'b>(&self, portfolio: &'b Portfolio) -> StrategyContext<'b>
    where
        'a: 'b,
    {
        StrategyContext {
            history: self.history,
            portfolio,
            rates: self.rates,
            initial_value: self.initial_value,
            start: self.start,
            end: self.end,
            day: self.day,
        }
    }

    /// Quantity of `asset` that all of the portfolio's cash buys today.
    pub fn affordable(&self, asset: &str) -> Result<f64, CoinsimError> {
        let cash = self.portfolio.get_asset(self.rates.reference())?;
        Ok(cash / self.rates.rate(asset)?)
    }
}

pub trait Strategy {
    fn decide(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Order>, CoinsimError>;

    /// Short human-readable form, e.g. `tsmom(30, 7)`.
    fn describe(&self) -> String;

    /// Days of history needed before the run start.
    fn warmup_days(&self) -> i64 {
        0
    }
}
