//! Order execution against a single portfolio.
//!
//! Every order settles at the day's exchange rate against the reference
//! asset. Orders the portfolio cannot cover are never rejected outright:
//! they are downgraded to a best-effort fill that exhausts the constrained
//! side. A shortfall that rounds to zero at [`ROUNDING_DECIMALS`] places is
//! treated as floating-point noise and raises no diagnostic.

use super::diagnostic::DiagnosticKind;
use super::error::CoinsimError;
use super::order::{Order, OrderSide};
use super::portfolio::Portfolio;
use super::rates::ExchangeRates;

pub const ROUNDING_DECIMALS: i32 = 8;

/// Round half away from zero at [`ROUNDING_DECIMALS`]; noise iff the result is zero.
/// The boundary is exclusive: a shortfall of exactly `5e-9` is material.
pub fn is_rounding_noise(shortfall: f64) -> bool {
    let scale = 10f64.powi(ROUNDING_DECIMALS);
    (shortfall * scale).round() == 0.0
}

/// Outcome of one order.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// The full quantity traded. `value` is in the reference asset.
    Filled { quantity: f64, value: f64 },
    /// Only `quantity` could trade; the constrained side is now empty.
    BestEffort {
        quantity: f64,
        value: f64,
        available: f64,
        shortfall: f64,
        within_tolerance: bool,
    },
    /// The order was malformed and ignored.
    Rejected,
}

impl ExecutionResult {
    /// Diagnostic to surface for this outcome, if any.
    pub fn diagnostic_kind(&self, order: &Order) -> Option<DiagnosticKind> {
        match *self {
            ExecutionResult::Filled { .. } => None,
            ExecutionResult::BestEffort {
                within_tolerance: true,
                ..
            } => None,
            ExecutionResult::BestEffort {
                quantity,
                available,
                shortfall,
                within_tolerance: false,
                ..
            } => Some(DiagnosticKind::Unaffordable {
                side: order.side,
                asset: order.asset.clone(),
                requested: order.amount,
                available,
                shortfall,
                filled: quantity,
            }),
            ExecutionResult::Rejected => Some(DiagnosticKind::InvalidOrder {
                side: order.side,
                asset: order.asset.clone(),
                amount: order.amount,
            }),
        }
    }
}

/// Apply one order to `portfolio` at today's `rates`.
///
/// Unknown assets and missing rates are precondition violations and
/// returned as errors; affordability problems never are.
pub fn execute_order(
    portfolio: &mut Portfolio,
    order: &Order,
    rates: &ExchangeRates,
) -> Result<ExecutionResult, CoinsimError> {
    let reference = rates.reference();
    let cash = portfolio.get_asset(reference)?;
    let held = portfolio.get_asset(&order.asset)?;

    if !order.is_well_formed() {
        return Ok(ExecutionResult::Rejected);
    }

    let rate = rates.rate(&order.asset)?;

    match order.side {
        OrderSide::Buy => {
            let cost = order.amount * rate;
            if cash >= cost {
                portfolio.withdraw(reference, cost)?;
                portfolio.deposit(&order.asset, order.amount)?;
                return Ok(ExecutionResult::Filled {
                    quantity: order.amount,
                    value: cost,
                });
            }
            let shortfall = cost - cash;
            let spent = portfolio.withdraw(reference, cash)?;
            let quantity = spent / rate;
            portfolio.deposit(&order.asset, quantity)?;
            Ok(ExecutionResult::BestEffort {
                quantity,
                value: spent,
                available: cash,
                shortfall,
                within_tolerance: is_rounding_noise(shortfall),
            })
        }
        OrderSide::Sell => {
            if held >= order.amount {
                portfolio.withdraw(&order.asset, order.amount)?;
                let proceeds = order.amount * rate;
                portfolio.deposit(reference, proceeds)?;
                return Ok(ExecutionResult::Filled {
                    quantity: order.amount,
                    value: proceeds,
                });
            }
            let shortfall = order.amount - held;
            let sold = portfolio.withdraw(&order.asset, held)?;
            let proceeds = sold * rate;
            portfolio.deposit(reference, proceeds)?;
            Ok(ExecutionResult::BestEffort {
                quantity: sold,
                value: proceeds,
                available: held,
                shortfall,
                within_tolerance: is_rounding_noise(shortfall),
            })
        }
    }
}
