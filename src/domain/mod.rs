//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod diagnostic;
pub mod error;
pub mod execution;
pub mod market;
pub mod metrics;
pub mod order;
pub mod portfolio;
pub mod price;
pub mod rates;
pub mod strategy;
