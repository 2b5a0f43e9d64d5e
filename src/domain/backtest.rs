//! Backtest configuration and the day-stepping simulation loop.
//!
//! Each simulated day:
//! 1. derive today's exchange rates from the price table,
//! 2. record every model's holdings and value *before* trading,
//! 3. hand each strategy the history strictly before today,
//! 4. execute the returned orders in order against that model's portfolio.
//!
//! Models are stepped in registration order and never share state.

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashSet};

use super::diagnostic::Diagnostic;
use super::error::CoinsimError;
use super::execution::{execute_order, ExecutionResult};
use super::portfolio::{EquityPoint, Portfolio};
use super::price::PriceHistory;
use super::rates::ExchangeRates;
use super::strategy::{Strategy, StrategyContext};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reference_asset: String,
    pub risk_asset: String,
}

impl BacktestConfig {
    /// Number of simulated days: whole days from start to end, end excluded.
    pub fn total_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days().max(0)
    }

    pub fn date_of(&self, day: usize) -> NaiveDate {
        self.start_date + Duration::days(day as i64)
    }
}

/// A named strategy bound to the portfolio it trades.
pub struct Model {
    pub name: String,
    pub strategy: Box<dyn Strategy>,
    pub portfolio: Portfolio,
}

impl Model {
    pub fn new(name: &str, strategy: Box<dyn Strategy>, portfolio: Portfolio) -> Self {
        Model {
            name: name.to_string(),
            strategy,
            portfolio,
        }
    }
}

/// One model's state at the start of a day, before that day's orders.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    pub holdings: BTreeMap<String, f64>,
    pub value: f64,
}

/// All models on one day; `snapshots[i]` belongs to `model_names[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub snapshots: Vec<ModelSnapshot>,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub model_names: Vec<String>,
    pub initial_values: Vec<f64>,
    pub days: Vec<DayRecord>,
    pub final_portfolios: Vec<Portfolio>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BacktestResult {
    pub fn model_index(&self, name: &str) -> Option<usize> {
        self.model_names.iter().position(|n| n == name)
    }

    /// Daily value series for one model.
    pub fn value_series(&self, name: &str) -> Option<Vec<EquityPoint>> {
        let idx = self.model_index(name)?;
        Some(
            self.days
                .iter()
                .map(|d| EquityPoint {
                    date: d.date,
                    equity: d.snapshots[idx].value,
                })
                .collect(),
        )
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayRecord> {
        self.days
            .binary_search_by_key(&date, |d| d.date)
            .ok()
            .map(|i| &self.days[i])
    }

    pub fn snapshot(&self, name: &str, date: NaiveDate) -> Option<&ModelSnapshot> {
        let idx = self.model_index(name)?;
        self.day(date).map(|d| &d.snapshots[idx])
    }

    pub fn initial_value(&self, name: &str) -> Option<f64> {
        self.model_index(name).map(|i| self.initial_values[i])
    }

    pub fn diagnostics_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.model == name)
    }
}

fn rates_on(
    history: &PriceHistory,
    date: NaiveDate,
    config: &BacktestConfig,
) -> Result<ExchangeRates, CoinsimError> {
    let bar = history.bar_on(date)?;
    ExchangeRates::from_bar(bar, &config.reference_asset, &config.risk_asset)
}

/// Run every model over `[start_date, end_date)`.
///
/// Any precondition violation (missing date, unknown asset, worthless
/// portfolio) aborts the whole run; no partial result is returned.
pub fn run_backtest(
    history: &PriceHistory,
    mut models: Vec<Model>,
    config: &BacktestConfig,
) -> Result<BacktestResult, CoinsimError> {
    let mut seen = HashSet::new();
    for model in &models {
        if !seen.insert(model.name.as_str()) {
            return Err(CoinsimError::DuplicateModel {
                name: model.name.clone(),
            });
        }
    }

    let total_days = config.total_days();
    tracing::info!(
        models = models.len(),
        days = total_days,
        start = %config.start_date,
        end = %config.end_date,
        "starting backtest"
    );

    let reference = config.reference_asset.as_str();
    let opening_rates = rates_on(history, config.start_date, config)?;
    let initial_values = models
        .iter()
        .map(|m| m.portfolio.get_values(reference, &opening_rates).map(|v| v.total))
        .collect::<Result<Vec<f64>, _>>()?;

    let mut days = Vec::with_capacity(total_days as usize);
    let mut diagnostics = Vec::new();

    for day in 0..total_days as usize {
        let today = config.date_of(day);
        let rates = rates_on(history, today, config)?;

        let mut snapshots = Vec::with_capacity(models.len());
        for model in &models {
            let valuation = model.portfolio.get_values(reference, &rates)?;
            snapshots.push(ModelSnapshot {
                holdings: model.portfolio.get_all_assets(),
                value: valuation.total,
            });
        }
        days.push(DayRecord {
            date: today,
            snapshots,
        });

        let past = history.before(today);
        for (model, &initial_value) in models.iter_mut().zip(&initial_values) {
            let orders = {
                let ctx = StrategyContext {
                    history: past,
                    portfolio: &model.portfolio,
                    rates: &rates,
                    initial_value,
                    start: config.start_date,
                    end: config.end_date,
                    day,
                };
                model.strategy.decide(&ctx)?
            };

            for order in &orders {
                let result = execute_order(&mut model.portfolio, order, &rates)?;
                tracing::debug!(model = %model.name, date = %today, %order, ?result, "executed order");
                if let Some(kind) = result.diagnostic_kind(order) {
                    let diagnostic = Diagnostic {
                        date: today,
                        model: model.name.clone(),
                        kind,
                    };
                    tracing::warn!("{diagnostic}");
                    diagnostics.push(diagnostic);
                } else if let ExecutionResult::BestEffort { shortfall, .. } = result {
                    tracing::debug!(model = %model.name, shortfall, "rounding shortfall ignored");
                }
            }
        }
    }

    tracing::info!(
        days = days.len(),
        diagnostics = diagnostics.len(),
        "backtest finished"
    );

    let (model_names, final_portfolios) = models
        .into_iter()
        .map(|m| (m.name, m.portfolio))
        .unzip();

    Ok(BacktestResult {
        start_date: config.start_date,
        end_date: config.end_date,
        model_names,
        initial_values,
        days,
        final_portfolios,
        diagnostics,
    })
}
