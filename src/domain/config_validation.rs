//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use crate::domain::error::CoinsimError;
use crate::domain::metrics::MARKET_SERIES;
use crate::domain::strategy::parse_strategy;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;

pub const DEFAULT_REFERENCE_ASSET: &str = "USD";
pub const DEFAULT_RISK_ASSET: &str = "BTC";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), CoinsimError> {
    validate_dates(config)?;
    validate_assets(config)?;
    validate_initial_holdings(config)?;
    validate_risk_free_rate(config)?;
    validate_market(config)?;
    Ok(())
}

pub fn validate_models_config(config: &dyn ConfigPort) -> Result<(), CoinsimError> {
    let names = model_names(config);
    if names.is_empty() {
        return Err(CoinsimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "models".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for name in &names {
        if name == MARKET_SERIES {
            return Err(CoinsimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "models".to_string(),
                reason: format!("'{MARKET_SERIES}' is reserved for the market reference"),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(CoinsimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "models".to_string(),
                reason: format!("model '{name}' is listed more than once"),
            });
        }
    }

    let risk_asset = risk_asset(config);
    for name in &names {
        let spec = strategy_spec(config, name)?;
        parse_strategy(&spec, &risk_asset).map_err(|source| CoinsimError::StrategyParse {
            model: name.clone(),
            source,
        })?;
    }

    if let Some(baseline) = config.get_string("backtest", "baseline") {
        let baseline = baseline.trim();
        if !baseline.is_empty() && !names.iter().any(|n| n == baseline) {
            return Err(CoinsimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "baseline".to_string(),
                reason: format!("baseline '{baseline}' is not a listed model"),
            });
        }
    }
    Ok(())
}

/// Model names from `[backtest] models`, in listed order.
pub fn model_names(config: &dyn ConfigPort) -> Vec<String> {
    config.get_list("backtest", "models")
}

/// The `[models]` entry for `name`.
pub fn strategy_spec(config: &dyn ConfigPort, name: &str) -> Result<String, CoinsimError> {
    match config.get_string("models", name) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(CoinsimError::ConfigMissing {
            section: "models".to_string(),
            key: name.to_string(),
        }),
    }
}

pub fn reference_asset(config: &dyn ConfigPort) -> String {
    asset_or(config, "reference_asset", DEFAULT_REFERENCE_ASSET)
}

pub fn risk_asset(config: &dyn ConfigPort) -> String {
    asset_or(config, "risk_asset", DEFAULT_RISK_ASSET)
}

fn asset_or(config: &dyn ConfigPort, key: &str, default: &str) -> String {
    config
        .get_string("backtest", key)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), CoinsimError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(CoinsimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, CoinsimError> {
    match value {
        None => Err(CoinsimError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            CoinsimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }
        }),
    }
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), CoinsimError> {
    let reference = reference_asset(config);
    let risk = risk_asset(config);
    for (key, value) in [("reference_asset", &reference), ("risk_asset", &risk)] {
        if value.is_empty() {
            return Err(CoinsimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: key.to_string(),
                reason: format!("{key} must not be empty"),
            });
        }
    }
    if reference == risk {
        return Err(CoinsimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "risk_asset".to_string(),
            reason: "risk_asset must differ from reference_asset".to_string(),
        });
    }
    Ok(())
}

fn validate_initial_holdings(config: &dyn ConfigPort) -> Result<(), CoinsimError> {
    let cash = config.get_double("backtest", "initial_cash", 1.0);
    let risk = config.get_double("backtest", "initial_risk", 0.0);
    for (key, value) in [("initial_cash", cash), ("initial_risk", risk)] {
        if value.is_nan() || value < 0.0 {
            return Err(CoinsimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be non-negative"),
            });
        }
    }
    if cash + risk <= 0.0 {
        return Err(CoinsimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_cash".to_string(),
            reason: "initial holdings must not all be zero".to_string(),
        });
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), CoinsimError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(CoinsimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "risk_free_rate".to_string(),
            reason: "risk_free_rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_market(config: &dyn ConfigPort) -> Result<(), CoinsimError> {
    for key in ["daily_growth", "initial_value"] {
        let value = config.get_double("market", key, 1.0);
        if value.is_nan() || value <= 0.0 {
            return Err(CoinsimError::ConfigInvalid {
                section: "market".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be positive"),
            });
        }
    }
    Ok(())
}
