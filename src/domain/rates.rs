//! Per-day exchange-rate snapshot.

use std::collections::BTreeMap;

use super::error::CoinsimError;
use super::price::PriceBar;

/// Mapping from asset name to its price in the reference asset.
/// The reference asset always has a rate of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRates {
    reference: String,
    rates: BTreeMap<String, f64>,
}

impl ExchangeRates {
    pub fn new(reference: &str) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(reference.to_string(), 1.0);
        ExchangeRates {
            reference: reference.to_string(),
            rates,
        }
    }

    /// Snapshot for one day: the risk asset trades at the bar's open.
    pub fn from_bar(
        bar: &PriceBar,
        reference: &str,
        risk_asset: &str,
    ) -> Result<Self, CoinsimError> {
        if !bar.open.is_finite() || bar.open <= 0.0 {
            return Err(CoinsimError::InvalidPrice {
                date: bar.date,
                price: bar.open,
            });
        }
        Ok(Self::new(reference).with_rate(risk_asset, bar.open))
    }

    pub fn with_rate(mut self, asset: &str, rate: f64) -> Self {
        if asset != self.reference {
            self.rates.insert(asset.to_string(), rate);
        }
        self
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn rate(&self, asset: &str) -> Result<f64, CoinsimError> {
        self.rates
            .get(asset)
            .copied()
            .ok_or_else(|| CoinsimError::MissingRate {
                asset: asset.to_string(),
            })
    }

    pub fn rates(&self) -> &BTreeMap<String, f64> {
        &self.rates
    }
}
