//! Asset balance ledger and valuation.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::error::CoinsimError;
use super::rates::ExchangeRates;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Per-asset value in the target asset and each asset's share of the total.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub values: BTreeMap<String, f64>,
    pub percentages: BTreeMap<String, f64>,
    pub total: f64,
}

/// Named-asset balances. The asset set is fixed at construction and no
/// balance ever goes below zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    assets: BTreeMap<String, f64>,
}

impl Portfolio {
    /// Seed a ledger from initial holdings. The mapping is copied.
    pub fn new(assets: &BTreeMap<String, f64>) -> Self {
        Portfolio {
            assets: assets.clone(),
        }
    }

    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Portfolio {
            assets: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn check(&self, asset: &str, amount: f64) -> Result<(), CoinsimError> {
        if amount.is_nan() || amount < 0.0 {
            return Err(CoinsimError::NegativeAmount {
                asset: asset.to_string(),
                amount,
            });
        }
        if !self.assets.contains_key(asset) {
            return Err(CoinsimError::UnknownAsset {
                asset: asset.to_string(),
            });
        }
        Ok(())
    }

    /// Remove up to `amount` of `asset`. Returns the amount actually
    /// withdrawn, which is clamped to the available balance.
    pub fn withdraw(&mut self, asset: &str, amount: f64) -> Result<f64, CoinsimError> {
        self.check(asset, amount)?;
        let mut withdrawn = 0.0;
        if let Some(balance) = self.assets.get_mut(asset) {
            withdrawn = amount.min(*balance);
            *balance = (*balance - withdrawn).max(0.0);
        }
        Ok(withdrawn)
    }

    pub fn deposit(&mut self, asset: &str, amount: f64) -> Result<(), CoinsimError> {
        self.check(asset, amount)?;
        if let Some(balance) = self.assets.get_mut(asset) {
            *balance += amount;
        }
        Ok(())
    }

    pub fn get_asset(&self, asset: &str) -> Result<f64, CoinsimError> {
        self.assets
            .get(asset)
            .copied()
            .ok_or_else(|| CoinsimError::UnknownAsset {
                asset: asset.to_string(),
            })
    }

    pub fn get_assets(&self, assets: &[&str]) -> Result<BTreeMap<String, f64>, CoinsimError> {
        assets
            .iter()
            .map(|&a| self.get_asset(a).map(|v| (a.to_string(), v)))
            .collect()
    }

    /// Copy of every balance; mutating it does not touch the ledger.
    pub fn get_all_assets(&self) -> BTreeMap<String, f64> {
        self.assets.clone()
    }

    pub fn asset_names(&self) -> Vec<String> {
        self.assets.keys().cloned().collect()
    }

    /// Value of each holding in `target` and its share of the total.
    /// Fails when the portfolio is worth nothing.
    pub fn get_values(
        &self,
        target: &str,
        rates: &ExchangeRates,
    ) -> Result<Valuation, CoinsimError> {
        if !self.assets.contains_key(target) {
            return Err(CoinsimError::UnknownAsset {
                asset: target.to_string(),
            });
        }
        let values = self
            .assets
            .iter()
            .map(|(asset, &amount)| rates.rate(asset).map(|r| (asset.clone(), amount * r)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        let total: f64 = values.values().sum();
        if total == 0.0 {
            return Err(CoinsimError::ZeroPortfolioValue);
        }
        let percentages = values
            .iter()
            .map(|(asset, v)| (asset.clone(), v / total))
            .collect();
        Ok(Valuation {
            values,
            percentages,
            total,
        })
    }

    /// An independent ledger holding `fraction` of every balance.
    pub fn scaled(&self, fraction: f64) -> Portfolio {
        Portfolio {
            assets: self
                .assets
                .iter()
                .map(|(k, v)| (k.clone(), v * fraction))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn sample() -> Portfolio {
        Portfolio::from_pairs(&[("USD", 1000.0), ("BTC", 2.0)])
    }

    fn rates(btc: f64) -> ExchangeRates {
        ExchangeRates::new("USD").with_rate("BTC", btc)
    }

    #[test]
    fn construction_copies_holdings() {
        let mut seed = BTreeMap::new();
        seed.insert("USD".to_string(), 10.0);
        let mut a = Portfolio::new(&seed);
        let b = Portfolio::new(&seed);
        a.deposit("USD", 5.0).unwrap();
        seed.insert("USD".to_string(), 0.0);
        assert_eq!(a.get_asset("USD").unwrap(), 15.0);
        assert_eq!(b.get_asset("USD").unwrap(), 10.0);
    }

    #[test]
    fn withdraw_within_balance() {
        let mut p = sample();
        assert_eq!(p.withdraw("USD", 400.0).unwrap(), 400.0);
        assert_eq!(p.get_asset("USD").unwrap(), 600.0);
    }

    #[test]
    fn withdraw_clamps_to_balance() {
        let mut p = sample();
        assert_eq!(p.withdraw("BTC", 5.0).unwrap(), 2.0);
        assert_eq!(p.get_asset("BTC").unwrap(), 0.0);
    }

    #[test]
    fn withdraw_rejects_negative_amount() {
        let mut p = sample();
        assert!(matches!(
            p.withdraw("USD", -1.0),
            Err(CoinsimError::NegativeAmount { .. })
        ));
        assert!(p.withdraw("USD", f64::NAN).is_err());
        assert_eq!(p.get_asset("USD").unwrap(), 1000.0);
    }

    #[test]
    fn unknown_asset_is_never_created() {
        let mut p = sample();
        assert!(matches!(
            p.deposit("ETH", 1.0),
            Err(CoinsimError::UnknownAsset { .. })
        ));
        assert!(p.withdraw("ETH", 1.0).is_err());
        assert!(p.get_asset("ETH").is_err());
        assert_eq!(p.asset_names(), vec!["BTC".to_string(), "USD".to_string()]);
    }

    #[test]
    fn deposit_adds_to_balance() {
        let mut p = sample();
        p.deposit("BTC", 0.5).unwrap();
        assert_eq!(p.get_asset("BTC").unwrap(), 2.5);
        assert!(p.deposit("BTC", -0.5).is_err());
    }

    #[test]
    fn get_assets_subset() {
        let p = sample();
        let subset = p.get_assets(&["BTC"]).unwrap();
        assert_eq!(subset.len(), 1);
        assert_eq!(subset["BTC"], 2.0);
        assert!(p.get_assets(&["BTC", "ETH"]).is_err());
    }

    #[test]
    fn get_all_assets_returns_a_copy() {
        let p = sample();
        let mut copy = p.get_all_assets();
        copy.insert("USD".to_string(), 0.0);
        assert_eq!(p.get_asset("USD").unwrap(), 1000.0);
    }

    #[test]
    fn get_values_and_percentages() {
        let p = sample();
        let valuation = p.get_values("USD", &rates(500.0)).unwrap();
        assert_relative_eq!(valuation.total, 2000.0);
        assert_relative_eq!(valuation.values["BTC"], 1000.0);
        assert_relative_eq!(valuation.percentages["USD"], 0.5);
        assert_relative_eq!(valuation.percentages["BTC"], 0.5);
    }

    #[test]
    fn get_values_requires_held_target() {
        let p = sample();
        assert!(matches!(
            p.get_values("EUR", &rates(500.0)),
            Err(CoinsimError::UnknownAsset { .. })
        ));
    }

    #[test]
    fn get_values_zero_total_fails() {
        let p = Portfolio::from_pairs(&[("USD", 0.0), ("BTC", 0.0)]);
        assert!(matches!(
            p.get_values("USD", &rates(500.0)),
            Err(CoinsimError::ZeroPortfolioValue)
        ));
    }

    #[test]
    fn scaled_is_independent() {
        let p = sample();
        let mut third = p.scaled(1.0 / 3.0);
        assert_relative_eq!(third.get_asset("USD").unwrap(), 1000.0 / 3.0);
        third.withdraw("USD", 100.0).unwrap();
        assert_eq!(p.get_asset("USD").unwrap(), 1000.0);
    }

    proptest! {
        #[test]
        fn withdrawals_never_go_negative(
            start in 0.0f64..1e6,
            amounts in prop::collection::vec(0.0f64..1e6, 1..20),
        ) {
            let mut p = Portfolio::from_pairs(&[("USD", start)]);
            for amount in amounts {
                let before = p.get_asset("USD").unwrap();
                let taken = p.withdraw("USD", amount).unwrap();
                let after = p.get_asset("USD").unwrap();
                prop_assert!(after >= 0.0);
                prop_assert_eq!(taken, amount.min(before));
                prop_assert_eq!(after, before - taken);
            }
        }
    }
}
