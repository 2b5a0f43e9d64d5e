#![allow(dead_code)]

use chrono::NaiveDate;
use coinsim::domain::backtest::BacktestConfig;
use coinsim::domain::error::CoinsimError;
pub use coinsim::domain::price::{PriceBar, PriceHistory};
use coinsim::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, asset: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(asset.to_string(), bars);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors.insert(asset.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_history(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceHistory, CoinsimError> {
        if let Some(reason) = self.errors.get(asset) {
            return Err(CoinsimError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self
            .data
            .get(asset)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        PriceHistory::new(bars)
    }

    fn get_data_range(
        &self,
        asset: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, CoinsimError> {
        if let Some(reason) = self.errors.get(asset) {
            return Err(CoinsimError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(asset) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Bar whose open and close are both `price`.
pub fn make_bar(date: &str, price: f64) -> PriceBar {
    PriceBar::flat(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(), price)
}

/// `count` consecutive daily bars: close rises by `step` a day, open is the previous close.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64, step: f64) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let close = start_price + step * i as f64;
            PriceBar {
                date: start + chrono::Duration::days(i as i64),
                price: close,
                open: close - step,
                high: close.max(close - step),
                low: close.min(close - step),
            }
        })
        .collect()
}

pub fn sample_config(start: NaiveDate, end: NaiveDate) -> BacktestConfig {
    BacktestConfig {
        start_date: start,
        end_date: end,
        reference_asset: "USD".into(),
        risk_asset: "BTC".into(),
    }
}
