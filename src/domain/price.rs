//! Daily price bars and the historical price table.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::error::CoinsimError;

/// One day of price data for the risk asset, quoted in the reference asset.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    /// Closing price.
    pub price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
}

impl PriceBar {
    /// A bar whose open, high and low all equal the closing price.
    pub fn flat(date: NaiveDate, price: f64) -> Self {
        PriceBar {
            date,
            price,
            open: price,
            high: price,
            low: price,
        }
    }
}

/// Immutable, chronologically ordered price table with an exact-date index.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    bars: Vec<PriceBar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceHistory {
    /// Build a history from bars in any order. Duplicate dates are rejected.
    pub fn new(mut bars: Vec<PriceBar>) -> Result<Self, CoinsimError> {
        bars.sort_by_key(|b| b.date);
        let mut date_index = HashMap::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            if date_index.insert(bar.date, i).is_some() {
                return Err(CoinsimError::Data {
                    reason: format!("duplicate price row for {}", bar.date),
                });
            }
        }
        Ok(Self { bars, date_index })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    /// Exact-date lookup; a missing date is a precondition violation.
    pub fn bar_on(&self, date: NaiveDate) -> Result<&PriceBar, CoinsimError> {
        self.get_bar(date).ok_or(CoinsimError::MissingDate { date })
    }

    /// All rows strictly before `date`.
    pub fn before(&self, date: NaiveDate) -> HistoryView<'_> {
        let end = self.bars.partition_point(|b| b.date < date);
        HistoryView {
            bars: &self.bars[..end],
            date_index: &self.date_index,
        }
    }

    /// Calendar dates in `[start, end]` with no row.
    pub fn missing_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !self.date_index.contains_key(d))
            .collect()
    }
}

/// Read-only prefix of a [`PriceHistory`]: every row is dated before the cutoff.
#[derive(Debug, Clone, Copy)]
pub struct HistoryView<'a> {
    bars: &'a [PriceBar],
    date_index: &'a HashMap<NaiveDate, usize>,
}

impl<'a> HistoryView<'a> {
    pub fn bars(&self) -> &'a [PriceBar] {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&'a PriceBar> {
        self.bars.last()
    }

    /// Exact-date lookup restricted to the view.
    pub fn get_bar(&self, date: NaiveDate) -> Option<&'a PriceBar> {
        match self.date_index.get(&date) {
            Some(&i) if i < self.bars.len() => Some(&self.bars[i]),
            _ => None,
        }
    }

    /// Closing price on `date`; dates outside the view are a precondition violation.
    pub fn close_on(&self, date: NaiveDate) -> Result<f64, CoinsimError> {
        self.get_bar(date)
            .map(|b| b.price)
            .ok_or(CoinsimError::MissingDate { date })
    }
}
