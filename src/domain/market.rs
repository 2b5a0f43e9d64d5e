//! Synthetic constant-growth market reference.

use chrono::{Duration, NaiveDate};

use super::portfolio::EquityPoint;

/// Roughly 7% a year compounded daily.
pub const DEFAULT_DAILY_GROWTH: f64 = 1.0001854;

/// `days` points from `start`; day 0 is `initial_value` and each later day
/// is the previous one times `daily_growth`.
pub fn market_reference(
    start: NaiveDate,
    days: usize,
    initial_value: f64,
    daily_growth: f64,
) -> Vec<EquityPoint> {
    let mut series = Vec::with_capacity(days);
    let mut value = initial_value;
    for i in 0..days {
        series.push(EquityPoint {
            date: start + Duration::days(i as i64),
            equity: value,
        });
        value *= daily_growth;
    }
    series
}
