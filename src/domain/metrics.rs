//! Per-model performance summary and baseline-relative series.

use super::backtest::BacktestResult;
use super::portfolio::EquityPoint;

/// Crypto markets trade every calendar day.
const DAYS_PER_YEAR: f64 = 365.0;

/// Name of the synthetic market series; reserved, no model may use it.
pub const MARKET_SERIES: &str = "Market";

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
}

impl Metrics {
    pub fn compute(series: &[EquityPoint], risk_free_rate: f64) -> Self {
        let initial_value = series.first().map(|p| p.equity).unwrap_or(0.0);
        let final_value = series.last().map(|p| p.equity).unwrap_or(initial_value);

        let total_return = if initial_value > 0.0 {
            (final_value - initial_value) / initial_value
        } else {
            0.0
        };

        let years = series.len().saturating_sub(1) as f64 / DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(series);

        let daily_rf = risk_free_rate / DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(series, daily_rf);

        Metrics {
            initial_value,
            final_value,
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
        }
    }
}

/// One labelled line on a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub points: Vec<EquityPoint>,
}

/// Every model plus the market reference, absolute and relative to a baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub baseline: String,
    pub absolute: Vec<NamedSeries>,
    pub relative: Vec<NamedSeries>,
}

impl Comparison {
    /// `None` when `baseline` is not one of the result's models.
    pub fn build(result: &BacktestResult, market: &[EquityPoint], baseline: &str) -> Option<Self> {
        let base = result.value_series(baseline)?;

        let mut absolute: Vec<NamedSeries> = result
            .model_names
            .iter()
            .filter_map(|name| {
                result.value_series(name).map(|points| NamedSeries {
                    name: name.clone(),
                    points,
                })
            })
            .collect();
        absolute.push(NamedSeries {
            name: MARKET_SERIES.to_string(),
            points: market.to_vec(),
        });

        let relative = absolute
            .iter()
            .map(|s| NamedSeries {
                name: s.name.clone(),
                points: relative_to(&s.points, &base),
            })
            .collect();

        Some(Comparison {
            baseline: baseline.to_string(),
            absolute,
            relative,
        })
    }
}

/// Element-wise `series - baseline` on the dates both share.
pub fn relative_to(series: &[EquityPoint], baseline: &[EquityPoint]) -> Vec<EquityPoint> {
    let mut out = Vec::with_capacity(series.len().min(baseline.len()));
    let mut base = baseline.iter().peekable();
    for point in series {
        while base.next_if(|b| b.date < point.date).is_some() {}
        if let Some(b) = base.peek() {
            if b.date == point.date {
                out.push(EquityPoint {
                    date: point.date,
                    equity: point.equity - b.equity,
                });
            }
        }
    }
    out
}

/// Largest peak-to-trough fall as a fraction of the peak, and the longest
/// run of days spent below a previous peak.
fn compute_drawdown(series: &[EquityPoint]) -> (f64, i64) {
    if series.is_empty() {
        return (0.0, 0);
    }

    let mut peak = series[0].equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in series {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(series: &[EquityPoint], daily_rf: f64) -> (f64, f64) {
    if series.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = series
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - daily_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stddev = (downside / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}
