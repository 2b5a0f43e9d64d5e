//! CSV price history adapter.
//!
//! Reads a single-asset daily export with a header row. Columns are located
//! by name: `Date` and `Price` (the close) are required, `Open`, `High` and
//! `Low` fall back to `Price` when absent. Anything else is ignored.
//!
//! One file holds one asset, so the `asset` argument of [`DataPort`] only
//! labels log output.

use crate::domain::error::CoinsimError;
use crate::domain::price::{PriceBar, PriceHistory};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%b %d, %Y", "%m/%d/%Y"];

pub struct CsvAdapter {
    path: PathBuf,
}

struct Columns {
    date: usize,
    price: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, CoinsimError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| CoinsimError::Data {
                reason: format!("missing {name} column"),
            })
        };
        Ok(Columns {
            date: required("date")?,
            price: required("price")?,
            open: find("open"),
            high: find("high"),
            low: find("low"),
        })
    }
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_bars(&self) -> Result<Vec<PriceBar>, CoinsimError> {
        let content = fs::read_to_string(&self.path).map_err(|e| CoinsimError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| CoinsimError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;
        let columns = Columns::locate(headers)?;

        let mut bars = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| CoinsimError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let row = line + 2;

            let date = parse_date(field(&record, columns.date, "date", row)?).ok_or_else(|| {
                CoinsimError::Data {
                    reason: format!("invalid date on row {}", row),
                }
            })?;
            let price = parse_number(field(&record, columns.price, "price", row)?, "price", row)?;
            let optional = |idx: Option<usize>, name: &str| match idx {
                Some(i) => parse_number(field(&record, i, name, row)?, name, row),
                None => Ok(price),
            };

            bars.push(PriceBar {
                date,
                price,
                open: optional(columns.open, "open")?,
                high: optional(columns.high, "high")?,
                low: optional(columns.low, "low")?,
            });
        }

        tracing::debug!(path = %self.path.display(), rows = bars.len(), "read price CSV");
        Ok(bars)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    name: &str,
    row: usize,
) -> Result<&'r str, CoinsimError> {
    record.get(idx).ok_or_else(|| CoinsimError::Data {
        reason: format!("missing {} value on row {}", name, row),
    })
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Accepts thousands separators, e.g. `13,456.7`.
fn parse_number(value: &str, name: &str, row: usize) -> Result<f64, CoinsimError> {
    value
        .replace(',', "")
        .parse()
        .map_err(|e| CoinsimError::Data {
            reason: format!("invalid {} value on row {}: {}", name, row, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_history(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceHistory, CoinsimError> {
        let bars = self.read_bars()?;
        if bars.is_empty() {
            return Err(CoinsimError::NoData {
                path: self.path.display().to_string(),
            });
        }
        let in_range: Vec<PriceBar> = bars
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect();
        tracing::info!(asset, bars = in_range.len(), %start_date, %end_date, "loaded price history");
        PriceHistory::new(in_range)
    }

    fn get_data_range(
        &self,
        _asset: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, CoinsimError> {
        let history = PriceHistory::new(self.read_bars()?)?;
        Ok(history
            .first_date()
            .zip(history.last_date())
            .map(|(first, last)| (first, last, history.len())))
    }
}
