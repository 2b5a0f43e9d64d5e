//! Historical price source port trait.

use crate::domain::error::CoinsimError;
use crate::domain::price::PriceHistory;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `asset` dated within `[start_date, end_date]`.
    fn fetch_history(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceHistory, CoinsimError>;

    /// First date, last date and bar count, or `None` when there is no data.
    fn get_data_range(
        &self,
        asset: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, CoinsimError>;
}
