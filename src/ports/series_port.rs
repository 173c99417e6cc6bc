//! Series provider port trait.

use crate::domain::error::QuantscanError;
use crate::domain::series::Series;
use chrono::NaiveDate;

pub trait SeriesPort {
    /// Load one instrument, restricted to `[start, end]` when given.
    fn fetch_series(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Series, QuantscanError>;

    fn list_codes(&self) -> Result<Vec<String>, QuantscanError>;
}
