//! NAV history access port trait.

use crate::domain::error::FundgridError;
use crate::domain::nav::NavSeries;
use chrono::NaiveDate;

pub trait NavPort {
    /// Full validated history of one instrument.
    fn fetch_nav(&self, code: &str) -> Result<NavSeries, FundgridError>;

    /// Every instrument code the source can serve, sorted.
    fn list_codes(&self) -> Result<Vec<String>, FundgridError>;

    /// First date, last date and row count, or `None` when the instrument
    /// has no rows.
    fn data_range(&self, code: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, FundgridError>;
}
