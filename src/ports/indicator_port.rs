//! Indicator persistence port trait.

use crate::domain::error::TradeSignalError;
use crate::domain::indicator::IndicatorPoint;
use chrono::NaiveDate;

pub trait IndicatorPort {
    /// Upserts on (symbol, date, name); a later run overwrites earlier values.
    fn save_batch(&self, points: &[IndicatorPoint]) -> Result<(), TradeSignalError>;

    /// Most recent point by date for `symbol` and indicator `name`.
    fn latest(&self, symbol: &str, name: &str) -> Result<Option<IndicatorPoint>, TradeSignalError>;

    /// Most recent point dated on or before `as_of`.
    fn latest_as_of(
        &self,
        symbol: &str,
        name: &str,
        as_of: NaiveDate,
    ) -> Result<Option<IndicatorPoint>, TradeSignalError> {
        Ok(self.find_between(symbol, name, NaiveDate::MIN, as_of)?.pop())
    }

    fn find_between(
        &self,
        symbol: &str,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IndicatorPoint>, TradeSignalError>;

    fn delete_symbol(&self, symbol: &str) -> Result<usize, TradeSignalError>;
}
