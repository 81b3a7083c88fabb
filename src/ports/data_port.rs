//! Market data access port trait.

use crate::domain::bar::{Bar, PriceQuote};
use crate::domain::error::TradeSignalError;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` within `[start_date, end_date]`, ascending by date.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TradeSignalError>;

    fn latest_price(&self, symbol: &str) -> Result<Option<PriceQuote>, TradeSignalError>;

    /// Close of the last bar dated on or before `as_of`.
    fn price_as_of(
        &self,
        symbol: &str,
        as_of: NaiveDate,
    ) -> Result<Option<PriceQuote>, TradeSignalError> {
        Ok(self
            .fetch_bars(symbol, NaiveDate::MIN, as_of)?
            .last()
            .map(Bar::quote))
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradeSignalError>;

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradeSignalError>;
}
