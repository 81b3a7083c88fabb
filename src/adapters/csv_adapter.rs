//! CSV file data adapter.
//!
//! One file per symbol, `<dir>/<SYMBOL>.csv`, with header
//! `date,open,high,low,close,adjusted_close,volume`. The `adjusted_close`
//! column may be missing or blank, in which case the close is used.

use crate::domain::bar::{Bar, PriceQuote, ensure_ascending};
use crate::domain::error::TradeSignalError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

/// Prices are read as text so they parse exactly, never through a float.
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    adjusted_close: Option<String>,
    volume: u64,
}

/// Prices must be nonnegative decimals.
fn parse_price(raw: &str, column: &str, at: &str) -> Result<Decimal, TradeSignalError> {
    let invalid = |why: String| TradeSignalError::Database {
        reason: format!("{at}: invalid {column} '{raw}': {why}"),
    };
    let price = raw.parse::<Decimal>().map_err(|e| invalid(e.to_string()))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(invalid("price is negative".to_string()));
    }
    Ok(price)
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Every bar in the symbol's file, sorted ascending. A missing file is
    /// `NoData`; duplicate dates are `UnorderedBars`.
    pub fn read_bars(&self, symbol: &str) -> Result<Vec<Bar>, TradeSignalError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(TradeSignalError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|e| TradeSignalError::Database {
                reason: format!("{} row {}: {}", path.display(), line + 1, e),
            })?;
            let at = format!("{} row {}", path.display(), line + 1);
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
                TradeSignalError::Database {
                    reason: format!("{at}: invalid date '{}': {e}", row.date),
                }
            })?;
            let close = parse_price(&row.close, "close", &at)?;
            let adjusted_close = match row.adjusted_close.as_deref() {
                Some(raw) if !raw.is_empty() => parse_price(raw, "adjusted_close", &at)?,
                _ => close,
            };

            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open: parse_price(&row.open, "open", &at)?,
                high: parse_price(&row.high, "high", &at)?,
                low: parse_price(&row.low, "low", &at)?,
                close,
                adjusted_close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        ensure_ascending(&bars)?;
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TradeSignalError> {
        Ok(self
            .read_bars(symbol)?
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect())
    }

    fn latest_price(&self, symbol: &str) -> Result<Option<PriceQuote>, TradeSignalError> {
        match self.read_bars(symbol) {
            Ok(bars) => Ok(bars.last().map(Bar::quote)),
            Err(TradeSignalError::NoData { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn price_as_of(
        &self,
        symbol: &str,
        as_of: NaiveDate,
    ) -> Result<Option<PriceQuote>, TradeSignalError> {
        match self.read_bars(symbol) {
            Ok(bars) => Ok(bars
                .iter()
                .take_while(|b| b.date <= as_of)
                .last()
                .map(Bar::quote)),
            Err(TradeSignalError::NoData { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradeSignalError> {
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradeSignalError> {
        let bars = match self.read_bars(symbol) {
            Ok(bars) => bars,
            Err(TradeSignalError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
