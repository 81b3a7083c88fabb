#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::HashMap;
use tradesignal::domain::bar::{Bar, PriceQuote};
use tradesignal::domain::error::TradeSignalError;
use tradesignal::domain::indicator::IndicatorPoint;
use tradesignal::ports::data_port::DataPort;
use tradesignal::ports::indicator_port::IndicatorPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<(), TradeSignalError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(TradeSignalError::DatabaseQuery {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TradeSignalError> {
        self.check(symbol)?;
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn latest_price(&self, symbol: &str) -> Result<Option<PriceQuote>, TradeSignalError> {
        self.check(symbol)?;
        Ok(self
            .data
            .get(symbol)
            .and_then(|bars| bars.last())
            .map(Bar::quote))
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradeSignalError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradeSignalError> {
        self.check(symbol)?;
        Ok(self.data.get(symbol).and_then(|bars| {
            let first = bars.first()?;
            let last = bars.last()?;
            Some((first.date, last.date, bars.len()))
        }))
    }
}

/// In-memory indicator store with the same upsert key as the database.
pub struct MockIndicatorPort {
    pub points: RefCell<Vec<IndicatorPoint>>,
    pub fail_saves: bool,
}

impl MockIndicatorPort {
    pub fn new() -> Self {
        Self {
            points: RefCell::new(Vec::new()),
            fail_saves: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            points: RefCell::new(Vec::new()),
            fail_saves: true,
        }
    }

    pub fn with_point(self, point: IndicatorPoint) -> Self {
        self.points.borrow_mut().push(point);
        self
    }

    pub fn stored(&self, symbol: &str, name: &str) -> Vec<IndicatorPoint> {
        self.points
            .borrow()
            .iter()
            .filter(|p| p.symbol == symbol && p.name == name)
            .cloned()
            .collect()
    }
}

impl IndicatorPort for MockIndicatorPort {
    fn save_batch(&self, points: &[IndicatorPoint]) -> Result<(), TradeSignalError> {
        if self.fail_saves {
            return Err(TradeSignalError::Database {
                reason: "store unavailable".into(),
            });
        }
        let mut stored = self.points.borrow_mut();
        for point in points {
            stored.retain(|p| {
                !(p.symbol == point.symbol && p.date == point.date && p.name == point.name)
            });
            stored.push(point.clone());
        }
        Ok(())
    }

    fn latest(&self, symbol: &str, name: &str) -> Result<Option<IndicatorPoint>, TradeSignalError> {
        Ok(self
            .points
            .borrow()
            .iter()
            .filter(|p| p.symbol == symbol && p.name == name)
            .max_by_key(|p| p.date)
            .cloned())
    }

    fn find_between(
        &self,
        symbol: &str,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IndicatorPoint>, TradeSignalError> {
        let mut found: Vec<IndicatorPoint> = self
            .stored(symbol, name)
            .into_iter()
            .filter(|p| p.date >= start_date && p.date <= end_date)
            .collect();
        found.sort_by_key(|p| p.date);
        Ok(found)
    }

    fn delete_symbol(&self, symbol: &str) -> Result<usize, TradeSignalError> {
        let mut stored = self.points.borrow_mut();
        let before = stored.len();
        stored.retain(|p| p.symbol != symbol);
        Ok(before - stored.len())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, date: NaiveDate, close: Decimal) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        date,
        open: close,
        high: close + Decimal::ONE,
        low: close - Decimal::ONE,
        close,
        adjusted_close: close,
        volume: 1000,
    }
}

/// Consecutive daily bars from `start`, close moving by `step` per day.
pub fn generate_bars(
    symbol: &str,
    start: NaiveDate,
    count: usize,
    start_price: Decimal,
    step: Decimal,
) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            make_bar(
                symbol,
                start + chrono::Duration::days(i as i64),
                start_price + step * Decimal::from(i),
            )
        })
        .collect()
}

/// Last date of a series built by [`generate_bars`].
pub fn last_date(start: NaiveDate, count: usize) -> NaiveDate {
    start + chrono::Duration::days(count as i64 - 1)
}
