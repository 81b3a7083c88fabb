//! Daily price bar representation.

use crate::domain::error::TradeSignalError;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One trading day for a single symbol. Prices are fixed-point decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub adjusted_close: Decimal,
    pub volume: u64,
}

/// Latest known close for a symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub date: NaiveDate,
    pub price: Decimal,
}

impl Bar {
    pub fn quote(&self) -> PriceQuote {
        PriceQuote {
            date: self.date,
            price: self.close,
        }
    }
}

/// Rejects sequences whose dates are not strictly ascending (which also
/// rules out duplicate dates).
pub fn ensure_ascending(bars: &[Bar]) -> Result<(), TradeSignalError> {
    for pair in bars.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(TradeSignalError::UnorderedBars {
                symbol: pair[1].symbol.clone(),
                date: pair[1].date,
            });
        }
    }
    Ok(())
}

pub fn closes(bars: &[Bar]) -> Vec<Decimal> {
    bars.iter().map(|b| b.close).collect()
}
