//! Technical indicator implementations.
//!
//! This module provides types for representing indicator output:
//! - `IndicatorPoint`: A single computed value, keyed by (symbol, date, name)
//! - `IndicatorMetadata`: Sub-series carried by multi-component indicators
//! - `Indicator`: The calculate/name/minimum-window contract
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use ema::{Ema, ema_series};
pub use macd::{Crossover, Macd, MacdComponents};
pub use rsi::{Rsi, RsiZone};
pub use sma::Sma;

use crate::domain::bar::Bar;
use crate::domain::error::TradeSignalError;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scale used for moving-average style values.
pub const VALUE_SCALE: u32 = 6;
/// Scale used for smoothing factors, seeds and running averages.
pub const INTERMEDIATE_SCALE: u32 = 10;

/// Round to `dp` fractional digits, ties away from zero.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IndicatorMetadata {
    Macd(MacdComponents),
}

impl IndicatorMetadata {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub name: String,
    pub value: Decimal,
    pub metadata: Option<IndicatorMetadata>,
}

impl IndicatorPoint {
    pub fn new(symbol: &str, date: NaiveDate, name: &str, value: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            date,
            name: name.to_string(),
            value,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: IndicatorMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Shared contract across indicator kinds. Implementations validate their
/// parameters when constructed and keep no state between calls.
pub trait Indicator {
    /// Persisted name, e.g. `EMA_12`.
    fn name(&self) -> String;

    /// Fewest bars `calculate` accepts.
    fn min_bars(&self) -> usize;

    fn calculate(&self, bars: &[Bar]) -> Result<Vec<IndicatorPoint>, TradeSignalError>;
}

pub(crate) fn require_bars(
    indicator: &str,
    bars: &[Bar],
    minimum: usize,
) -> Result<(), TradeSignalError> {
    if bars.len() < minimum {
        return Err(TradeSignalError::InsufficientData {
            indicator: indicator.to_string(),
            symbol: bars.first().map(|b| b.symbol.clone()).unwrap_or_default(),
            bars: bars.len(),
            minimum,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl IndicatorType {
    pub fn build(&self) -> Result<Box<dyn Indicator>, TradeSignalError> {
        Ok(match *self {
            IndicatorType::Sma(window) => Box::new(Sma::new(window)?),
            IndicatorType::Ema(window) => Box::new(Ema::new(window)?),
            IndicatorType::Rsi(period) => Box::new(Rsi::new(period)?),
            IndicatorType::Macd { fast, slow, signal } => Box::new(Macd::new(fast, slow, signal)?),
        })
    }
}

/// Indicators computed for every symbol on each run.
pub fn standard_indicators() -> Vec<IndicatorType> {
    vec![
        IndicatorType::Sma(20),
        IndicatorType::Sma(50),
        IndicatorType::Sma(200),
        IndicatorType::Ema(12),
        IndicatorType::Ema(26),
        IndicatorType::Ema(50),
        IndicatorType::Macd {
            fast: macd::DEFAULT_FAST,
            slow: macd::DEFAULT_SLOW,
            signal: macd::DEFAULT_SIGNAL,
        },
        IndicatorType::Rsi(rsi::DEFAULT_PERIOD),
    ]
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(window) => write!(f, "SMA_{}", window),
            IndicatorType::Ema(window) => write!(f, "EMA_{}", window),
            IndicatorType::Rsi(period) => write!(f, "RSI_{}", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD_{}_{}_{}", fast, slow, signal)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised indicator name: {0}")]
pub struct UnknownIndicator(pub String);

impl FromStr for IndicatorType {
    type Err = UnknownIndicator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownIndicator(s.to_string());
        let mut parts = s.trim().split('_');
        let kind = parts.next().ok_or_else(unknown)?;
        let params: Vec<usize> = parts
            .map(|p| p.parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|_| unknown())?;

        match (kind.to_uppercase().as_str(), params.as_slice()) {
            ("SMA", [w]) => Ok(IndicatorType::Sma(*w)),
            ("EMA", [w]) => Ok(IndicatorType::Ema(*w)),
            ("RSI", [p]) => Ok(IndicatorType::Rsi(*p)),
            ("MACD", [fast, slow, signal]) => Ok(IndicatorType::Macd {
                fast: *fast,
                slow: *slow,
                signal: *signal,
            }),
            _ => Err(unknown()),
        }
    }
}
