//! Latest-value snapshot of the indicators the scorer reads.

use crate::domain::error::TradeSignalError;
use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::indicator::rsi::DEFAULT_PERIOD;
use crate::domain::indicator::{IndicatorPoint, IndicatorType, RsiZone};
use crate::ports::indicator_port::IndicatorPort;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;

pub const SMA_SHORT: IndicatorType = IndicatorType::Sma(20);
pub const SMA_MEDIUM: IndicatorType = IndicatorType::Sma(50);
pub const SMA_LONG: IndicatorType = IndicatorType::Sma(200);
pub const RSI: IndicatorType = IndicatorType::Rsi(DEFAULT_PERIOD);
pub const MACD: IndicatorType = IndicatorType::Macd {
    fast: DEFAULT_FAST,
    slow: DEFAULT_SLOW,
    signal: DEFAULT_SIGNAL,
};

/// Each field is the latest persisted point, or `None` when nothing has been
/// stored for it yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSummary {
    pub symbol: String,
    pub sma20: Option<IndicatorPoint>,
    pub sma50: Option<IndicatorPoint>,
    pub sma200: Option<IndicatorPoint>,
    pub rsi: Option<IndicatorPoint>,
    pub macd: Option<IndicatorPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendSignal {
    Bullish,
    Bearish,
    Neutral,
    InsufficientData,
}

impl fmt::Display for TrendSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendSignal::Bullish => write!(f, "BULLISH"),
            TrendSignal::Bearish => write!(f, "BEARISH"),
            TrendSignal::Neutral => write!(f, "NEUTRAL"),
            TrendSignal::InsufficientData => write!(f, "INSUFFICIENT_DATA"),
        }
    }
}

impl IndicatorSummary {
    /// Looks up the five scorer inputs. Returns `None` when none of them has
    /// a stored value.
    pub fn load(
        port: &dyn IndicatorPort,
        symbol: &str,
    ) -> Result<Option<IndicatorSummary>, TradeSignalError> {
        Self::load_with(symbol, |name| port.latest(symbol, name))
    }

    /// Like [`IndicatorSummary::load`], ignoring points dated after `as_of`.
    pub fn load_as_of(
        port: &dyn IndicatorPort,
        symbol: &str,
        as_of: NaiveDate,
    ) -> Result<Option<IndicatorSummary>, TradeSignalError> {
        Self::load_with(symbol, |name| port.latest_as_of(symbol, name, as_of))
    }

    fn load_with<F>(symbol: &str, lookup: F) -> Result<Option<IndicatorSummary>, TradeSignalError>
    where
        F: Fn(&str) -> Result<Option<IndicatorPoint>, TradeSignalError>,
    {
        let latest = |kind: IndicatorType| lookup(&kind.to_string());

        let summary = IndicatorSummary {
            symbol: symbol.to_string(),
            sma20: latest(SMA_SHORT)?,
            sma50: latest(SMA_MEDIUM)?,
            sma200: latest(SMA_LONG)?,
            rsi: latest(RSI)?,
            macd: latest(MACD)?,
        };

        if summary.is_empty() {
            Ok(None)
        } else {
            Ok(Some(summary))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sma20.is_none()
            && self.sma50.is_none()
            && self.sma200.is_none()
            && self.rsi.is_none()
            && self.macd.is_none()
    }

    pub fn sma20_value(&self) -> Option<Decimal> {
        self.sma20.as_ref().map(|p| p.value)
    }

    pub fn sma50_value(&self) -> Option<Decimal> {
        self.sma50.as_ref().map(|p| p.value)
    }

    pub fn sma200_value(&self) -> Option<Decimal> {
        self.sma200.as_ref().map(|p| p.value)
    }

    pub fn rsi_value(&self) -> Option<Decimal> {
        self.rsi.as_ref().map(|p| p.value)
    }

    /// MACD histogram (the stored primary value).
    pub fn macd_histogram(&self) -> Option<Decimal> {
        self.macd.as_ref().map(|p| p.value)
    }

    /// SMA20 above SMA50 is bullish, below is bearish.
    pub fn trend_signal(&self) -> TrendSignal {
        match (self.sma20_value(), self.sma50_value()) {
            (Some(short), Some(medium)) if short > medium => TrendSignal::Bullish,
            (Some(short), Some(medium)) if short < medium => TrendSignal::Bearish,
            (Some(_), Some(_)) => TrendSignal::Neutral,
            _ => TrendSignal::InsufficientData,
        }
    }

    pub fn rsi_signal(&self) -> Option<RsiZone> {
        self.rsi_value().map(RsiZone::interpret)
    }
}
