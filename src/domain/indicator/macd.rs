//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow), aligned on date
//! Signal Line = EMA(signal) of MACD Line, seeded by its first `signal` values
//! Histogram = MACD Line - Signal Line, rounded to 6 digits
//!
//! The histogram is the stored value; all three components ride along as
//! metadata on the same point.
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Needs slow + signal bars; the first point is emitted at index slow + signal - 2.

use crate::domain::bar::Bar;
use crate::domain::error::TradeSignalError;
use crate::domain::indicator::{
    Indicator, IndicatorMetadata, IndicatorPoint, IndicatorType, VALUE_SCALE, ema_series,
    require_bars, round_half_up,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacdComponents {
    pub macd_line: Decimal,
    pub signal_line: Decimal,
    pub histogram: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    Bullish,
    Bearish,
}

impl MacdComponents {
    /// Histogram moved from negative to zero or above.
    pub fn is_bullish_crossover(&self, previous: &MacdComponents) -> bool {
        previous.histogram < Decimal::ZERO && self.histogram >= Decimal::ZERO
    }

    /// Histogram moved from zero or above to negative.
    pub fn is_bearish_crossover(&self, previous: &MacdComponents) -> bool {
        previous.histogram >= Decimal::ZERO && self.histogram < Decimal::ZERO
    }

    pub fn crossover(&self, previous: &MacdComponents) -> Option<Crossover> {
        if self.is_bullish_crossover(previous) {
            Some(Crossover::Bullish)
        } else if self.is_bearish_crossover(previous) {
            Some(Crossover::Bearish)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, TradeSignalError> {
        let name = IndicatorType::Macd { fast, slow, signal }.to_string();
        if fast >= slow {
            return Err(TradeSignalError::configuration(
                name,
                "fast period must be less than slow period",
            ));
        }
        if fast < 2 || signal < 2 {
            return Err(TradeSignalError::configuration(
                name,
                "MACD periods must be at least 2",
            ));
        }
        Ok(Self { fast, slow, signal })
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            signal: DEFAULT_SIGNAL,
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> String {
        IndicatorType::Macd {
            fast: self.fast,
            slow: self.slow,
            signal: self.signal,
        }
        .to_string()
    }

    fn min_bars(&self) -> usize {
        self.slow + self.signal
    }

    fn calculate(&self, bars: &[Bar]) -> Result<Vec<IndicatorPoint>, TradeSignalError> {
        let name = self.name();
        require_bars(&name, bars, self.min_bars())?;

        let fast = dated_ema(bars, self.fast);
        let slow = dated_ema(bars, self.slow);

        let aligned = align_by_date(&fast, &slow);
        let macd_line: Vec<Decimal> = aligned.iter().map(|(_, f, s)| f - s).collect();
        let signal_line = ema_series(&macd_line, self.signal);

        let symbol = &bars[0].symbol;
        let values = aligned[self.signal - 1..]
            .iter()
            .zip(&macd_line[self.signal - 1..])
            .zip(signal_line)
            .map(|(((date, _, _), &line), signal)| {
                let histogram = round_half_up(line - signal, VALUE_SCALE);
                let components = MacdComponents {
                    macd_line: round_half_up(line, VALUE_SCALE),
                    signal_line: round_half_up(signal, VALUE_SCALE),
                    histogram,
                };
                IndicatorPoint::new(symbol, *date, &name, histogram)
                    .with_metadata(IndicatorMetadata::Macd(components))
            })
            .collect();

        Ok(values)
    }
}

fn dated_ema(bars: &[Bar], window: usize) -> Vec<(NaiveDate, Decimal)> {
    let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
    bars[window - 1..]
        .iter()
        .map(|b| b.date)
        .zip(ema_series(&closes, window))
        .collect()
}

/// Pairs the two series on matching dates. Both series are ascending, the
/// slow one starting later, so the unmatched prefix of the fast one is
/// dropped.
fn align_by_date(
    fast: &[(NaiveDate, Decimal)],
    slow: &[(NaiveDate, Decimal)],
) -> Vec<(NaiveDate, Decimal, Decimal)> {
    let mut out = Vec::with_capacity(slow.len());
    let mut fi = 0;
    for &(date, slow_value) in slow {
        while fi < fast.len() && fast[fi].0 < date {
            fi += 1;
        }
        if fi < fast.len() && fast[fi].0 == date {
            out.push((date, fast[fi].1, slow_value));
        }
    }
    out
}

/// Components carried on a MACD point, if any.
pub fn macd_components(point: &IndicatorPoint) -> Option<MacdComponents> {
    match &point.metadata {
        Some(IndicatorMetadata::Macd(components)) => Some(*components),
        None => None,
    }
}

/// Crossovers across consecutive MACD points, dated on the later point.
pub fn crossovers(points: &[IndicatorPoint]) -> Vec<(NaiveDate, Crossover)> {
    points
        .windows(2)
        .filter_map(|pair| {
            let previous = macd_components(&pair[0])?;
            let current = macd_components(&pair[1])?;
            current.crossover(&previous).map(|c| (pair[1].date, c))
        })
        .collect()
}
