//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n deltas
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Needs n+1 bars; the first point is emitted at index n.

use crate::domain::bar::Bar;
use crate::domain::error::TradeSignalError;
use crate::domain::indicator::{
    INTERMEDIATE_SCALE, Indicator, IndicatorPoint, IndicatorType, require_bars, round_half_up,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;

pub const DEFAULT_PERIOD: usize = 14;

const OVERBOUGHT: Decimal = dec!(70);
const OVERSOLD: Decimal = dec!(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, TradeSignalError> {
        if period < 2 {
            return Err(TradeSignalError::configuration(
                IndicatorType::Rsi(period).to_string(),
                "RSI period must be at least 2",
            ));
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> String {
        IndicatorType::Rsi(self.period).to_string()
    }

    fn min_bars(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, bars: &[Bar]) -> Result<Vec<IndicatorPoint>, TradeSignalError> {
        let name = self.name();
        require_bars(&name, bars, self.min_bars())?;

        let mut gains = Vec::with_capacity(bars.len() - 1);
        let mut losses = Vec::with_capacity(bars.len() - 1);
        for pair in bars.windows(2) {
            let change = pair[1].close - pair[0].close;
            if change > Decimal::ZERO {
                gains.push(change);
                losses.push(Decimal::ZERO);
            } else {
                gains.push(Decimal::ZERO);
                losses.push(change.abs());
            }
        }

        let n = Decimal::from(self.period);
        let n_minus_one = Decimal::from(self.period - 1);

        let mut avg_gain = mean(&gains[..self.period]);
        let mut avg_loss = mean(&losses[..self.period]);

        let mut values = Vec::with_capacity(bars.len() - self.period);
        let first = &bars[self.period];
        values.push(IndicatorPoint::new(
            &first.symbol,
            first.date,
            &name,
            rsi_from_averages(avg_gain, avg_loss),
        ));

        for i in self.period..gains.len() {
            avg_gain = round_half_up((avg_gain * n_minus_one + gains[i]) / n, INTERMEDIATE_SCALE);
            avg_loss = round_half_up((avg_loss * n_minus_one + losses[i]) / n, INTERMEDIATE_SCALE);

            // deltas are offset by one from the bars
            let bar = &bars[i + 1];
            values.push(IndicatorPoint::new(
                &bar.symbol,
                bar.date,
                &name,
                rsi_from_averages(avg_gain, avg_loss),
            ));
        }

        Ok(values)
    }
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = values.iter().copied().sum();
    round_half_up(sum / Decimal::from(values.len()), INTERMEDIATE_SCALE)
}

/// RSI on a 0-100 scale, rounded to 2 digits. A zero average loss is 100 by
/// definition.
pub fn rsi_from_averages(avg_gain: Decimal, avg_loss: Decimal) -> Decimal {
    if avg_loss.is_zero() {
        return Decimal::ONE_HUNDRED;
    }
    let rs = round_half_up(avg_gain / avg_loss, INTERMEDIATE_SCALE);
    let rsi = Decimal::ONE_HUNDRED
        - round_half_up(Decimal::ONE_HUNDRED / (Decimal::ONE + rs), INTERMEDIATE_SCALE);
    round_half_up(rsi, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    /// Above 70 is overbought, below 30 oversold.
    pub fn interpret(rsi: Decimal) -> Self {
        if rsi > OVERBOUGHT {
            RsiZone::Overbought
        } else if rsi < OVERSOLD {
            RsiZone::Oversold
        } else {
            RsiZone::Neutral
        }
    }
}

impl fmt::Display for RsiZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsiZone::Overbought => write!(f, "OVERBOUGHT"),
            RsiZone::Oversold => write!(f, "OVERSOLD"),
            RsiZone::Neutral => write!(f, "NEUTRAL"),
        }
    }
}
