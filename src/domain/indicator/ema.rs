//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with the SMA of the first n values, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k), rounded to 6 digits at every step.
//! The first point is emitted at index n-1.

use crate::domain::bar::{Bar, closes};
use crate::domain::error::TradeSignalError;
use crate::domain::indicator::{
    INTERMEDIATE_SCALE, Indicator, IndicatorPoint, IndicatorType, VALUE_SCALE, require_bars,
    round_half_up,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ema {
    window: usize,
}

impl Ema {
    pub fn new(window: usize) -> Result<Self, TradeSignalError> {
        if window < 2 {
            return Err(TradeSignalError::configuration(
                IndicatorType::Ema(window).to_string(),
                "EMA window must be at least 2",
            ));
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Indicator for Ema {
    fn name(&self) -> String {
        IndicatorType::Ema(self.window).to_string()
    }

    fn min_bars(&self) -> usize {
        self.window
    }

    fn calculate(&self, bars: &[Bar]) -> Result<Vec<IndicatorPoint>, TradeSignalError> {
        let name = self.name();
        require_bars(&name, bars, self.window)?;

        let series = ema_series(&closes(bars), self.window);
        Ok(bars[self.window - 1..]
            .iter()
            .zip(series)
            .map(|(bar, value)| IndicatorPoint::new(&bar.symbol, bar.date, &name, value))
            .collect())
    }
}

/// Smoothing factor 2/(n+1), held at 10 digits.
pub fn smoothing_factor(window: usize) -> Decimal {
    round_half_up(dec!(2) / Decimal::from(window + 1), INTERMEDIATE_SCALE)
}

/// EMA over an arbitrary value series. Element 0 of the result corresponds to
/// input index `window - 1`. Returns an empty vector when `values` is shorter
/// than `window`.
///
/// Every step is rounded before it feeds the next one, so rounding error
/// compounds along the series. Historical outputs depend on this.
pub fn ema_series(values: &[Decimal], window: usize) -> Vec<Decimal> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }

    let alpha = smoothing_factor(window);
    let retain = Decimal::ONE - alpha;

    let seed_sum: Decimal = values[..window].iter().copied().sum();
    let mut ema = round_half_up(seed_sum / Decimal::from(window), INTERMEDIATE_SCALE);

    let mut out = Vec::with_capacity(values.len() - window + 1);
    out.push(ema);
    for &value in &values[window..] {
        ema = round_half_up(value * alpha + ema * retain, VALUE_SCALE);
        out.push(ema);
    }
    out
}
