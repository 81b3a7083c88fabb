//! Simple Moving Average indicator.
//!
//! SMA[i] = (C[i-n+1] + ... + C[i]) / n, rounded to 6 digits.
//! The first point is emitted at index n-1.

use crate::domain::bar::Bar;
use crate::domain::error::TradeSignalError;
use crate::domain::indicator::{
    Indicator, IndicatorPoint, IndicatorType, VALUE_SCALE, require_bars, round_half_up,
};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sma {
    window: usize,
}

impl Sma {
    pub fn new(window: usize) -> Result<Self, TradeSignalError> {
        if window < 2 {
            return Err(TradeSignalError::configuration(
                IndicatorType::Sma(window).to_string(),
                "SMA window must be at least 2",
            ));
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Indicator for Sma {
    fn name(&self) -> String {
        IndicatorType::Sma(self.window).to_string()
    }

    fn min_bars(&self) -> usize {
        self.window
    }

    fn calculate(&self, bars: &[Bar]) -> Result<Vec<IndicatorPoint>, TradeSignalError> {
        let name = self.name();
        require_bars(&name, bars, self.window)?;

        let divisor = Decimal::from(self.window);
        let mut values = Vec::with_capacity(bars.len() + 1 - self.window);
        let mut sum = Decimal::ZERO;

        for (i, bar) in bars.iter().enumerate() {
            sum += bar.close;
            if i >= self.window {
                sum -= bars[i - self.window].close;
            }
            if i + 1 >= self.window {
                values.push(IndicatorPoint::new(
                    &bar.symbol,
                    bar.date,
                    &name,
                    round_half_up(sum / divisor, VALUE_SCALE),
                ));
            }
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn make_bars(prices: &[Decimal]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: "TEST".into(),
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                adjusted_close: close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn sma_starts_at_window_minus_one() {
        let bars = make_bars(&[dec!(10), dec!(20), dec!(30), dec!(40), dec!(50)]);
        let points = Sma::new(3).unwrap().calculate(&bars).unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, bars[2].date);
        assert_eq!(points[0].value, dec!(20));
        assert_eq!(points[1].value, dec!(30));
        assert_eq!(points[2].value, dec!(40));
        assert!(points.iter().all(|p| p.name == "SMA_3" && p.symbol == "TEST"));
    }

    #[test]
    fn sma_rounds_half_up_to_six_digits() {
        // (1 + 1 + 2) / 3 = 1.3333333... -> 1.333333
        let bars = make_bars(&[dec!(1), dec!(1), dec!(2)]);
        let points = Sma::new(3).unwrap().calculate(&bars).unwrap();
        assert_eq!(points[0].value, dec!(1.333333));

        // (0.0000005 + 0.0000005) / 2 = 0.0000005 -> 0.000001
        let bars = make_bars(&[dec!(0.0000005), dec!(0.0000005)]);
        let points = Sma::new(2).unwrap().calculate(&bars).unwrap();
        assert_eq!(points[0].value, dec!(0.000001));
    }

    #[test]
    fn sma_exact_window_yields_single_point() {
        let bars = make_bars(&[dec!(10), dec!(11)]);
        let points = Sma::new(2).unwrap().calculate(&bars).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, dec!(10.5));
    }

    #[test]
    fn sma_insufficient_data() {
        let bars = make_bars(&[dec!(10), dec!(11)]);
        match Sma::new(3).unwrap().calculate(&bars) {
            Err(TradeSignalError::InsufficientData {
                indicator,
                symbol,
                bars,
                minimum,
            }) => {
                assert_eq!(indicator, "SMA_3");
                assert_eq!(symbol, "TEST");
                assert_eq!(bars, 2);
                assert_eq!(minimum, 3);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn sma_window_below_two_rejected() {
        assert!(matches!(
            Sma::new(1),
            Err(TradeSignalError::Configuration { .. })
        ));
        assert!(Sma::new(0).is_err());
    }

    #[test]
    fn sma_is_idempotent() {
        let bars = make_bars(&[dec!(10.1), dec!(10.7), dec!(9.9), dec!(11.3), dec!(12.05)]);
        let sma = Sma::new(3).unwrap();
        assert_eq!(sma.calculate(&bars).unwrap(), sma.calculate(&bars).unwrap());
    }

    proptest! {
        #[test]
        fn sma_equals_closed_form_mean(
            cents in proptest::collection::vec(1i64..10_000_000, 2..60),
            window in 2usize..20,
        ) {
            prop_assume!(cents.len() >= window);
            let prices: Vec<Decimal> = cents.iter().map(|&c| Decimal::new(c, 2)).collect();
            let bars = make_bars(&prices);
            let points = Sma::new(window).unwrap().calculate(&bars).unwrap();

            prop_assert_eq!(points.len(), prices.len() - window + 1);
            for (k, point) in points.iter().enumerate() {
                let slice = &prices[k..k + window];
                let sum: Decimal = slice.iter().copied().sum();
                let expected = round_half_up(sum / Decimal::from(window), 6);
                prop_assert_eq!(point.value, expected);
            }
        }
    }
}
