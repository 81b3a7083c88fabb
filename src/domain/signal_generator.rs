//! Scores the latest stored indicators for a set of symbols.

use crate::domain::error::TradeSignalError;
use crate::domain::signal::{Signal, SignalType, score_signal};
use crate::domain::summary::IndicatorSummary;
use crate::ports::data_port::DataPort;
use crate::ports::indicator_port::IndicatorPort;
use chrono::NaiveDate;

pub struct SignalGenerator<'a> {
    data: &'a dyn DataPort,
    store: &'a dyn IndicatorPort,
    as_of: Option<NaiveDate>,
}

impl<'a> SignalGenerator<'a> {
    pub fn new(data: &'a dyn DataPort, store: &'a dyn IndicatorPort) -> Self {
        Self {
            data,
            store,
            as_of: None,
        }
    }

    /// Scores as of `as_of`: indicators and price come from the last stored
    /// values dated on or before it.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Fails with `NoPrice` when the symbol has no stored bar. Missing
    /// indicators do not fail; they score as zero.
    pub fn generate_signal(&self, symbol: &str) -> Result<Signal, TradeSignalError> {
        let (summary, quote) = match self.as_of {
            Some(as_of) => (
                IndicatorSummary::load_as_of(self.store, symbol, as_of)?,
                self.data.price_as_of(symbol, as_of)?,
            ),
            None => (
                IndicatorSummary::load(self.store, symbol)?,
                self.data.latest_price(symbol)?,
            ),
        };
        let quote = quote.ok_or_else(|| TradeSignalError::NoPrice {
            symbol: symbol.to_string(),
        })?;

        Ok(score_signal(symbol, summary.as_ref(), quote.price, quote.date))
    }

    /// Signals for every symbol that could be scored, in input order.
    pub fn generate_signals(&self, symbols: &[String]) -> Vec<Signal> {
        tracing::info!(count = symbols.len(), "generating signals");

        let mut signals = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.generate_signal(symbol) {
                Ok(signal) => {
                    tracing::info!(
                        symbol = %symbol,
                        signal = %signal.signal_type,
                        score = signal.score,
                        strength = %signal.strength,
                        "scored"
                    );
                    signals.push(signal);
                }
                Err(e) => {
                    tracing::error!(symbol = %symbol, error = %e, "failed to generate signal");
                }
            }
        }
        signals
    }
}

/// BUY signals, best score first, at most `limit`.
pub fn top_buy_signals(signals: &[Signal], limit: usize) -> Vec<Signal> {
    let mut buys: Vec<Signal> = signals
        .iter()
        .filter(|s| s.signal_type == SignalType::Buy)
        .cloned()
        .collect();
    buys.sort_by(|a, b| b.score.cmp(&a.score));
    buys.truncate(limit);
    buys
}

/// Signals scoring at least the buy threshold, best first.
pub fn tradeable_signals(signals: &[Signal]) -> Vec<Signal> {
    let mut tradeable: Vec<Signal> = signals.iter().filter(|s| s.is_tradeable()).cloned().collect();
    tradeable.sort_by(|a, b| b.score.cmp(&a.score));
    tradeable
}
