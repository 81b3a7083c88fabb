//! Computes the standard indicator set per symbol and persists it.

use crate::domain::bar::ensure_ascending;
use crate::domain::config_validation::DEFAULT_LOOKBACK_DAYS;
use crate::domain::error::TradeSignalError;
use crate::domain::indicator::{IndicatorType, standard_indicators};
use crate::domain::summary::IndicatorSummary;
use crate::ports::data_port::DataPort;
use crate::ports::indicator_port::IndicatorPort;
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorOutcome {
    Stored { points: usize },
    Skipped { have: usize, need: usize },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRunReport {
    pub symbol: String,
    pub bars: usize,
    pub outcomes: Vec<(String, IndicatorOutcome)>,
}

impl IndicatorRunReport {
    pub fn points_stored(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                IndicatorOutcome::Stored { points } => *points,
                _ => 0,
            })
            .sum()
    }

    pub fn outcome(&self, name: &str) -> Option<&IndicatorOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<IndicatorRunReport>,
    pub failed: Vec<(String, TradeSignalError)>,
}

pub struct IndicatorService<'a> {
    data: &'a dyn DataPort,
    store: &'a dyn IndicatorPort,
    indicators: Vec<IndicatorType>,
    lookback_days: i64,
}

impl<'a> IndicatorService<'a> {
    pub fn new(data: &'a dyn DataPort, store: &'a dyn IndicatorPort) -> Self {
        Self {
            data,
            store,
            indicators: standard_indicators(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_indicators(mut self, indicators: Vec<IndicatorType>) -> Self {
        self.indicators = indicators;
        self
    }

    /// Calculates every configured indicator over the bars in
    /// `[as_of - lookback_days, as_of]` and stores the results.
    ///
    /// Indicators that need more bars than are available are skipped, and
    /// one indicator failing does not stop the others. Errors are returned
    /// only for data access and storage problems.
    pub fn calculate_and_store(
        &self,
        symbol: &str,
        as_of: NaiveDate,
    ) -> Result<IndicatorRunReport, TradeSignalError> {
        tracing::info!(symbol, %as_of, "calculating indicators");

        let start = Duration::try_days(self.lookback_days)
            .and_then(|lookback| as_of.checked_sub_signed(lookback))
            .ok_or_else(|| TradeSignalError::ConfigInvalid {
                section: "universe".to_string(),
                key: "lookback_days".to_string(),
                reason: format!("{} days before {as_of} is out of range", self.lookback_days),
            })?;
        let bars = self.data.fetch_bars(symbol, start, as_of)?;
        let mut report = IndicatorRunReport {
            symbol: symbol.to_string(),
            bars: bars.len(),
            outcomes: Vec::with_capacity(self.indicators.len()),
        };

        if bars.is_empty() {
            tracing::warn!(symbol, "no market data found");
            return Ok(report);
        }
        ensure_ascending(&bars)?;
        tracing::debug!(symbol, bars = bars.len(), "loaded bars");

        for kind in &self.indicators {
            let name = kind.to_string();
            let outcome = match kind.build() {
                Err(e) => {
                    tracing::error!(symbol, indicator = %name, error = %e, "invalid indicator");
                    IndicatorOutcome::Failed(e.to_string())
                }
                Ok(indicator) if bars.len() < indicator.min_bars() => {
                    tracing::warn!(
                        symbol,
                        indicator = %name,
                        need = indicator.min_bars(),
                        have = bars.len(),
                        "not enough data, skipping indicator"
                    );
                    IndicatorOutcome::Skipped {
                        have: bars.len(),
                        need: indicator.min_bars(),
                    }
                }
                Ok(indicator) => match indicator.calculate(&bars) {
                    Ok(points) => {
                        self.store.save_batch(&points)?;
                        tracing::info!(symbol, indicator = %name, values = points.len(), "stored");
                        IndicatorOutcome::Stored {
                            points: points.len(),
                        }
                    }
                    Err(e) => {
                        tracing::error!(symbol, indicator = %name, error = %e, "calculation failed");
                        IndicatorOutcome::Failed(e.to_string())
                    }
                },
            };
            report.outcomes.push((name, outcome));
        }

        Ok(report)
    }

    /// Runs [`calculate_and_store`](Self::calculate_and_store) for each
    /// symbol. A failing symbol is recorded and the rest continue.
    pub fn calculate_for_symbols(&self, symbols: &[String], as_of: NaiveDate) -> BatchReport {
        let mut batch = BatchReport::default();
        for symbol in symbols {
            match self.calculate_and_store(symbol, as_of) {
                Ok(report) => batch.completed.push(report),
                Err(e) => {
                    if e.is_data_error() {
                        tracing::warn!(symbol = %symbol, error = %e, "skipping symbol");
                    } else {
                        tracing::error!(symbol = %symbol, error = %e, "indicator run failed");
                    }
                    batch.failed.push((symbol.clone(), e));
                }
            }
        }
        batch
    }

    pub fn latest_summary(
        &self,
        symbol: &str,
    ) -> Result<Option<IndicatorSummary>, TradeSignalError> {
        IndicatorSummary::load(self.store, symbol)
    }
}
