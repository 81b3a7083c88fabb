//! Symbol universe: parsing the configured list and checking which symbols
//! have enough stored history to score.

use crate::domain::error::TradeSignalError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Bars needed before the shortest scorer input (SMA 20) exists.
pub const MIN_BARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    pub symbols: Vec<String>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Splits a comma list, trimming and upper-casing each symbol.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolCoverage {
    pub symbol: String,
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub bars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
    LookupFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct UniverseValidationResult {
    pub universe: Universe,
    pub coverage: Vec<SymbolCoverage>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Keeps the symbols with at least [`MIN_BARS`] stored bars. Fails only when
/// no symbol survives.
pub fn validate_universe(
    data_port: &dyn DataPort,
    symbols: Vec<String>,
) -> Result<UniverseValidationResult, TradeSignalError> {
    let mut valid = Vec::new();
    let mut coverage = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let reason = match data_port.get_data_range(&symbol) {
            Ok(Some((first, last, bars))) if bars >= MIN_BARS => {
                tracing::debug!(%symbol, bars, %first, %last, "symbol has enough data");
                coverage.push(SymbolCoverage {
                    symbol: symbol.clone(),
                    first,
                    last,
                    bars,
                });
                valid.push(symbol);
                continue;
            }
            Ok(Some((_, _, bars))) => SkipReason::InsufficientBars { bars },
            Ok(None) => SkipReason::NoData,
            Err(e) => SkipReason::LookupFailed(e.to_string()),
        };

        tracing::warn!(%symbol, ?reason, "skipping symbol");
        skipped.push(SkippedSymbol { symbol, reason });
    }

    if valid.is_empty() {
        return Err(TradeSignalError::NoData {
            symbol: "all symbols".to_string(),
        });
    }

    if !skipped.is_empty() {
        tracing::info!(
            kept = valid.len(),
            total = valid.len() + skipped.len(),
            "universe reduced"
        );
    }

    Ok(UniverseValidationResult {
        universe: Universe { symbols: valid },
        coverage,
        skipped,
    })
}
