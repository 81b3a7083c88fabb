//! Domain error types.

/// Top-level error type for tradesignal.
#[derive(Debug, thiserror::Error)]
pub enum TradeSignalError {
    #[error("invalid {indicator} configuration: {reason}")]
    Configuration { indicator: String, reason: String },

    #[error("insufficient data for {indicator} on {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        indicator: String,
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("bars for {symbol} are not in strictly ascending date order at {date}")]
    UnorderedBars { symbol: String, date: chrono::NaiveDate },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("no price data for {symbol}")]
    NoPrice { symbol: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradeSignalError {
    pub fn configuration(indicator: impl Into<String>, reason: impl Into<String>) -> Self {
        TradeSignalError::Configuration {
            indicator: indicator.into(),
            reason: reason.into(),
        }
    }

    /// True for failures that only concern one symbol's data and should not
    /// stop a batch.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            TradeSignalError::InsufficientData { .. }
                | TradeSignalError::UnorderedBars { .. }
                | TradeSignalError::NoData { .. }
                | TradeSignalError::NoPrice { .. }
        )
    }
}

impl From<&TradeSignalError> for std::process::ExitCode {
    fn from(err: &TradeSignalError) -> Self {
        let code: u8 = match err {
            TradeSignalError::Io(_) => 1,
            TradeSignalError::ConfigParse { .. }
            | TradeSignalError::ConfigMissing { .. }
            | TradeSignalError::ConfigInvalid { .. } => 2,
            TradeSignalError::Database { .. } | TradeSignalError::DatabaseQuery { .. } => 3,
            TradeSignalError::Configuration { .. } => 4,
            TradeSignalError::InsufficientData { .. }
            | TradeSignalError::UnorderedBars { .. }
            | TradeSignalError::NoData { .. }
            | TradeSignalError::NoPrice { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
