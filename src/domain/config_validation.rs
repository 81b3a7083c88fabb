//! Configuration validation.
//!
//! Checks every setting up front and turns the raw INI values into typed
//! [`Settings`] before any command runs.

use crate::domain::error::TradeSignalError;
use crate::domain::position::{RiskParameters, RiskProfile, SizingStrategy};
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 250;
pub const DEFAULT_PORTFOLIO_VALUE: Decimal = dec!(20000);
pub const DEFAULT_TOP_SIGNALS: i64 = 3;
pub const DEFAULT_POOL_SIZE: i64 = 4;
/// One hundred years of calendar days.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSettings {
    pub value: Decimal,
    pub profile: RiskProfile,
    pub strategy: SizingStrategy,
    /// Preset for `profile` with any per-key overrides applied.
    pub risk: RiskParameters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub symbols: Vec<String>,
    pub lookback_days: i64,
    pub portfolio: PortfolioSettings,
    pub top_signals: usize,
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TradeSignalError> {
    load_settings(config).map(|_| ())
}

pub fn load_settings(config: &dyn ConfigPort) -> Result<Settings, TradeSignalError> {
    validate_pool_size(config)?;
    Ok(Settings {
        symbols: load_symbols(config)?,
        lookback_days: load_lookback(config)?,
        portfolio: load_portfolio(config)?,
        top_signals: load_top(config)?,
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TradeSignalError {
    TradeSignalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn load_symbols(config: &dyn ConfigPort) -> Result<Vec<String>, TradeSignalError> {
    match config.get_string("universe", "symbols") {
        Some(s) if !s.trim().is_empty() => {
            parse_symbols(&s).map_err(|e| invalid("universe", "symbols", e.to_string()))
        }
        _ => Err(TradeSignalError::ConfigMissing {
            section: "universe".to_string(),
            key: "symbols".to_string(),
        }),
    }
}

fn load_lookback(config: &dyn ConfigPort) -> Result<i64, TradeSignalError> {
    let days = config.get_int("universe", "lookback_days", DEFAULT_LOOKBACK_DAYS);
    if days <= 0 || days > MAX_LOOKBACK_DAYS {
        return Err(invalid(
            "universe",
            "lookback_days",
            format!("lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}"),
        ));
    }
    Ok(days)
}

fn load_top(config: &dyn ConfigPort) -> Result<usize, TradeSignalError> {
    let top = config.get_int("signals", "top", DEFAULT_TOP_SIGNALS);
    if top < 1 {
        return Err(invalid("signals", "top", "top must be at least 1"));
    }
    Ok(top as usize)
}

fn validate_pool_size(config: &dyn ConfigPort) -> Result<(), TradeSignalError> {
    pool_size(config).map(|_| ())
}

/// Connection pool size as r2d2 takes it.
pub fn pool_size(config: &dyn ConfigPort) -> Result<u32, TradeSignalError> {
    let size = config.get_int("sqlite", "pool_size", DEFAULT_POOL_SIZE);
    match u32::try_from(size) {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(invalid(
            "sqlite",
            "pool_size",
            format!("pool_size must be between 1 and {}", u32::MAX),
        )),
    }
}

/// Reads a decimal, distinguishing an absent key from an unparsable one.
fn decimal_setting(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<Decimal>, TradeSignalError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{raw}' is not a decimal number"))),
    }
}

fn percent_override(
    config: &dyn ConfigPort,
    key: &str,
    preset: Decimal,
) -> Result<Decimal, TradeSignalError> {
    match decimal_setting(config, "portfolio", key)? {
        None => Ok(preset),
        Some(v) if v > Decimal::ZERO && v <= Decimal::ONE_HUNDRED => Ok(v),
        Some(_) => Err(invalid(
            "portfolio",
            key,
            format!("{key} must be greater than 0 and at most 100"),
        )),
    }
}

fn load_portfolio(config: &dyn ConfigPort) -> Result<PortfolioSettings, TradeSignalError> {
    let value = decimal_setting(config, "portfolio", "value")?.unwrap_or(DEFAULT_PORTFOLIO_VALUE);
    if value <= Decimal::ZERO {
        return Err(invalid("portfolio", "value", "value must be positive"));
    }

    let profile = match config.get_string("portfolio", "risk_profile") {
        None => RiskProfile::default(),
        Some(s) => s
            .parse::<RiskProfile>()
            .map_err(|e| invalid("portfolio", "risk_profile", e))?,
    };

    let strategy = match config.get_string("portfolio", "strategy") {
        None => SizingStrategy::default(),
        Some(s) => s
            .parse::<SizingStrategy>()
            .map_err(|e| invalid("portfolio", "strategy", e))?,
    };

    let preset = profile.parameters();
    let min_position_value = match decimal_setting(config, "portfolio", "min_position_value")? {
        None => preset.min_position_value,
        Some(v) if v >= Decimal::ZERO => v,
        Some(_) => {
            return Err(invalid(
                "portfolio",
                "min_position_value",
                "min_position_value must be non-negative",
            ));
        }
    };

    let risk = RiskParameters {
        max_position_percent: percent_override(
            config,
            "max_position_percent",
            preset.max_position_percent,
        )?,
        risk_per_trade_percent: percent_override(
            config,
            "risk_per_trade_percent",
            preset.risk_per_trade_percent,
        )?,
        stop_loss_percent: percent_override(config, "stop_loss_percent", preset.stop_loss_percent)?,
        min_position_value,
    };

    Ok(PortfolioSettings {
        value,
        profile,
        strategy,
        risk,
    })
}
