//! Multi-factor signal scoring.
//!
//! Score = trend (0..30) + momentum (0..30) + value (-20..30) + confluence (0|10).
//! The total is not clamped, so an overbought symbol with no trend or
//! momentum scores below zero.

use crate::domain::indicator::RsiZone;
use crate::domain::summary::{IndicatorSummary, TrendSignal};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;

pub const BUY_THRESHOLD: i32 = 60;
pub const STRONG_THRESHOLD: i32 = 80;
const WEAK_THRESHOLD: i32 = 40;
const BEARISH_SELL_CEILING: i32 = 30;
const RSI_SELL_OVERRIDE: Decimal = dec!(75);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Buy => write!(f, "BUY"),
            SignalType::Sell => write!(f, "SELL"),
            SignalType::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStrength {
    Strong,
    Moderate,
    Weak,
    Avoid,
}

impl SignalStrength {
    pub fn from_score(score: i32) -> Self {
        if score >= STRONG_THRESHOLD {
            SignalStrength::Strong
        } else if score >= BUY_THRESHOLD {
            SignalStrength::Moderate
        } else if score >= WEAK_THRESHOLD {
            SignalStrength::Weak
        } else {
            SignalStrength::Avoid
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalStrength::Strong => write!(f, "STRONG"),
            SignalStrength::Moderate => write!(f, "MODERATE"),
            SignalStrength::Weak => write!(f, "WEAK"),
            SignalStrength::Avoid => write!(f, "AVOID"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalComponents {
    pub trend: i32,
    pub momentum: i32,
    pub value: i32,
    pub confluence: i32,
}

impl SignalComponents {
    pub fn total(&self) -> i32 {
        self.trend + self.momentum + self.value + self.confluence
    }

    pub fn breakdown(&self) -> String {
        format!(
            "Trend: {}/30, Momentum: {}/30, Value: {}/30, Bonus: {}/10 = {}/100",
            self.trend,
            self.momentum,
            self.value,
            self.confluence,
            self.total()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub date: NaiveDate,
    pub signal_type: SignalType,
    pub score: i32,
    pub strength: SignalStrength,
    pub price: Decimal,
    pub reasoning: String,
    pub components: SignalComponents,
}

impl Signal {
    pub fn is_tradeable(&self) -> bool {
        self.score >= BUY_THRESHOLD
    }

    pub fn is_strong(&self) -> bool {
        self.score >= STRONG_THRESHOLD
    }
}

/// Scores an indicator summary against the current price.
///
/// With no summary at all the result is HOLD / AVOID with a zero score. The
/// signal is dated on the SMA20 point when there is one, otherwise `as_of`.
pub fn score_signal(
    symbol: &str,
    summary: Option<&IndicatorSummary>,
    price: Decimal,
    as_of: NaiveDate,
) -> Signal {
    let Some(summary) = summary else {
        return Signal {
            symbol: symbol.to_string(),
            date: as_of,
            signal_type: SignalType::Hold,
            score: 0,
            strength: SignalStrength::Avoid,
            price,
            reasoning: "Insufficient data".to_string(),
            components: SignalComponents::default(),
        };
    };

    let trend = trend_score(summary);
    let momentum = momentum_score(summary);
    let value = value_score(summary);
    let components = SignalComponents {
        trend,
        momentum,
        value,
        confluence: confluence_bonus(trend, momentum, value),
    };
    let score = components.total();

    Signal {
        symbol: symbol.to_string(),
        date: summary.sma20.as_ref().map(|p| p.date).unwrap_or(as_of),
        signal_type: classify(score, summary),
        score,
        strength: SignalStrength::from_score(score),
        price,
        reasoning: build_reasoning(summary, &components),
        components,
    }
}

/// 30 for SMA20 > SMA50 > SMA200, 20 for SMA20 > SMA50, 10 when SMA20 is
/// within 1% below SMA50.
pub fn trend_score(summary: &IndicatorSummary) -> i32 {
    let (Some(short), Some(medium)) = (summary.sma20_value(), summary.sma50_value()) else {
        return 0;
    };

    match summary.sma200_value() {
        Some(long) if short > medium && medium > long => 30,
        _ if short > medium => 20,
        _ if short > medium * dec!(0.99) => 10,
        _ => 0,
    }
}

pub fn momentum_score(summary: &IndicatorSummary) -> i32 {
    let Some(histogram) = summary.macd_histogram() else {
        return 0;
    };

    if histogram > Decimal::ZERO {
        if histogram.abs() > dec!(10) { 30 } else { 20 }
    } else if histogram > dec!(-5) {
        10
    } else {
        0
    }
}

/// Oversold RSI is good value; overbought is penalised.
pub fn value_score(summary: &IndicatorSummary) -> i32 {
    let Some(rsi) = summary.rsi_value() else {
        return 0;
    };

    if rsi < dec!(30) {
        30
    } else if rsi < dec!(40) {
        20
    } else if rsi <= dec!(60) {
        10
    } else if rsi > dec!(70) {
        -20
    } else {
        0
    }
}

pub fn confluence_bonus(trend: i32, momentum: i32, value: i32) -> i32 {
    if trend > 0 && momentum > 0 && value > 0 {
        10
    } else {
        0
    }
}

/// BUY at 60 or more. Otherwise RSI above 75 forces SELL regardless of score,
/// as does a bearish SMA trend with a score under 30.
pub fn classify(score: i32, summary: &IndicatorSummary) -> SignalType {
    if score >= BUY_THRESHOLD {
        return SignalType::Buy;
    }

    if summary.rsi_value().is_some_and(|rsi| rsi > RSI_SELL_OVERRIDE) {
        return SignalType::Sell;
    }

    if summary.trend_signal() == TrendSignal::Bearish && score < BEARISH_SELL_CEILING {
        return SignalType::Sell;
    }

    SignalType::Hold
}

fn build_reasoning(summary: &IndicatorSummary, components: &SignalComponents) -> String {
    let mut reasons: Vec<&str> = Vec::new();

    reasons.push(if components.trend >= 20 {
        "Strong uptrend (SMA20 > SMA50)"
    } else if components.trend > 0 {
        "Weak bullish trend"
    } else {
        "Bearish or no clear trend"
    });

    reasons.push(if components.momentum >= 20 {
        "Positive momentum (MACD bullish)"
    } else if components.momentum > 0 {
        "Early momentum building"
    } else {
        "Negative or weak momentum"
    });

    if let Some(zone) = summary.rsi_signal() {
        reasons.push(match zone {
            RsiZone::Oversold => "Oversold - good value",
            RsiZone::Overbought => "OVERBOUGHT - caution!",
            RsiZone::Neutral => "Neutral valuation",
        });
    }

    if components.confluence > 0 {
        reasons.push("All signals aligned!");
    }

    format!("{} | Score: {}", reasons.join(", "), components.breakdown())
}
