//! Plain-text reports for the terminal.
//!
//! Every function returns the rendered text; callers decide where it goes.

use crate::domain::indicator::round_half_up;
use crate::domain::position::PositionSize;
use crate::domain::signal::{Signal, SignalType};
use crate::domain::summary::IndicatorSummary;
use rust_decimal::Decimal;
use std::fmt::Write;

const RULE_WIDTH: usize = 100;

fn rule(c: char) -> String {
    c.to_string().repeat(RULE_WIDTH)
}

fn money(value: Decimal) -> String {
    format!("{:.2}", round_half_up(value, 2))
}

pub fn format_summary(summary: &IndicatorSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Indicator Summary: {} ===", summary.symbol);
    if let Some(v) = summary.sma20_value() {
        let _ = writeln!(out, "SMA(20):  {}", money(v));
    }
    if let Some(v) = summary.sma50_value() {
        let _ = writeln!(out, "SMA(50):  {}", money(v));
    }
    if let Some(v) = summary.sma200_value() {
        let _ = writeln!(out, "SMA(200): {}", money(v));
    }
    if let (Some(v), Some(zone)) = (summary.rsi_value(), summary.rsi_signal()) {
        let _ = writeln!(out, "RSI(14):  {} [{}]", money(v), zone);
    }
    if let Some(v) = summary.macd_histogram() {
        let _ = writeln!(out, "MACD:     {:.4}", round_half_up(v, 4));
    }
    let _ = writeln!(out, "Trend:    {}", summary.trend_signal());
    out
}

fn marker(signal_type: SignalType) -> &'static str {
    match signal_type {
        SignalType::Buy => "[+]",
        SignalType::Sell => "[-]",
        SignalType::Hold => "[ ]",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
    pub tradeable: usize,
}

pub fn count_signals(signals: &[Signal]) -> SignalCounts {
    signals.iter().fold(SignalCounts::default(), |mut acc, s| {
        match s.signal_type {
            SignalType::Buy => acc.buy += 1,
            SignalType::Sell => acc.sell += 1,
            SignalType::Hold => acc.hold += 1,
        }
        if s.is_tradeable() {
            acc.tradeable += 1;
        }
        acc
    })
}

pub fn format_signal_report(signals: &[Signal]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule('='));
    let _ = writeln!(out, "{:^width$}", "TRADING SIGNAL REPORT", width = RULE_WIDTH);
    let _ = writeln!(out, "{}", rule('='));

    for signal in signals {
        let _ = writeln!(
            out,
            "\n{} {} | {} | Score: {}/100 | Price: {}",
            marker(signal.signal_type),
            signal.symbol,
            signal.signal_type,
            signal.score,
            money(signal.price)
        );
        let _ = writeln!(out, "   Strength: {}", signal.strength);
        let _ = writeln!(out, "   {}", signal.reasoning);
        if signal.is_tradeable() {
            let _ = writeln!(out, "   TRADEABLE SIGNAL");
        }
    }

    let counts = count_signals(signals);
    let _ = writeln!(out, "\n{}", rule('='));
    let _ = writeln!(
        out,
        "Summary: {} BUY | {} SELL | {} HOLD | {} Tradeable (>=60 score)",
        counts.buy, counts.sell, counts.hold, counts.tradeable
    );
    let _ = writeln!(out, "{}", rule('='));
    out
}

pub fn format_top_buys(signals: &[Signal]) -> String {
    if signals.is_empty() {
        return "No BUY signals.\n".to_string();
    }
    let mut out = format!("Top {} Buy Opportunities:\n", signals.len());
    for (i, signal) in signals.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} - Score: {}/100 - {}",
            i + 1,
            signal.symbol,
            signal.score,
            signal.reasoning
        );
    }
    out
}

pub fn format_position(position: &PositionSize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Position Size: {}", position.symbol);
    let _ = writeln!(out, "   Shares:     {}", position.shares);
    let _ = writeln!(out, "   Entry:      {}", money(position.entry_price));
    let _ = writeln!(
        out,
        "   Investment: {} ({}% of portfolio)",
        money(position.investment),
        money(position.portfolio_percent)
    );
    let _ = writeln!(
        out,
        "   Stop Loss:  {} ({}% below entry)",
        money(position.stop_loss_price),
        money(position.stop_loss_percent())
    );
    let _ = writeln!(out, "   Risk:       {}", money(position.risk_amount));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortfolioTotals {
    pub capital: Decimal,
    pub invested: Decimal,
    pub deployed_percent: Decimal,
    pub cash: Decimal,
    pub positions: usize,
}

/// Totals over the valid (non-zero share) positions only.
pub fn portfolio_totals(capital: Decimal, positions: &[PositionSize]) -> PortfolioTotals {
    let valid: Vec<&PositionSize> = positions.iter().filter(|p| p.is_valid()).collect();
    let invested: Decimal = valid.iter().map(|p| p.investment).sum();
    let deployed_percent = if capital.is_zero() {
        Decimal::ZERO
    } else {
        round_half_up(invested / capital, 4) * Decimal::ONE_HUNDRED
    };
    PortfolioTotals {
        capital,
        invested,
        deployed_percent,
        cash: capital - invested,
        positions: valid.len(),
    }
}

pub fn format_positions(capital: Decimal, positions: &[PositionSize]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule('='));
    let _ = writeln!(out, "{:^width$}", "RECOMMENDED POSITIONS", width = RULE_WIDTH);
    let _ = writeln!(out, "{}", rule('='));

    for position in positions.iter().filter(|p| p.is_valid()) {
        let _ = writeln!(out);
        out.push_str(&format_position(position));
    }

    let totals = portfolio_totals(capital, positions);
    let _ = writeln!(out, "\n{}", rule('-'));
    let _ = writeln!(out, "Portfolio Summary:");
    let _ = writeln!(out, "  Total Capital:    {}", money(totals.capital));
    let _ = writeln!(
        out,
        "  Total Investment: {} ({}% deployed)",
        money(totals.invested),
        money(totals.deployed_percent)
    );
    let _ = writeln!(out, "  Cash Remaining:   {}", money(totals.cash));
    let _ = writeln!(out, "  Positions:        {}", totals.positions);
    let _ = writeln!(out, "{}", rule('='));
    out
}

pub fn format_data_range(
    symbol: &str,
    range: Option<(chrono::NaiveDate, chrono::NaiveDate, usize)>,
) -> String {
    match range {
        Some((first, last, bars)) => format!("{symbol}: {bars} bars, {first} to {last}"),
        None => format!("{symbol}: no data"),
    }
}
