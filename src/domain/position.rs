//! Position sizing: turn a scored signal into a share count under a risk
//! profile.

use crate::domain::indicator::round_half_up;
use crate::domain::signal::Signal;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use std::fmt;
use std::str::FromStr;

const MONEY_SCALE: u32 = 2;
const STOP_OFFSET_SCALE: u32 = 4;
const RATIO_SCALE: u32 = 4;
const EQUAL_WEIGHT_SLOTS: Decimal = dec!(10);

/// Percentages are whole-number percent (10 means 10%).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskParameters {
    pub max_position_percent: Decimal,
    pub risk_per_trade_percent: Decimal,
    pub stop_loss_percent: Decimal,
    pub min_position_value: Decimal,
}

impl RiskParameters {
    pub fn conservative() -> Self {
        Self {
            max_position_percent: dec!(5),
            risk_per_trade_percent: dec!(1),
            stop_loss_percent: dec!(8),
            min_position_value: dec!(500),
        }
    }

    pub fn moderate() -> Self {
        Self {
            max_position_percent: dec!(10),
            risk_per_trade_percent: dec!(2),
            stop_loss_percent: dec!(10),
            min_position_value: dec!(1000),
        }
    }

    pub fn aggressive() -> Self {
        Self {
            max_position_percent: dec!(15),
            risk_per_trade_percent: dec!(3),
            stop_loss_percent: dec!(12),
            min_position_value: dec!(1500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskProfile {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskProfile {
    pub fn parameters(&self) -> RiskParameters {
        match self {
            RiskProfile::Conservative => RiskParameters::conservative(),
            RiskProfile::Moderate => RiskParameters::moderate(),
            RiskProfile::Aggressive => RiskParameters::aggressive(),
        }
    }
}

impl FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "moderate" => Ok(RiskProfile::Moderate),
            "aggressive" => Ok(RiskProfile::Aggressive),
            other => Err(format!(
                "unknown risk profile '{other}' (expected conservative, moderate or aggressive)"
            )),
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskProfile::Conservative => write!(f, "conservative"),
            RiskProfile::Moderate => write!(f, "moderate"),
            RiskProfile::Aggressive => write!(f, "aggressive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizingStrategy {
    FixedPercentage,
    RiskBased,
    #[default]
    SignalStrength,
    EqualWeight,
}

impl FromStr for SizingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed_percentage" => Ok(SizingStrategy::FixedPercentage),
            "risk_based" => Ok(SizingStrategy::RiskBased),
            "signal_strength" => Ok(SizingStrategy::SignalStrength),
            "equal_weight" => Ok(SizingStrategy::EqualWeight),
            other => Err(format!(
                "unknown sizing strategy '{other}' (expected fixed_percentage, risk_based, \
                 signal_strength or equal_weight)"
            )),
        }
    }
}

impl fmt::Display for SizingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizingStrategy::FixedPercentage => write!(f, "fixed_percentage"),
            SizingStrategy::RiskBased => write!(f, "risk_based"),
            SizingStrategy::SignalStrength => write!(f, "signal_strength"),
            SizingStrategy::EqualWeight => write!(f, "equal_weight"),
        }
    }
}

/// A sized trade. `shares == 0` means the trade was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSize {
    pub symbol: String,
    pub shares: u64,
    pub entry_price: Decimal,
    pub investment: Decimal,
    pub stop_loss_price: Decimal,
    pub risk_amount: Decimal,
    pub portfolio_percent: Decimal,
}

impl PositionSize {
    pub fn is_valid(&self) -> bool {
        self.shares > 0
    }

    /// Distance from entry to stop as a percent of entry.
    pub fn stop_loss_percent(&self) -> Decimal {
        if self.entry_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        round_half_up(
            (self.entry_price - self.stop_loss_price) / self.entry_price,
            RATIO_SCALE,
        ) * Decimal::ONE_HUNDRED
    }
}

#[derive(Debug, Clone)]
pub struct PositionSizer {
    portfolio_value: Decimal,
    strategy: SizingStrategy,
    risk: RiskParameters,
}

impl PositionSizer {
    pub fn new(portfolio_value: Decimal, strategy: SizingStrategy, risk: RiskParameters) -> Self {
        Self {
            portfolio_value,
            strategy,
            risk,
        }
    }

    pub fn portfolio_value(&self) -> Decimal {
        self.portfolio_value
    }

    pub fn strategy(&self) -> SizingStrategy {
        self.strategy
    }

    pub fn risk(&self) -> &RiskParameters {
        &self.risk
    }

    /// Sizes a position at the signal's reference price.
    ///
    /// A non-positive price cannot be sized and yields zero shares.
    pub fn calculate_position_size(&self, signal: &Signal) -> PositionSize {
        let price = signal.price;
        if price <= Decimal::ZERO {
            tracing::warn!(symbol = %signal.symbol, %price, "non-positive price, skipping position");
            return PositionSize {
                symbol: signal.symbol.clone(),
                shares: 0,
                entry_price: price,
                investment: Decimal::ZERO,
                stop_loss_price: price,
                risk_amount: Decimal::ZERO,
                portfolio_percent: Decimal::ZERO,
            };
        }

        let target = self.apply_limits(self.raw_target(signal), &signal.symbol);
        let stop_loss_price = self.stop_loss_price(price);

        let shares = (target / price).floor().to_u64().unwrap_or(0);
        let share_count = Decimal::from(shares);
        let investment = share_count * price;
        let risk_amount = share_count * (price - stop_loss_price);

        PositionSize {
            symbol: signal.symbol.clone(),
            shares,
            entry_price: price,
            investment,
            stop_loss_price,
            risk_amount,
            portfolio_percent: self.portfolio_percent(investment),
        }
    }

    fn raw_target(&self, signal: &Signal) -> Decimal {
        match self.strategy {
            SizingStrategy::FixedPercentage => self.max_position_value(),
            SizingStrategy::RiskBased => self.risk_based_target(signal.price),
            SizingStrategy::SignalStrength => {
                let scale = round_half_up(
                    Decimal::from(signal.score) / Decimal::ONE_HUNDRED,
                    MONEY_SCALE,
                );
                self.max_position_value() * scale
            }
            SizingStrategy::EqualWeight => {
                round_half_up(self.portfolio_value / EQUAL_WEIGHT_SLOTS, MONEY_SCALE)
            }
        }
    }

    /// Risk amount divided by the per-share stop distance. The quotient is
    /// used directly as a money target.
    fn risk_based_target(&self, price: Decimal) -> Decimal {
        let risk_per_trade = round_half_up(
            self.portfolio_value * self.risk.risk_per_trade_percent / Decimal::ONE_HUNDRED,
            MONEY_SCALE,
        );
        let distance = price - self.stop_loss_price(price);
        if distance <= Decimal::ZERO {
            return self.max_position_value();
        }
        round_half_up(risk_per_trade / distance, MONEY_SCALE)
    }

    fn max_position_value(&self) -> Decimal {
        round_half_up(
            self.portfolio_value * self.risk.max_position_percent / Decimal::ONE_HUNDRED,
            MONEY_SCALE,
        )
    }

    fn apply_limits(&self, target: Decimal, symbol: &str) -> Decimal {
        let max = self.max_position_value();
        if target > max {
            tracing::warn!(symbol, %target, %max, "position size exceeds maximum, limiting");
            return max;
        }
        if target < self.risk.min_position_value {
            tracing::warn!(
                symbol,
                %target,
                min = %self.risk.min_position_value,
                "position size below minimum, skipping"
            );
            return Decimal::ZERO;
        }
        target
    }

    fn stop_loss_price(&self, price: Decimal) -> Decimal {
        price
            - round_half_up(
                price * self.risk.stop_loss_percent / Decimal::ONE_HUNDRED,
                STOP_OFFSET_SCALE,
            )
    }

    fn portfolio_percent(&self, investment: Decimal) -> Decimal {
        if self.portfolio_value.is_zero() {
            return Decimal::ZERO;
        }
        round_half_up(investment / self.portfolio_value, RATIO_SCALE) * Decimal::ONE_HUNDRED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{SignalComponents, SignalStrength, SignalType};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn signal(score: i32, price: Decimal) -> Signal {
        Signal {
            symbol: "BARC.L".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            signal_type: SignalType::Buy,
            score,
            strength: SignalStrength::from_score(score),
            price,
            reasoning: String::new(),
            components: SignalComponents::default(),
        }
    }

    fn sizer(strategy: SizingStrategy, risk: RiskParameters) -> PositionSizer {
        PositionSizer::new(dec!(20000), strategy, risk)
    }

    #[test]
    fn fixed_percentage_moderate() {
        let pos = sizer(SizingStrategy::FixedPercentage, RiskParameters::moderate())
            .calculate_position_size(&signal(70, dec!(42.5)));

        // target 2000 / 42.5 = 47.06
        assert_eq!(pos.shares, 47);
        assert_eq!(pos.investment, dec!(1997.5));
        assert_eq!(pos.stop_loss_price, dec!(38.25));
        assert_eq!(pos.risk_amount, dec!(199.75));
        assert_eq!(pos.portfolio_percent, dec!(9.99));
        assert_eq!(pos.stop_loss_percent(), dec!(10));
        assert!(pos.is_valid());
    }

    #[test]
    fn signal_strength_scales_by_score() {
        let s = sizer(SizingStrategy::SignalStrength, RiskParameters::moderate());

        let pos = s.calculate_position_size(&signal(70, dec!(42.5)));
        // 2000 * 0.70 = 1400 -> 32 shares
        assert_eq!(pos.shares, 32);
        assert_eq!(pos.investment, dec!(1360));

        let pos = s.calculate_position_size(&signal(100, dec!(10)));
        assert_eq!(pos.shares, 200);
        assert_eq!(pos.investment, dec!(2000));
    }

    #[test]
    fn signal_strength_below_minimum_is_skipped() {
        // 2000 * 0.40 = 800 < 1000
        let pos = sizer(SizingStrategy::SignalStrength, RiskParameters::moderate())
            .calculate_position_size(&signal(40, dec!(10)));
        assert_eq!(pos.shares, 0);
        assert_eq!(pos.investment, Decimal::ZERO);
        assert_eq!(pos.risk_amount, Decimal::ZERO);
        assert_eq!(pos.portfolio_percent, Decimal::ZERO);
        assert!(!pos.is_valid());
    }

    #[test]
    fn negative_score_sizes_to_zero() {
        let pos = sizer(SizingStrategy::SignalStrength, RiskParameters::aggressive())
            .calculate_position_size(&signal(-20, dec!(10)));
        assert_eq!(pos.shares, 0);
    }

    #[test]
    fn risk_based_uses_stop_distance() {
        let s = sizer(SizingStrategy::RiskBased, RiskParameters::moderate());

        // risk 400, distance 5 -> target 80, below the 1000 minimum
        let pos = s.calculate_position_size(&signal(90, dec!(50)));
        assert_eq!(pos.shares, 0);

        // risk 400, distance 0.02 -> target 20000, clamped to 2000
        let pos = s.calculate_position_size(&signal(90, dec!(0.2)));
        assert_eq!(pos.shares, 10000);
        assert_eq!(pos.investment, dec!(2000));
        assert_eq!(pos.stop_loss_price, dec!(0.18));
    }

    #[test]
    fn risk_based_falls_back_when_stop_distance_is_zero() {
        let risk = RiskParameters {
            stop_loss_percent: Decimal::ZERO,
            ..RiskParameters::moderate()
        };
        let pos = sizer(SizingStrategy::RiskBased, risk).calculate_position_size(&signal(90, dec!(25)));
        // fixed 2000 / 25
        assert_eq!(pos.shares, 80);
        assert_eq!(pos.risk_amount, Decimal::ZERO);
    }

    #[test]
    fn equal_weight_clamped_to_max() {
        // 20000 / 10 = 2000, conservative max is 1000
        let pos = sizer(SizingStrategy::EqualWeight, RiskParameters::conservative())
            .calculate_position_size(&signal(65, dec!(10)));
        assert_eq!(pos.shares, 100);
        assert_eq!(pos.investment, dec!(1000));
        assert_eq!(pos.portfolio_percent, dec!(5));
        assert_eq!(pos.stop_loss_price, dec!(9.2));
    }

    #[test]
    fn price_above_target_gives_zero_shares() {
        let pos = sizer(SizingStrategy::FixedPercentage, RiskParameters::moderate())
            .calculate_position_size(&signal(80, dec!(2500)));
        assert_eq!(pos.shares, 0);
        assert_eq!(pos.investment, Decimal::ZERO);
    }

    #[test]
    fn non_positive_price_is_skipped() {
        let pos = sizer(SizingStrategy::FixedPercentage, RiskParameters::moderate())
            .calculate_position_size(&signal(80, Decimal::ZERO));
        assert_eq!(pos.shares, 0);
        assert!(!pos.is_valid());
    }

    #[test]
    fn zero_portfolio_sizes_nothing() {
        let pos = PositionSizer::new(Decimal::ZERO, SizingStrategy::EqualWeight, RiskParameters::moderate())
            .calculate_position_size(&signal(80, dec!(10)));
        assert_eq!(pos.shares, 0);
        assert_eq!(pos.portfolio_percent, Decimal::ZERO);
    }

    #[test]
    fn parse_profile_and_strategy() {
        assert_eq!("Aggressive".parse::<RiskProfile>(), Ok(RiskProfile::Aggressive));
        assert_eq!(RiskProfile::Conservative.parameters(), RiskParameters::conservative());
        assert!("reckless".parse::<RiskProfile>().is_err());

        assert_eq!("risk_based".parse::<SizingStrategy>(), Ok(SizingStrategy::RiskBased));
        assert_eq!(SizingStrategy::EqualWeight.to_string(), "equal_weight");
        assert_eq!(SizingStrategy::default(), SizingStrategy::SignalStrength);
        assert!("kelly".parse::<SizingStrategy>().is_err());
    }

    proptest! {
        #[test]
        fn fixed_percentage_never_exceeds_target(cents in 1i64..10_000_000) {
            let price = Decimal::new(cents, 2);
            let pos = sizer(SizingStrategy::FixedPercentage, RiskParameters::moderate())
                .calculate_position_size(&signal(70, price));

            prop_assert_eq!(Decimal::from(pos.shares), (dec!(2000) / price).floor());
            prop_assert!(pos.investment <= dec!(2000));
            prop_assert_eq!(pos.investment, Decimal::from(pos.shares) * price);
        }

        #[test]
        fn below_minimum_always_skips(score in -20i32..50, cents in 1i64..1_000_000) {
            // max 2000 * score/100 stays under 1000
            let pos = sizer(SizingStrategy::SignalStrength, RiskParameters::moderate())
                .calculate_position_size(&signal(score, Decimal::new(cents, 2)));
            prop_assert_eq!(pos.shares, 0);
        }
    }
}
