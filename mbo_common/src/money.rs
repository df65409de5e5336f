use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::{op, Rate};

//--------------------------------------       Money       -----------------------------------------------------------
/// A monetary amount in minor units (cents) of its owning record's currency.
///
/// Amounts are fixed-point with two decimal places: one unit of `Money` is one cent, and
/// [`Display`] always renders the major-unit form with two decimals. The currency itself is
/// carried by the record holding the amount, not by the value.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(pub String);

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        Money::try_from_decimal(value)
    }
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_major_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The amount as a full-precision decimal in major units.
    pub fn as_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Converts a major-unit decimal into `Money`, rounding half-away-from-zero to the nearest
    /// cent. Fails when the value does not fit into the i64 cent range.
    pub fn try_from_decimal(value: Decimal) -> Result<Self, MoneyConversionError> {
        let cents = (value * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| MoneyConversionError(format!("{value} overflows the cent range")))?;
        Ok(Self(cents))
    }

    /// Applies an exchange rate to this amount, rounding the result to the nearest cent,
    /// half away from zero. The rate itself is never rounded.
    pub fn convert_at(&self, rate: Rate) -> Result<Self, MoneyConversionError> {
        let cents = (Decimal::from(self.0) * rate.value())
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| {
                MoneyConversionError(format!("{self} at rate {rate} overflows the cent range"))
            })?;
        Ok(Self(cents))
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn display_renders_two_decimals() {
        assert_eq!(format!("{}", Money::from_cents(52920)), "529.20");
        assert_eq!(format!("{}", Money::from_cents(5)), "0.05");
        assert_eq!(format!("{}", Money::from_cents(-50)), "-0.50");
        assert_eq!(format!("{}", Money::ZERO), "0.00");
    }

    #[test]
    fn parses_major_unit_strings() {
        assert_eq!(Money::from_str("123.45").unwrap(), Money::from_cents(12345));
        assert_eq!(Money::from_str("100").unwrap(), Money::from_cents(10000));
        assert_eq!(Money::from_str("-0.5").unwrap(), Money::from_cents(-50));
        assert!(Money::from_str("not money").is_err());
    }

    #[test]
    fn converts_at_full_precision_rate_then_rounds() {
        let rate = Rate::from_str("5.292").unwrap();
        let converted = Money::from_major_units(100).convert_at(rate).unwrap();
        assert_eq!(converted, Money::from_cents(52920));

        // 10.01 * 0.333333 = 3.336363..., rounds to 3.34
        let rate = Rate::from_str("0.333333").unwrap();
        let converted = Money::from_cents(1001).convert_at(rate).unwrap();
        assert_eq!(converted, Money::from_cents(334));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        let rate = Rate::from_str("0.005").unwrap();
        assert_eq!(Money::from_cents(100).convert_at(rate).unwrap(), Money::from_cents(1));
        assert_eq!(Money::from_cents(-100).convert_at(rate).unwrap(), Money::from_cents(-1));
    }

    #[test]
    fn arithmetic_and_sum() {
        let total: Money = [Money::from_cents(150), Money::from_cents(250)].into_iter().sum();
        assert_eq!(total, Money::from_cents(400));
        let mut m = Money::from_cents(1000);
        m -= Money::from_cents(400);
        assert_eq!(m, Money::from_cents(600));
        assert_eq!(-m, Money::from_cents(-600));
        assert_eq!(m * 3, Money::from_cents(1800));
    }
}
