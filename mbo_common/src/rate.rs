use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{
    database::{HasArguments, HasValueRef},
    encode::IsNull,
    error::BoxDynError,
    Database,
    Decode,
    Encode,
    Type,
};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Not a valid decimal value: {0}")]
pub struct RateParseError(pub String);

/// Implements `sqlx::Type`/`Encode`/`Decode` for a `Decimal` newtype, storing the value as its
/// canonical string form so no precision is lost in the database.
macro_rules! decimal_column {
    ($t:ty) => {
        impl<DB: Database> Type<DB> for $t
        where String: Type<DB>
        {
            fn type_info() -> DB::TypeInfo {
                <String as Type<DB>>::type_info()
            }

            fn compatible(ty: &DB::TypeInfo) -> bool {
                <String as Type<DB>>::compatible(ty)
            }
        }

        impl<'q, DB: Database> Encode<'q, DB> for $t
        where String: Encode<'q, DB>
        {
            fn encode_by_ref(&self, buf: &mut <DB as HasArguments<'q>>::ArgumentBuffer) -> IsNull {
                <String as Encode<'q, DB>>::encode(self.0.to_string(), buf)
            }
        }

        impl<'r, DB: Database> Decode<'r, DB> for $t
        where &'r str: Decode<'r, DB>
        {
            fn decode(value: <DB as HasValueRef<'r>>::ValueRef) -> Result<Self, BoxDynError> {
                let raw = <&str as Decode<'r, DB>>::decode(value)?;
                let value = Decimal::from_str(raw)?;
                Ok(Self(value))
            }
        }
    };
}

//--------------------------------------        Rate        ----------------------------------------------------------
/// A quote-per-base exchange rate at full precision. Rates are never rounded; only converted
/// amounts are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(Decimal);

decimal_column!(Rate);

impl Rate {
    pub const ONE: Rate = Rate(Decimal::ONE);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Applies a platform spread as a multiplicative discount: `rate * (1 - spread/100)`.
    /// The margin always works in the platform's favour, whichever direction is converted.
    pub fn with_spread(self, spread: SpreadPercent) -> Rate {
        Rate(self.0 * spread.discount_factor())
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Rate {
    type Err = RateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| RateParseError(format!("{s}: {e}")))?;
        Ok(Self(value))
    }
}

impl From<Decimal> for Rate {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

//--------------------------------------    SpreadPercent    ---------------------------------------------------------
/// An FX spread expressed as a percentage of the market rate. Configured values must lie in
/// `[0, 10]`; the bound is enforced where spreads are configured, not where they are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpreadPercent(Decimal);

decimal_column!(SpreadPercent);

impl SpreadPercent {
    pub const MAX_ALLOWED: SpreadPercent = SpreadPercent(Decimal::TEN);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn in_bounds(&self) -> bool {
        self.0 >= Decimal::ZERO && self.0 <= Decimal::TEN
    }

    /// The factor a market rate is multiplied by to obtain the spread-adjusted rate.
    pub fn discount_factor(&self) -> Decimal {
        Decimal::ONE - self.0 / Decimal::ONE_HUNDRED
    }
}

impl Display for SpreadPercent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl FromStr for SpreadPercent {
    type Err = RateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| RateParseError(format!("{s}: {e}")))?;
        Ok(Self(value))
    }
}

impl From<Decimal> for SpreadPercent {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spread_discounts_the_rate() {
        let rate = Rate::from_str("5.88").unwrap();
        let spread = SpreadPercent::from_str("10").unwrap();
        assert_eq!(rate.with_spread(spread), Rate::from_str("5.2920").unwrap());
    }

    #[test]
    fn zero_spread_leaves_the_rate_untouched() {
        let rate = Rate::from_str("0.19").unwrap();
        assert_eq!(rate.with_spread(SpreadPercent::default()), rate);
    }

    #[test]
    fn spread_bounds() {
        assert!(SpreadPercent::from_str("0").unwrap().in_bounds());
        assert!(SpreadPercent::from_str("10").unwrap().in_bounds());
        assert!(!SpreadPercent::from_str("10.01").unwrap().in_bounds());
        assert!(!SpreadPercent::from_str("-1").unwrap().in_bounds());
    }
}
