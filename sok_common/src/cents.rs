use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Cents        -----------------------------------------------------------
/// A monetary amount in integer minor units (cents). All pricing, escrow and
/// courier-rate arithmetic in the engine happens in this type; floating point
/// only ever appears transiently when a distance multiplies a rate.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Cents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Cents {}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentsConversionError(format!("Value {value} is too large to convert to Cents")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Converts whole currency units into cents.
    pub fn from_whole(units: i64) -> Self {
        Self(units * 100)
    }

    /// Returns the given percentage of this amount, truncating towards zero.
    /// Used for the courier earnings split on delivery.
    pub fn percent(&self, pct: i64) -> Self {
        Self(self.0 * pct / 100)
    }

    /// Multiplies this per-unit rate by a (possibly fractional) quantity such
    /// as a route distance in km, rounding to the nearest cent.
    pub fn scale_by(&self, factor: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self((self.0 as f64 * factor).round() as i64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(Cents::from(25_000).to_string(), "250.00");
        assert_eq!(Cents::from(101).to_string(), "1.01");
        assert_eq!(Cents::from(-5).to_string(), "-0.05");
    }

    #[test]
    fn arithmetic() {
        let total = Cents::from_whole(100) * 2 + Cents::from_whole(50);
        assert_eq!(total, Cents::from(25_000));
        assert_eq!(total.percent(80), Cents::from(20_000));
    }

    #[test]
    fn scale_rounds_to_nearest_cent() {
        // 150 c/km over 12.345 km
        assert_eq!(Cents::from(150).scale_by(12.345), Cents::from(1852));
        assert_eq!(Cents::from(100).scale_by(0.0), Cents::from(0));
    }
}
