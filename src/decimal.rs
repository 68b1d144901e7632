//! Exact decimal arithmetic for balances, move quantities and bounds.
//!
//! `Amount` wraps [`bigdecimal::BigDecimal`]: addition, subtraction and
//! multiplication are exact, division takes an explicit precision and
//! rounds half-even. There is no constructor from floating point, so no
//! NaN or infinity can ever enter a ledger.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Zero};

use crate::error::BuildError;

/// Fewest significant digits any division result is allowed to keep.
pub const MIN_PRECISION: u64 = 50;

/// An exact decimal value with one canonical string form per value.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(BigDecimal);

impl Amount {
    pub fn zero() -> Self {
        Self(BigDecimal::zero())
    }

    pub fn from_int(value: i64) -> Self {
        Self(BigDecimal::from(value))
    }

    /// The one canonical rendering: trailing zeros stripped, no decimal
    /// point on integral values, no exponent, a single `-` on negatives.
    pub fn canonical(&self) -> String {
        self.0.normalized().to_string()
    }

    /// Round to `places` decimal places, ties to even.
    pub fn round_dp(&self, places: i64) -> Self {
        Self(self.0.with_scale_round(places, RoundingMode::HalfEven))
    }

    /// Exact-dividend division at `precision` significant digits
    /// (floored at [`MIN_PRECISION`]), half-even. `None` on a zero divisor.
    pub fn checked_div(&self, divisor: &Amount, precision: u64) -> Option<Amount> {
        if divisor.is_zero() {
            return None;
        }
        let quotient = &self.0 / &divisor.0;
        Some(Self(quotient.with_prec(precision.max(MIN_PRECISION))))
    }

    /// Always true: the representation has no NaN or infinity, and the
    /// string constructor refuses them. Kept for callers that assert it.
    pub fn is_finite(&self) -> bool {
        true
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < BigDecimal::zero()
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Amount {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match BigDecimal::from_str(s.trim()) {
            Ok(value) => Ok(Self(value)),
            Err(err) => Err(BuildError::InvalidQuantity {
                value: s.to_string(),
                detail: err.to_string(),
            }),
        }
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self::from_int(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.canonical())
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Add<&Amount> for &Amount {
    type Output = Amount;
    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Sub<&Amount> for &Amount {
    type Output = Amount;
    fn sub(self, rhs: &Amount) -> Amount {
        Amount(&self.0 - &rhs.0)
    }
}

impl Mul for Amount {
    type Output = Amount;
    fn mul(self, rhs: Amount) -> Amount {
        Amount(self.0 * rhs.0)
    }
}

impl Mul<&Amount> for &Amount {
    type Output = Amount;
    fn mul(self, rhs: &Amount) -> Amount {
        Amount(&self.0 * &rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl Neg for &Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount(-&self.0)
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, rhs: &Amount) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<&Amount> for Amount {
    fn sub_assign(&mut self, rhs: &Amount) {
        self.0 -= &rhs.0;
    }
}

// Wire form is the canonical string so persisted values re-parse to the
// exact same number on any architecture.
impl<C> minicbor::Encode<C> for Amount {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.str(&self.canonical())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Amount {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let s = d.str()?;

        s.parse()
            .map_err(|_| minicbor::decode::Error::message("invalid decimal string"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn canonical_strips_trailing_zeros() {
        assert_eq!(amt("100.00").canonical(), "100");
        assert_eq!(amt("0.500").canonical(), "0.5");
        assert_eq!(amt("-2.250").canonical(), "-2.25");
        assert_eq!(amt("0.000").canonical(), "0");
        assert_eq!(amt("-0").canonical(), "0");
    }

    #[test]
    fn canonical_expands_exponent_notation() {
        assert_eq!(amt("1e3").canonical(), "1000");
        assert_eq!(amt("2.5e-3").canonical(), "0.0025");
    }

    #[test]
    fn value_equality_ignores_representation() {
        assert_eq!(amt("100"), amt("100.00"));
        assert_eq!(amt("1e2"), amt("100"));
        assert_ne!(amt("100"), amt("100.01"));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!("NaN".parse::<Amount>().is_err());
        assert!("inf".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
        assert!("12..5".parse::<Amount>().is_err());
    }

    #[test]
    fn bankers_rounding_ties_to_even() {
        assert_eq!(amt("2.5").round_dp(0), amt("2"));
        assert_eq!(amt("3.5").round_dp(0), amt("4"));
        assert_eq!(amt("0.125").round_dp(2), amt("0.12"));
        assert_eq!(amt("0.135").round_dp(2), amt("0.14"));
        assert_eq!(amt("-2.5").round_dp(0), amt("-2"));
    }

    #[test]
    fn division_requires_nonzero_divisor() {
        assert!(amt("1").checked_div(&amt("0"), 50).is_none());

        let third = amt("1").checked_div(&amt("3"), 50).unwrap();
        // 50 significant digits of 1/3
        assert!(third.canonical().starts_with("0.33333333333333333333"));
    }

    #[test]
    fn arithmetic_is_exact() {
        let a = amt("0.1");
        let b = amt("0.2");
        assert_eq!(&a + &b, amt("0.3"));
        assert_eq!(&b - &a, amt("0.1"));
        assert_eq!(&a * &b, amt("0.02"));
        assert_eq!(-&a, amt("-0.1"));
    }

    #[test]
    fn ordering_is_numeric() {
        assert!(amt("-1") < amt("0"));
        assert!(amt("0.5") < amt("0.50001"));
        assert!(amt("100") > amt("99.999999999999999999999999"));
    }
}
