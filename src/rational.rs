//! Exact fractions for TIFF RATIONAL / SRATIONAL values.
//!
//! A zero denominator is a legal value, not a fault. `0/0` behaves as zero
//! for every numeric coercion and is its own reciprocal.

use std::fmt;

use serde::Serialize;

/// An immutable numerator/denominator pair.
///
/// The derived `PartialEq` compares terms exactly, so `1/2 != 2/4`.
/// Use [`Rational::equals_value`] to compare by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rational {
    numerator: i64,
    denominator: i64,
}

impl Rational {
    /// Create a rational. No validation is performed.
    pub const fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    #[inline]
    pub const fn numerator(&self) -> i64 {
        self.numerator
    }

    #[inline]
    pub const fn denominator(&self) -> i64 {
        self.denominator
    }

    /// Value as a double. A zero numerator yields `0.0` regardless of the
    /// denominator.
    pub fn to_f64(&self) -> f64 {
        if self.numerator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }

    pub fn to_f32(&self) -> f32 {
        if self.numerator == 0 {
            0.0
        } else {
            self.numerator as f32 / self.denominator as f32
        }
    }

    /// Truncating integer conversion. Saturates for `n/0`.
    pub fn to_i64(&self) -> i64 {
        self.to_f64() as i64
    }

    pub fn to_i32(&self) -> i32 {
        self.to_f64() as i32
    }

    /// Swap numerator and denominator.
    pub const fn reciprocal(&self) -> Self {
        Self::new(self.denominator, self.numerator)
    }

    /// `true` when the value is a whole number, including `0/0`.
    pub fn is_integer(&self) -> bool {
        self.denominator == 1
            || (self.denominator != 0 && self.numerator.wrapping_rem(self.denominator) == 0)
            || (self.denominator == 0 && self.numerator == 0)
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0 || self.denominator == 0
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && (self.numerator > 0) == (self.denominator > 0)
    }

    /// Divide both terms by their GCD and move any negative sign to the
    /// numerator. `0/0` is returned unchanged.
    pub fn simplified(&self) -> Self {
        let gcd = gcd(self.numerator.unsigned_abs(), self.denominator.unsigned_abs());
        if gcd == 0 {
            return *self;
        }

        // gcd divides both magnitudes, so the quotients fit back into i64
        // except for the i64::MIN / 1 corner, which wrapping keeps stable.
        let gcd = gcd as i64;
        let mut numerator = self.numerator.wrapping_div(gcd);
        let mut denominator = self.denominator.wrapping_div(gcd);
        if denominator < 0 {
            numerator = numerator.wrapping_neg();
            denominator = denominator.wrapping_neg();
        }
        Self::new(numerator, denominator)
    }

    /// Identical numerator and denominator.
    pub fn equals_exact(&self, other: &Rational) -> bool {
        self == other
    }

    /// Same value, compared by cross-multiplication.
    pub fn equals_value(&self, other: &Rational) -> bool {
        self.numerator as i128 * other.denominator as i128
            == other.numerator as i128 * self.denominator as i128
    }

    /// Render compactly: whole numbers as a bare integer; terminating
    /// fractions as a decimal when `allow_decimal` is set; anything else as
    /// the simplified `num/den`.
    pub fn to_simple_string(&self, allow_decimal: bool) -> String {
        if self.denominator == 0 && self.numerator != 0 {
            return self.to_string();
        }
        if self.is_integer() {
            // i128 holds i64::MIN / -1
            return match self.denominator {
                0 => "0".to_string(),
                d => (i128::from(self.numerator) / i128::from(d)).to_string(),
            };
        }

        let simplified = self.simplified();
        if allow_decimal && is_terminating_denominator(simplified.denominator) {
            return format!("{}", simplified.to_f64());
        }
        simplified.to_string()
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl From<(i64, i64)> for Rational {
    fn from((numerator, denominator): (i64, i64)) -> Self {
        Self::new(numerator, denominator)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Only 2 and 5 as prime factors, so the decimal expansion terminates.
fn is_terminating_denominator(denominator: i64) -> bool {
    let mut d = denominator.unsigned_abs();
    if d == 0 {
        return false;
    }
    while d % 2 == 0 {
        d /= 2;
    }
    while d % 5 == 0 {
        d /= 5;
    }
    d == 1
}
