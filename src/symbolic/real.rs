//! # Real numbers
//!
//! Arbitrary precision rational constants used by the expression core. Arithmetic on
//! `+`, `-`, `*` is exact; division is checked; powers are exact for integer exponents
//! and fall back to `f64` otherwise. Transcendental functions go through `f64` and
//! report non-finite results as `None`, so callers can keep the symbolic form.
use num::bigint::BigInt;
use num::rational::BigRational;
use num::{Integer, Signed};
use num_traits::{FromPrimitive, One, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// integer powers above this magnitude are computed in floating point
const MAX_EXACT_EXPONENT: i64 = 4096;
/// denominators above this are printed as decimals
/// largest `n` whose factorial is computed exactly
pub const MAX_EXACT_FACTORIAL: u64 = 3000;
const MAX_PRINTED_DENOMINATOR: i64 = 1_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Real(BigRational);

impl Real {
    pub fn zero() -> Real {
        Real(BigRational::zero())
    }
    pub fn one() -> Real {
        Real(BigRational::one())
    }
    pub fn from_integer(i: i64) -> Real {
        Real(BigRational::from_integer(BigInt::from(i)))
    }
    pub fn from_bigint(i: BigInt) -> Real {
        Real(BigRational::from_integer(i))
    }
    /// `numer/denom`, `None` for a zero denominator
    pub fn ratio(numer: i64, denom: i64) -> Option<Real> {
        if denom == 0 {
            return None;
        }
        Some(Real(BigRational::new(BigInt::from(numer), BigInt::from(denom))))
    }
    /// exact conversion of a finite float, `None` for NaN and infinities
    pub fn from_f64(x: f64) -> Option<Real> {
        if !x.is_finite() {
            return None;
        }
        BigRational::from_f64(x).map(Real)
    }
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
    pub fn as_ratio(&self) -> &BigRational {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }
    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }
    pub fn abs(&self) -> Real {
        Real(self.0.abs())
    }
    pub fn signum(&self) -> i32 {
        match self.0.cmp(&BigRational::zero()) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }
    /// integer value when it fits into `i64`
    pub fn to_i64(&self) -> Option<i64> {
        if self.is_integer() {
            self.0.numer().to_i64()
        } else {
            None
        }
    }

    pub fn checked_div(&self, other: &Real) -> Option<Real> {
        if other.is_zero() {
            None
        } else {
            Some(Real(&self.0 / &other.0))
        }
    }
    pub fn recip(&self) -> Option<Real> {
        Real::one().checked_div(self)
    }

    /// `self^exponent`, exact for moderate integer exponents.
    /// Returns `None` when the power is undefined (`0^-1`) or not a finite real (`(-1)^(1/2)`).
    pub fn pow(&self, exponent: &Real) -> Option<Real> {
        if let Some(n) = exponent.to_i64() {
            if n.unsigned_abs() <= MAX_EXACT_EXPONENT as u64 {
                if n < 0 && self.is_zero() {
                    return None;
                }
                return Some(Real(self.0.pow(n as i32)));
            }
        }
        let exact_root = exponent.is_one_half().then(|| self.exact_sqrt()).flatten();
        if exact_root.is_some() {
            return exact_root;
        }
        Real::from_f64(self.to_f64().powf(exponent.to_f64()))
    }

    fn is_one_half(&self) -> bool {
        self.0 == BigRational::new(BigInt::one(), BigInt::from(2))
    }

    fn exact_sqrt(&self) -> Option<Real> {
        if self.is_negative() {
            return None;
        }
        let n = self.0.numer().sqrt();
        let d = self.0.denom().sqrt();
        if &(&n * &n) == self.0.numer() && &(&d * &d) == self.0.denom() {
            Some(Real(BigRational::new(n, d)))
        } else {
            None
        }
    }

    pub fn sqrt(&self) -> Option<Real> {
        if self.is_negative() {
            return None;
        }
        self.exact_sqrt()
            .or_else(|| Real::from_f64(self.to_f64().sqrt()))
    }

    /// applies a floating point function, `None` for non-finite results
    pub fn map_f64(&self, f: impl Fn(f64) -> f64) -> Option<Real> {
        Real::from_f64(f(self.to_f64()))
    }

    pub fn floor(&self) -> Real {
        Real(self.0.floor())
    }
    pub fn ceil(&self) -> Real {
        Real(self.0.ceil())
    }
    pub fn round(&self) -> Real {
        Real(self.0.round())
    }

    /// `n!` for non-negative integers
    /// `n!` for `0 <= n <= MAX_EXACT_FACTORIAL`
    pub fn factorial(&self) -> Option<Real> {
        if !self.is_integer() || self.is_negative() {
            return None;
        }
        let n = self.0.numer().to_u64().filter(|n| *n <= MAX_EXACT_FACTORIAL)?;
        let mut acc = BigInt::one();
        for k in 2..=n {
            acc *= BigInt::from(k);
        }
        Some(Real::from_bigint(acc))
    }

    /// `true` for the integers `1, 2, 3, ...`
    pub fn is_natural(&self) -> bool {
        self.is_integer() && !self.is_negative() && !self.is_zero()
    }

    pub fn is_even_integer(&self) -> bool {
        self.is_integer() && self.0.numer().is_even()
    }
}

impl From<i64> for Real {
    fn from(i: i64) -> Real {
        Real::from_integer(i)
    }
}
impl From<i32> for Real {
    fn from(i: i32) -> Real {
        Real::from_integer(i as i64)
    }
}

impl Add for Real {
    type Output = Real;
    fn add(self, rhs: Real) -> Real {
        Real(self.0 + rhs.0)
    }
}
impl<'a> Add<&'a Real> for &'a Real {
    type Output = Real;
    fn add(self, rhs: &Real) -> Real {
        Real(&self.0 + &rhs.0)
    }
}
impl Sub for Real {
    type Output = Real;
    fn sub(self, rhs: Real) -> Real {
        Real(self.0 - rhs.0)
    }
}
impl<'a> Sub<&'a Real> for &'a Real {
    type Output = Real;
    fn sub(self, rhs: &Real) -> Real {
        Real(&self.0 - &rhs.0)
    }
}
impl Mul for Real {
    type Output = Real;
    fn mul(self, rhs: Real) -> Real {
        Real(self.0 * rhs.0)
    }
}
impl<'a> Mul<&'a Real> for &'a Real {
    type Output = Real;
    fn mul(self, rhs: &Real) -> Real {
        Real(&self.0 * &rhs.0)
    }
}
impl Neg for Real {
    type Output = Real;
    fn neg(self) -> Real {
        Real(-self.0)
    }
}
impl Neg for &Real {
    type Output = Real;
    fn neg(self) -> Real {
        Real(-&self.0)
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.0.numer())
        } else if self.0.denom() <= &BigInt::from(MAX_PRINTED_DENOMINATOR) {
            write!(f, "{}/{}", self.0.numer(), self.0.denom())
        } else {
            write!(f, "{}", self.to_f64())
        }
    }
}
