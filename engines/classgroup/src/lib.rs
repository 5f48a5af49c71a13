//! Class-group engine: binary quadratic forms over imaginary quadratic fields
//!
//! Elements of the class group Cl(D) are represented by reduced binary
//! quadratic forms `(a, b, c)` with `b^2 - 4ac = D` for a negative prime
//! discriminant D. Composition and squaring use the NUCOMP/NUDUPL variants,
//! which keep intermediate operands near `|D|^(1/2)` by partially reducing
//! the extended-gcd remainder sequence at `L = |D|^(1/4)`.
//!
//! Forms are plain values: three `BigInt` coordinates, cheap to clone, with
//! no shared state between operations.

#![no_std]
#![deny(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;
use khronos_crypto::{to_be_bytes_padded, CryptoError};
use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

mod arith;

pub use arith::{fast_pow, nucomp, nudupl};

/// Errors raised by form construction and (de)serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    /// Serialized form has the wrong byte length for this discriminant
    InvalidLength,
    /// Sign byte is neither 0 nor 1, or `a` is not positive
    InvalidEncoding,
    /// Coordinates do not satisfy `b^2 - 4ac = D` over the integers
    DiscriminantMismatch,
    /// Decoded form violates the reduced-form invariants
    NotReduced,
    /// A coordinate does not fit the fixed serialization width
    IntegerTooWide,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength => write!(f, "wrong serialized form length"),
            Self::InvalidEncoding => write!(f, "malformed form encoding"),
            Self::DiscriminantMismatch => write!(f, "discriminant identity not satisfied"),
            Self::NotReduced => write!(f, "form is not reduced"),
            Self::IntegerTooWide => write!(f, "coordinate exceeds serialization width"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormError {}

impl From<CryptoError> for FormError {
    fn from(_: CryptoError) -> Self {
        Self::IntegerTooWide
    }
}

// ——— Form ————————————————————————————————————————————————————————————————

/// A binary quadratic form `a*x^2 + b*x*y + c*y^2`.
///
/// Public operations keep forms reduced; constructors reduce their result
/// before returning it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Form {
    /// Leading coefficient, positive for reduced forms
    pub a: BigInt,
    /// Middle coefficient, `-a < b <= a` for reduced forms
    pub b: BigInt,
    /// Trailing coefficient, determined by `(b^2 - D) / 4a`
    pub c: BigInt,
}

impl Form {
    /// The identity of Cl(D): `(1, 1, (1 - D)/4)`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::DiscriminantMismatch`] unless `D = 1 (mod 4)`.
    pub fn identity(d: &BigInt) -> Result<Self, FormError> {
        let num = BigInt::one() - d;
        let four = BigInt::from(4);
        if !num.mod_floor(&four).is_zero() {
            return Err(FormError::DiscriminantMismatch);
        }
        Ok(Self {
            a: BigInt::one(),
            b: BigInt::one(),
            c: num.div_floor(&four),
        })
    }

    /// A presumed-large-order element of Cl(D): `(2, 1, (1 - D)/8)`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::DiscriminantMismatch`] unless `D = 1 (mod 8)`.
    pub fn generator(d: &BigInt) -> Result<Self, FormError> {
        let num = BigInt::one() - d;
        let eight = BigInt::from(8);
        if !num.mod_floor(&eight).is_zero() {
            return Err(FormError::DiscriminantMismatch);
        }
        Ok(Self {
            a: BigInt::from(2),
            b: BigInt::one(),
            c: num.div_floor(&eight),
        })
    }

    /// Build the reduced form with leading coordinates `(a, b)` and the
    /// trailing coordinate recomputed from the discriminant.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidEncoding`] if `a` is not positive and
    /// [`FormError::DiscriminantMismatch`] if `4a` does not divide `b^2 - D`.
    pub fn from_ab(d: &BigInt, a: BigInt, b: BigInt) -> Result<Self, FormError> {
        if !a.is_positive() {
            return Err(FormError::InvalidEncoding);
        }
        let num = &b * &b - d;
        let four_a = &a * 4;
        if !num.mod_floor(&four_a).is_zero() {
            return Err(FormError::DiscriminantMismatch);
        }
        let mut f = Self {
            c: num.div_floor(&four_a),
            a,
            b,
        };
        f.reduce();
        Ok(f)
    }

    /// The discriminant `b^2 - 4ac` of this form.
    #[must_use]
    pub fn discriminant(&self) -> BigInt {
        &self.b * &self.b - BigInt::from(4) * &self.a * &self.c
    }

    /// The inverse class: `(a, -b, c)`, reduced.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let mut f = Self {
            a: self.a.clone(),
            b: -&self.b,
            c: self.c.clone(),
        };
        f.reduce();
        f
    }

    /// Whether `-a < b <= a`.
    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.b > -&self.a && self.b <= self.a
    }

    /// Whether the reduced-form invariants hold:
    /// `a > 0`, `-a < b <= a`, `a <= c`, and `b >= 0` when `a = c`.
    #[must_use]
    pub fn is_reduced(&self) -> bool {
        self.a.is_positive()
            && self.is_normal()
            && self.a <= self.c
            && !(self.a == self.c && self.b.is_negative())
    }

    /// Shift `b` into the window `-a < b <= a`, adjusting `c` to preserve the
    /// discriminant.
    pub fn normalize(&mut self) {
        if self.is_normal() {
            return;
        }
        let two_a = &self.a << 1;
        let r = (&self.a - &self.b).div_floor(&two_a);
        let ra = &r * &self.a;
        self.c = &ra * &r + &self.b * &r + &self.c;
        self.b += &ra << 1;
    }

    /// Reduce this form to the canonical representative of its class.
    ///
    /// Alternates swap steps `(a, b, c) -> (c, -b, a)` with normalization
    /// until the invariants of [`Form::is_reduced`] hold; the coefficient
    /// sizes shrink geometrically, so the loop terminates after
    /// O(log max(|a|, |c|)) rounds.
    pub fn reduce(&mut self) {
        self.normalize();
        while self.a > self.c || (self.a == self.c && self.b.is_negative()) {
            core::mem::swap(&mut self.a, &mut self.c);
            self.b = -&self.b;
            self.normalize();
        }
    }

    // ——— Serialization ———————————————————————————————————————————————————

    /// Serialized size in bytes of any form at discriminant `d`.
    #[must_use]
    pub fn size_for(d: &BigInt) -> usize {
        1 + 2 * d_size_bytes(d)
    }

    /// Encode as `sign(b) || a || |b|` with both integers big-endian at the
    /// fixed width `ceil(num_bits(D) / 8)`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidEncoding`] for non-positive `a` and
    /// [`FormError::IntegerTooWide`] if a coordinate exceeds the width.
    pub fn serialize(&self, d: &BigInt) -> Result<Vec<u8>, FormError> {
        if !self.a.is_positive() {
            return Err(FormError::InvalidEncoding);
        }
        let width = d_size_bytes(d);
        let mut out = Vec::with_capacity(1 + 2 * width);
        out.push(u8::from(self.b.is_negative()));
        out.extend_from_slice(&to_be_bytes_padded(self.a.magnitude(), width)?);
        out.extend_from_slice(&to_be_bytes_padded(self.b.magnitude(), width)?);
        Ok(out)
    }

    /// Decode a form serialized by [`Form::serialize`], recomputing `c` from
    /// the discriminant and revalidating every invariant.
    ///
    /// # Errors
    ///
    /// Any malformed input is rejected: wrong length, bad sign byte, zero
    /// `a`, a non-integral `c`, or a form that is not reduced.
    pub fn deserialize(data: &[u8], d: &BigInt) -> Result<Self, FormError> {
        let width = d_size_bytes(d);
        if data.len() != 1 + 2 * width {
            return Err(FormError::InvalidLength);
        }
        let sign = data[0];
        if sign > 1 {
            return Err(FormError::InvalidEncoding);
        }
        let a = BigInt::from_bytes_be(Sign::Plus, &data[1..1 + width]);
        if a.is_zero() {
            return Err(FormError::InvalidEncoding);
        }
        let mut b = BigInt::from_bytes_be(Sign::Plus, &data[1 + width..]);
        if sign == 1 {
            b = -b;
        }
        let num = &b * &b - d;
        let four_a = &a * 4;
        if !num.mod_floor(&four_a).is_zero() {
            return Err(FormError::DiscriminantMismatch);
        }
        let f = Self {
            c: num.div_floor(&four_a),
            a,
            b,
        };
        if !f.is_reduced() {
            return Err(FormError::NotReduced);
        }
        Ok(f)
    }
}

// ——— Discriminant helpers ————————————————————————————————————————————————

/// Width in bytes of one serialized coordinate at discriminant `d`.
#[inline]
#[must_use]
pub fn d_size_bytes(d: &BigInt) -> usize {
    let bits = d.magnitude().bits().max(1);
    ((bits + 7) / 8) as usize
}

/// The partial-reduction bound `L = floor(|D|^(1/4))` used by NUCOMP/NUDUPL.
#[must_use]
pub fn partial_bound(d: &BigInt) -> BigInt {
    BigInt::from_biguint(Sign::Plus, d.magnitude().nth_root(4))
}
