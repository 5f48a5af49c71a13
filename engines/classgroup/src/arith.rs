//! NUCOMP composition, NUDUPL squaring, and form exponentiation.
//!
//! Both operations follow the Shanks-Atkin scheme: after the usual
//! gcd-and-congruence setup, the coefficient `k` is fed through a partial
//! extended Euclidean reduction that stops as soon as the remainder drops
//! below `L = |D|^(1/4)`, and the composed form is rebuilt from the two small
//! remainder/cofactor pairs instead of the full-size candidate. The rebuilt
//! coefficients satisfy
//!
//! ```text
//! a' = r1*m1 + s1*m2        c' = r2*m1' + s2*m2'
//! b' = -sign(s1*r2 - s2*r1) * (r2*m1 + s2*m2 + r1*m1' + s1*m2')
//! ```
//!
//! where the `m` values are the exact quotients listed inline; the sign fixes
//! the orientation of the `(r, s)` basis, which alternates with each
//! Euclidean step.

use crate::{Form, FormError};
use alloc::borrow::Cow;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

/// Extended gcd: `(g, x, y)` with `g = x*a + y*b` and `g >= 0`.
fn xgcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());
    while !r.is_zero() {
        let q = old_r.div_floor(&r);
        let next_r = &old_r - &q * &r;
        old_r = core::mem::replace(&mut r, next_r);
        let next_s = &old_s - &q * &s;
        old_s = core::mem::replace(&mut s, next_s);
        let next_t = &old_t - &q * &t;
        old_t = core::mem::replace(&mut t, next_t);
    }
    if old_r.is_negative() {
        (-old_r, -old_s, -old_t)
    } else {
        (old_r, old_s, old_t)
    }
}

/// Partial extended Euclid on `(a, k)` with `0 <= k < a`, stopping once the
/// remainder falls below `bound`. Returns `(r2, r1, s2, s1)` with
/// `r2 = s2*k (mod a)`, `r1 = s1*k (mod a)` and `s1*r2 - s2*r1 = +-a`.
fn partial_xgcd(a: &BigInt, k: &BigInt, bound: &BigInt) -> (BigInt, BigInt, BigInt, BigInt) {
    let (mut r2, mut r1) = (a.clone(), k.clone());
    let (mut s2, mut s1) = (BigInt::zero(), BigInt::one());
    while !r1.is_zero() && r1 >= *bound {
        let q = r2.div_floor(&r1);
        let next_r = &r2 - &q * &r1;
        r2 = core::mem::replace(&mut r1, next_r);
        let next_s = &s2 - &q * &s1;
        s2 = core::mem::replace(&mut s1, next_s);
    }
    (r2, r1, s2, s1)
}

/// NUCOMP: compose two reduced forms of the same discriminant and reduce the
/// result. `bound` is the precomputed `L = |D|^(1/4)`.
#[must_use]
pub fn nucomp(f1: &Form, f2: &Form, bound: &BigInt) -> Form {
    let (f1, f2) = if f1.a > f2.a { (f2, f1) } else { (f1, f2) };
    let mut a1 = f1.a.clone();
    let b1 = &f1.b;
    let mut a2 = f2.a.clone();
    let b2 = f2.b.clone();
    let mut c2 = f2.c.clone();

    let two = BigInt::from(2);
    let ss = (b1 + &b2).div_floor(&two);
    let m = (b1 - &b2).div_floor(&two);

    // sp = gcd(a2 mod a1, a1), v1 * (a2 mod a1) = sp (mod a1)
    let t = a2.mod_floor(&a1);
    let (sp, v1) = if t.is_zero() {
        (a1.clone(), BigInt::zero())
    } else {
        let (g, x, _) = xgcd(&t, &a1);
        (g, x.mod_floor(&a1))
    };

    let mut k = (&m * &v1).mod_floor(&a1);
    if !sp.is_one() {
        // s = gcd(a1, a2, ss); fold the common factor out of a1, a2
        let (s, v2, u2) = xgcd(&ss, &sp);
        k = &k * &u2 - &v2 * &c2;
        if !s.is_one() {
            a1 = a1.div_floor(&s);
            a2 = a2.div_floor(&s);
            c2 *= &s;
        }
        k = k.mod_floor(&a1);
    }

    let (ca, cb, cc) = if a1 < *bound {
        let t = &a2 * &k;
        let ca = &a2 * &a1;
        let cb = &b2 + (&t << 1);
        let cc = (&k * (&b2 + &t) + &c2).div_floor(&a1);
        (ca, cb, cc)
    } else {
        let (r2, r1, s2, s1) = partial_xgcd(&a1, &k, bound);
        // all four quotients are exact
        let m1 = (&a2 * &r1 - &m * &s1).div_floor(&a1);
        let m2 = (&ss * &r1 + &c2 * &s1).div_floor(&a1);
        let m1p = (&a2 * &r2 - &m * &s2).div_floor(&a1);
        let m2p = (&ss * &r2 + &c2 * &s2).div_floor(&a1);
        let ca = &r1 * &m1 + &s1 * &m2;
        let cc = &r2 * &m1p + &s2 * &m2p;
        let cb = &r2 * &m1 + &s2 * &m2 + &r1 * &m1p + &s1 * &m2p;
        let orientation = &s1 * &r2 - &s2 * &r1;
        let cb = if orientation.is_positive() { -cb } else { cb };
        (ca, cb, cc)
    };

    let mut out = Form {
        a: ca,
        b: cb,
        c: cc,
    };
    out.reduce();
    out
}

/// NUDUPL: square a reduced form and reduce the result. The squaring case
/// needs only one extended gcd, on `(b, a)`.
#[must_use]
pub fn nudupl(f: &Form, bound: &BigInt) -> Form {
    let (s, v2, _) = xgcd(&f.b, &f.a);
    let a1 = f.a.div_floor(&s);
    let c2 = &f.c * &s;
    let k = (-&v2 * &f.c).mod_floor(&a1);

    let (ca, cb, cc) = if a1 < *bound {
        let t = &a1 * &k;
        let ca = &a1 * &a1;
        let cb = &f.b + (&t << 1);
        let cc = (&k * (&f.b + &t) + &c2).div_floor(&a1);
        (ca, cb, cc)
    } else {
        let (r2, r1, s2, s1) = partial_xgcd(&a1, &k, bound);
        let m2 = (&f.b * &r1 + &c2 * &s1).div_floor(&a1);
        let m2p = (&f.b * &r2 + &c2 * &s2).div_floor(&a1);
        let ca = &r1 * &r1 + &s1 * &m2;
        let cc = &r2 * &r2 + &s2 * &m2p;
        let cb: BigInt = ((&r1 * &r2) << 1) + &s2 * &m2 + &s1 * &m2p;
        let orientation = &s1 * &r2 - &s2 * &r1;
        let cb = if orientation.is_positive() { -cb } else { cb };
        (ca, cb, cc)
    };

    let mut out = Form {
        a: ca,
        b: cb,
        c: cc,
    };
    out.reduce();
    out
}

/// Left-to-right square-and-multiply exponentiation in Cl(D).
///
/// `n = 0` yields the identity; negative exponents are not defined (invert
/// the base first).
///
/// # Errors
///
/// Returns [`FormError::DiscriminantMismatch`] if `d` does not admit an
/// identity form (`D != 1 (mod 4)`).
pub fn fast_pow(x: &Form, d: &BigInt, n: &BigUint, bound: &BigInt) -> Result<Form, FormError> {
    if n.is_zero() {
        return Form::identity(d);
    }
    let mut acc = Cow::Borrowed(x);
    for i in (0..n.bits() - 1).rev() {
        let mut next = nudupl(&acc, bound);
        if n.bit(i) {
            next = nucomp(&next, x, bound);
        }
        acc = Cow::Owned(next);
    }
    Ok(acc.into_owned())
}
