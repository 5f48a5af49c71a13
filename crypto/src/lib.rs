//! Cryptographic foundations for the Khronos VDF
//!
//! This crate provides the deterministic derivation pipeline shared by the
//! class-group and VDF engines: counter-mode SHA-256 expansion, hash-to-integer,
//! hash-to-prime, and discriminant derivation, together with the fixed-width
//! big-endian integer encoding used on the wire.
//!
//! All derivations are byte-precise: identical seeds yield identical outputs.

#![no_std]
#![deny(missing_docs)]
#![deny(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};

/// Cryptographic errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Requested bit length is zero or not a multiple of 8
    InvalidBitLength,
    /// A pinned bit position lies outside the requested width
    BitOutOfRange,
    /// Integer does not fit the requested fixed width
    IntegerTooWide,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBitLength => write!(f, "bit length must be a positive multiple of 8"),
            Self::BitOutOfRange => write!(f, "pinned bit position outside requested width"),
            Self::IntegerTooWide => write!(f, "integer does not fit the requested width"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CryptoError {}

// ——— Integer encoding utilities ———————————————————————————————————————————

/// Export an unsigned integer as big-endian bytes, left-padded with zeros to
/// exactly `width` bytes.
///
/// # Errors
///
/// Returns [`CryptoError::IntegerTooWide`] if the magnitude needs more than
/// `width` bytes.
pub fn to_be_bytes_padded(n: &BigUint, width: usize) -> Result<Vec<u8>, CryptoError> {
    let raw = n.to_bytes_be();
    if raw.len() > width {
        return Err(CryptoError::IntegerTooWide);
    }
    let mut out = Vec::with_capacity(width);
    out.resize(width - raw.len(), 0);
    out.extend_from_slice(&raw);
    Ok(out)
}

/// Import an unsigned big-endian byte string.
#[inline]
#[must_use]
pub fn from_be_bytes(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Import a discriminant from its wire form: the unsigned big-endian
/// magnitude, with the sign implicitly negative.
#[inline]
#[must_use]
pub fn discriminant_from_bytes(bytes: &[u8]) -> BigInt {
    -BigInt::from_bytes_be(Sign::Plus, bytes)
}

// ——— Counter-mode SHA-256 expansion ———————————————————————————————————————

/// SHA-256 of a single byte string.
#[inline]
#[must_use]
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Increment a byte string in place, treating it as a big-endian counter.
fn increment(sprout: &mut [u8]) {
    for byte in sprout.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
}

/// Produce `n_bytes` of digest output by hashing successive increments of the
/// seed copy. The sprout state carries over between calls so that repeated
/// expansions (e.g. successive prime candidates) never repeat a digest.
fn expand(sprout: &mut Vec<u8>, n_bytes: usize) -> Vec<u8> {
    let mut blob = Vec::with_capacity(n_bytes);
    while blob.len() < n_bytes {
        increment(sprout);
        let digest = sha256(sprout);
        let take = core::cmp::min(digest.len(), n_bytes - blob.len());
        blob.extend_from_slice(&digest[..take]);
    }
    blob
}

fn check_bits(n_bits: usize) -> Result<usize, CryptoError> {
    if n_bits == 0 || n_bits % 8 != 0 {
        return Err(CryptoError::InvalidBitLength);
    }
    Ok(n_bits / 8)
}

/// Derive a deterministic unsigned integer of exactly `n_bits` bits from a
/// seed. The expansion is truncated to `n_bits` and the top bit is forced to 1
/// so the result always has full width.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidBitLength`] unless `n_bits` is a positive
/// multiple of 8.
pub fn hash_int(seed: &[u8], n_bits: usize) -> Result<BigUint, CryptoError> {
    let n_bytes = check_bits(n_bits)?;
    let mut sprout = seed.to_vec();
    let blob = expand(&mut sprout, n_bytes);
    let mut x = BigUint::from_bytes_be(&blob);
    x |= BigUint::one() << (n_bits - 1);
    Ok(x)
}

/// Derive a deterministic probable prime of `n_bits` bits from a seed.
///
/// Candidates are drawn like [`hash_int`], with the bits listed in
/// `fixed_bits` forced to 1 before the primality test; the first candidate to
/// pass Miller-Rabin is returned. Callers pin the top bit to fix the width.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidBitLength`] unless `n_bits` is a positive
/// multiple of 8, and [`CryptoError::BitOutOfRange`] if a pinned position is
/// not below `n_bits`.
pub fn hash_prime(seed: &[u8], n_bits: usize, fixed_bits: &[usize]) -> Result<BigUint, CryptoError> {
    let n_bytes = check_bits(n_bits)?;
    if fixed_bits.iter().any(|&b| b >= n_bits) {
        return Err(CryptoError::BitOutOfRange);
    }
    let mut sprout = seed.to_vec();
    loop {
        let blob = expand(&mut sprout, n_bytes);
        let mut x = BigUint::from_bytes_be(&blob);
        for &b in fixed_bits {
            x |= BigUint::one() << b;
        }
        if is_probable_prime(&x) {
            return Ok(x);
        }
    }
}

// ——— Primality ————————————————————————————————————————————————————————————

/// Odd primes below 100, used for cheap trial division before Miller-Rabin.
const SMALL_PRIMES: [u32; 24] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Fixed Miller-Rabin witness set: the first thirty primes.
const MR_WITNESSES: [u32; 30] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113,
];

/// Miller-Rabin probable-prime test with a fixed witness set.
///
/// The witness set is part of the wire format: every implementation must
/// accept and reject the same candidates for derivations to agree.
#[must_use]
pub fn is_probable_prime(n: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }
    if n.is_even() {
        return *n == two;
    }
    for p in SMALL_PRIMES {
        let p = BigUint::from(p);
        if *n == p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }
    let one = BigUint::one();
    let n_minus_1 = n - &one;
    let r = n_minus_1
        .trailing_zeros()
        .expect("n - 1 is nonzero for n >= 3");
    let d = &n_minus_1 >> r;
    'witness: for a in MR_WITNESSES {
        let a = BigUint::from(a);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_1 {
            continue;
        }
        for _ in 1..r {
            x = (&x * &x) % n;
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

// ——— Discriminant derivation ——————————————————————————————————————————————

/// Minimum discriminant width accepted by [`create_discriminant`].
pub const MIN_DISCRIMINANT_BITS: usize = 16;

/// Derive a negative prime discriminant of exactly `n_bits` bits from a seed.
///
/// The magnitude is `hash_prime(seed || 0x00, n_bits)` with the top two bits
/// and the low three bits pinned, so every candidate already satisfies
/// `|D| = 7 (mod 8)` (equivalently `D = 1 (mod 8)`) at full width.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidBitLength`] unless `n_bits` is a multiple of
/// 8 no smaller than [`MIN_DISCRIMINANT_BITS`].
pub fn create_discriminant(seed: &[u8], n_bits: usize) -> Result<BigInt, CryptoError> {
    if n_bits < MIN_DISCRIMINANT_BITS {
        return Err(CryptoError::InvalidBitLength);
    }
    let mut extended = Vec::with_capacity(seed.len() + 1);
    extended.extend_from_slice(seed);
    extended.push(0x00);
    let p = hash_prime(&extended, n_bits, &[0, 1, 2, n_bits - 2, n_bits - 1])?;
    Ok(-BigInt::from(p))
}

// ——— Tests ————————————————————————————————————————————————————————————————
