//! VDF engine: Wesolowski proofs of sequential work over class groups
//!
//! Given a negative prime discriminant D and an input form x, the evaluator
//! computes `y = x^(2^T)` by T sequential NUDUPL squarings while storing
//! checkpoint forms every `k*l` steps. The prover turns those checkpoints
//! into a single proof form `pi = x^floor(2^T / B)` using the two-dimensional
//! block decomposition, where B is a 264-bit challenge prime derived from
//! (x, y) by Fiat-Shamir. Verification checks `pi^B * x^(2^T mod B) = y`
//! with ~O(log T) group operations.
//!
//! All operations are pure in their arguments and synchronous on the caller;
//! the only outside interaction is the cooperative cancellation probe polled
//! by the evaluator every 2^16 squarings.

#![no_std]
#![deny(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use khronos_classgroup::{fast_pow, nucomp, nudupl, partial_bound, Form, FormError};
use khronos_crypto::{hash_prime, CryptoError};
use num_bigint::{BigInt, BigUint};
use num_traits::{Float, One, ToPrimitive};

pub mod api;

// Re-export the pieces callers need alongside the pipeline.
pub use khronos_classgroup as classgroup;
pub use khronos_crypto::create_discriminant;

/// Protocol constants
pub mod constants {
    /// Bit length of the Wesolowski challenge prime B.
    pub const B_BITS: usize = 264;
    /// Memory budget exponent for the (k, l) heuristic, roughly 10 MiB of
    /// checkpoint forms. Changing it regenerates different checkpoints but
    /// identical proof bytes (pi depends only on x, y, T and B).
    pub const LOG_MEM: f64 = 23.253_496_66;
    /// The evaluator polls its cancellation probe whenever
    /// `i & (CANCEL_PROBE_INTERVAL - 1) == 0`.
    pub const CANCEL_PROBE_INTERVAL: u64 = 1 << 16;
}

/// VDF errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VdfError {
    /// Malformed bytes, unreduced form, or mismatched discriminant
    InvalidInput,
    /// The evaluator observed `should_continue() == false`
    Cancelled,
    /// An internal arithmetic bound was violated (logic error, not data)
    Arithmetic,
}

impl fmt::Display for VdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid input"),
            Self::Cancelled => write!(f, "evaluation cancelled"),
            Self::Arithmetic => write!(f, "internal arithmetic bound violated"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VdfError {}

impl From<FormError> for VdfError {
    fn from(_: FormError) -> Self {
        Self::InvalidInput
    }
}

impl From<CryptoError> for VdfError {
    fn from(_: CryptoError) -> Self {
        Self::InvalidInput
    }
}

// ——— Parameter heuristic —————————————————————————————————————————————————

/// Pick the proof parameters `(k, l)` for an iteration count.
///
/// `l` caps checkpoint memory (one stored form per `k*l` squarings stays
/// near the [`constants::LOG_MEM`] budget); `k` balances the block count
/// against the `2^(k/2)` bucket products per outer round. Both are at
/// least 1. Correctness never depends on the exact values: the evaluator
/// and prover only have to agree, which they do by deriving the pair from
/// the same `T`.
#[must_use]
pub fn approximate_parameters(iterations: u64) -> (u64, u64) {
    if iterations == 0 {
        return (1, 1);
    }
    let log_t = Float::log2(iterations as f64);
    let l = if log_t - constants::LOG_MEM > 1e-6 {
        Float::ceil(Float::powf(2f64, constants::LOG_MEM - 20.0)) as u64
    } else {
        1
    };
    let m = (iterations as f64) * 0.693_147_1 / (2.0 * l as f64);
    let k = if m <= 1.0 {
        1
    } else {
        let guess = Float::ln(m) - Float::ln(Float::ln(m)) + 0.25;
        Float::round(guess).max(1.0) as u64
    };
    (k, l)
}

// ——— Evaluator ———————————————————————————————————————————————————————————

/// Compute `y = x^(2^T)` while storing a checkpoint form every `k*l`
/// squarings; checkpoint `i` is the state before squaring number `i*k*l`,
/// i.e. `x^(2^(i*k*l))`.
///
/// The probe is polled every [`constants::CANCEL_PROBE_INTERVAL`] squarings;
/// a refusal aborts with no partial output.
///
/// # Errors
///
/// [`VdfError::Cancelled`] if the probe returned false.
pub fn evaluate_with_intermediates<F>(
    d: &BigInt,
    x: &Form,
    iterations: u64,
    should_continue: F,
) -> Result<(Form, Vec<Form>), VdfError>
where
    F: Fn() -> bool,
{
    let bound = partial_bound(d);
    let (k, l) = approximate_parameters(iterations);
    let kl = k * l;
    let mut y = x.clone();
    y.reduce();
    let mut intermediates = Vec::with_capacity(iterations.div_ceil(kl) as usize);
    for i in 0..iterations {
        if i % kl == 0 {
            intermediates.push(y.clone());
        }
        y = nudupl(&y, &bound);
        if (i & (constants::CANCEL_PROBE_INTERVAL - 1)) == 0 && !should_continue() {
            return Err(VdfError::Cancelled);
        }
    }
    Ok((y, intermediates))
}

/// Compute `y = x^(2^T)` without storing checkpoints.
///
/// # Errors
///
/// [`VdfError::Cancelled`] if the probe returned false.
pub fn evaluate_only<F>(
    d: &BigInt,
    x: &Form,
    iterations: u64,
    should_continue: F,
) -> Result<Form, VdfError>
where
    F: Fn() -> bool,
{
    let bound = partial_bound(d);
    let mut y = x.clone();
    y.reduce();
    for i in 0..iterations {
        y = nudupl(&y, &bound);
        if (i & (constants::CANCEL_PROBE_INTERVAL - 1)) == 0 && !should_continue() {
            return Err(VdfError::Cancelled);
        }
    }
    Ok(y)
}

// ——— Wesolowski prover ———————————————————————————————————————————————————

/// Derive the challenge prime `B` from the fixed-width serializations of x
/// and y: a 264-bit hash-prime with the top bit pinned.
///
/// # Errors
///
/// [`VdfError::InvalidInput`] if a form does not serialize at this
/// discriminant's width.
pub fn get_b(d: &BigInt, x: &Form, y: &Form) -> Result<BigUint, VdfError> {
    let mut seed = x.serialize(d)?;
    seed.extend_from_slice(&y.serialize(d)?);
    Ok(hash_prime(&seed, constants::B_BITS, &[constants::B_BITS - 1])?)
}

/// The k-bit block of `floor(2^T / B)` at block position `i` (position 0 is
/// least significant), computed as `floor((2^(T - k(i+1)) mod B) * 2^k / B)`.
/// Callers guarantee `T >= k * (i + 1)`.
#[must_use]
pub fn get_block(i: u64, k: u64, iterations: u64, b: &BigUint) -> u64 {
    let exp = BigUint::from(iterations - k * (i + 1));
    let r = BigUint::from(2u32).modpow(&exp, b);
    ((r << k) / b).to_u64().unwrap_or(0)
}

/// Produce the proof form `pi = x^floor(2^T / B)` from stored checkpoints
/// using the (k, l) block decomposition.
///
/// For each of the `l` outer rounds, checkpoint forms are bucketed by their
/// k-bit quotient block, and the bucket products are folded with exponents
/// split as `k = k0 + k1`, costing `O(2^(k/2))` fast-pow calls per round
/// instead of `O(2^k)`.
///
/// # Errors
///
/// [`VdfError::InvalidInput`] if `k` or `l` is zero, `k` is unusably large,
/// or too few checkpoints were supplied for this `(T, k, l)`.
pub fn generate_wesolowski(
    d: &BigInt,
    x: &Form,
    y: &Form,
    intermediates: &[Form],
    iterations: u64,
    k: u64,
    l: u64,
) -> Result<Form, VdfError> {
    if k == 0 || l == 0 || k >= u64::from(usize::BITS) {
        return Err(VdfError::InvalidInput);
    }
    let num_chunks = iterations.div_ceil(k * l);
    if num_chunks as usize > intermediates.len() {
        return Err(VdfError::InvalidInput);
    }

    let bound = partial_bound(d);
    let b = get_b(d, x, y)?;
    let k1 = k / 2;
    let k0 = k - k1;
    let identity = Form::identity(d)?;

    let mut pi = identity.clone();
    let mut ys: Vec<Form> = vec![identity.clone(); 1usize << k];

    for j in (0..l).rev() {
        pi = fast_pow(&pi, d, &(BigUint::one() << k), &bound)?;
        for slot in &mut ys {
            *slot = identity.clone();
        }

        // bucket each checkpoint by its quotient block for this round
        for i in 0..num_chunks {
            if iterations >= k * (i * l + j + 1) {
                let block = get_block(i * l + j, k, iterations, &b);
                let idx = usize::try_from(block)
                    .ok()
                    .filter(|&idx| idx < ys.len())
                    .ok_or(VdfError::Arithmetic)?;
                ys[idx] = nucomp(&ys[idx], &intermediates[i as usize], &bound);
            }
        }

        // fold buckets, splitting each block exponent as b1*2^k0 + b0
        for b1 in 0..(1u64 << k1) {
            let mut z = identity.clone();
            for b0 in 0..(1u64 << k0) {
                z = nucomp(&z, &ys[(b1 << k0 | b0) as usize], &bound);
            }
            z = fast_pow(&z, d, &BigUint::from(b1 << k0), &bound)?;
            pi = nucomp(&pi, &z, &bound);
        }
        for b0 in 0..(1u64 << k0) {
            let mut z = identity.clone();
            for b1 in 0..(1u64 << k1) {
                z = nucomp(&z, &ys[(b1 << k0 | b0) as usize], &bound);
            }
            z = fast_pow(&z, d, &BigUint::from(b0), &bound)?;
            pi = nucomp(&pi, &z, &bound);
        }
    }
    Ok(pi)
}

/// Evaluate and prove in one call: `T` squarings with checkpoints, then the
/// block prover. Returns `(y, pi)`.
///
/// # Errors
///
/// [`VdfError::Cancelled`] if the probe refused mid-evaluation; any input
/// error from the underlying stages.
pub fn prove<F>(
    d: &BigInt,
    x: &Form,
    iterations: u64,
    should_continue: F,
) -> Result<(Form, Form), VdfError>
where
    F: Fn() -> bool,
{
    let (k, l) = approximate_parameters(iterations);
    let (y, intermediates) = evaluate_with_intermediates(d, x, iterations, should_continue)?;
    let pi = generate_wesolowski(d, x, &y, &intermediates, iterations, k, l)?;
    Ok((y, pi))
}

/// Reference prover: `pi = x^floor(2^T / B)` by plain double-and-add on the
/// full quotient. Only practical for small `T`; exists to cross-check the
/// block prover.
///
/// # Errors
///
/// [`VdfError::InvalidInput`] if a form does not serialize at this width.
pub fn prove_double_and_add(
    d: &BigInt,
    x: &Form,
    y: &Form,
    iterations: u64,
) -> Result<Form, VdfError> {
    let bound = partial_bound(d);
    let b = get_b(d, x, y)?;
    let quotient = (BigUint::one() << iterations) / &b;
    Ok(fast_pow(x, d, &quotient, &bound)?)
}

// ——— Verifier ————————————————————————————————————————————————————————————

/// Verify a Wesolowski proof: accept iff x, y, pi are reduced forms of
/// discriminant D and `pi^B * x^(2^T mod B) = y`.
///
/// Total on adversarial input: every failure path returns `false`.
#[must_use]
pub fn verify(d: &BigInt, x: &Form, y: &Form, pi: &Form, iterations: u64) -> bool {
    match get_b(d, x, y) {
        Ok(b) => verify_with_challenge(d, x, y, pi, iterations, &b),
        Err(_) => false,
    }
}

/// [`verify`] with the challenge prime supplied by the caller instead of
/// recomputed from (x, y).
#[must_use]
pub fn verify_with_challenge(
    d: &BigInt,
    x: &Form,
    y: &Form,
    pi: &Form,
    iterations: u64,
    b: &BigUint,
) -> bool {
    if !x.is_reduced() || !y.is_reduced() || !pi.is_reduced() {
        return false;
    }
    if x.discriminant() != *d || y.discriminant() != *d || pi.discriminant() != *d {
        return false;
    }
    let bound = partial_bound(d);
    let r = BigUint::from(2u32).modpow(&BigUint::from(iterations), b);
    let (Ok(pi_b), Ok(x_r)) = (fast_pow(pi, d, b, &bound), fast_pow(x, d, &r, &bound)) else {
        return false;
    };
    nucomp(&pi_b, &x_r, &bound) == *y
}

#[cfg(test)]
mod tests;
