//! Byte-oriented surface of the VDF engine.
//!
//! Every operation here speaks the wire formats: discriminants as unsigned
//! big-endian magnitude (sign implicitly negative), forms as
//! `sign(b) || a || |b|` at the width fixed by `num_bits(D)`, iteration
//! counts as unsigned 64-bit, and N-Wesolowski proof blobs as
//! `recursion + 1` chained segments of `y || pi || T(8-byte big-endian)`.
//!
//! Boolean operations are total: any malformed input yields `false`, never a
//! panic. Byte-producing operations surface [`VdfError`] instead.

use crate::VdfError;
use alloc::vec::Vec;
use khronos_classgroup::{fast_pow, nucomp, partial_bound, Form};
use num_bigint::{BigInt, BigUint};

// ——— Form constructors ———————————————————————————————————————————————————

/// Serialized identity form of Cl(D).
///
/// # Errors
///
/// [`VdfError::InvalidInput`] if `d` is not a valid discriminant.
pub fn form_identity(d: &BigInt) -> Result<Vec<u8>, VdfError> {
    let f = Form::identity(d)?;
    Ok(f.serialize(d)?)
}

/// Serialized generator form `(2, 1, (1 - D)/8)` of Cl(D).
///
/// # Errors
///
/// [`VdfError::InvalidInput`] unless `D = 1 (mod 8)`.
pub fn form_generator(d: &BigInt) -> Result<Vec<u8>, VdfError> {
    let f = Form::generator(d)?;
    Ok(f.serialize(d)?)
}

/// Serialized reduced form with the given `(a, b)` coordinates, both as
/// unsigned big-endian bytes.
///
/// # Errors
///
/// [`VdfError::InvalidInput`] if `(a, b)` does not define an integral form
/// at this discriminant.
pub fn form_from_ab(d: &BigInt, a: &[u8], b: &[u8]) -> Result<Vec<u8>, VdfError> {
    let a = BigInt::from(BigUint::from_bytes_be(a));
    let b = BigInt::from(BigUint::from_bytes_be(b));
    let f = Form::from_ab(d, a, b)?;
    Ok(f.serialize(d)?)
}

// ——— Group operations on serialized forms ————————————————————————————————

/// Compose two serialized forms: `x * y` in Cl(D).
///
/// # Errors
///
/// [`VdfError::InvalidInput`] if either operand fails to deserialize.
pub fn form_multiply(d: &BigInt, x_s: &[u8], y_s: &[u8]) -> Result<Vec<u8>, VdfError> {
    let x = Form::deserialize(x_s, d)?;
    let y = Form::deserialize(y_s, d)?;
    let bound = partial_bound(d);
    Ok(nucomp(&x, &y, &bound).serialize(d)?)
}

/// Raise a serialized form to an unsigned big-endian exponent.
///
/// # Errors
///
/// [`VdfError::InvalidInput`] if the operand fails to deserialize.
pub fn form_power(d: &BigInt, x_s: &[u8], exponent: &[u8]) -> Result<Vec<u8>, VdfError> {
    let x = Form::deserialize(x_s, d)?;
    let e = BigUint::from_bytes_be(exponent);
    let bound = partial_bound(d);
    Ok(fast_pow(&x, d, &e, &bound)?.serialize(d)?)
}

// ——— Prover entry points —————————————————————————————————————————————————

/// Evaluate `x^(2^T)` and prove it; returns `y || pi`.
///
/// # Errors
///
/// [`VdfError::Cancelled`] if the probe refused; [`VdfError::InvalidInput`]
/// for malformed `x`.
pub fn prove<F>(
    d: &BigInt,
    x_s: &[u8],
    iterations: u64,
    should_continue: F,
) -> Result<Vec<u8>, VdfError>
where
    F: Fn() -> bool,
{
    let x = Form::deserialize(x_s, d)?;
    let (y, pi) = crate::prove(d, &x, iterations, should_continue)?;
    let mut out = y.serialize(d)?;
    out.extend_from_slice(&pi.serialize(d)?);
    Ok(out)
}

/// Evaluate `x^(2^T)`; returns the serialized `y` only.
///
/// # Errors
///
/// As [`prove`].
pub fn evaluate<F>(
    d: &BigInt,
    x_s: &[u8],
    iterations: u64,
    should_continue: F,
) -> Result<Vec<u8>, VdfError>
where
    F: Fn() -> bool,
{
    let x = Form::deserialize(x_s, d)?;
    let y = crate::evaluate_only(d, &x, iterations, should_continue)?;
    Ok(y.serialize(d)?)
}

/// Evaluate `x^(2^T)` keeping checkpoints; returns
/// `y || i_0 || i_1 || ...` with every form at the fixed width.
///
/// # Errors
///
/// As [`prove`].
pub fn evaluate_with_intermediates<F>(
    d: &BigInt,
    x_s: &[u8],
    iterations: u64,
    should_continue: F,
) -> Result<Vec<u8>, VdfError>
where
    F: Fn() -> bool,
{
    let x = Form::deserialize(x_s, d)?;
    let (y, intermediates) = crate::evaluate_with_intermediates(d, &x, iterations, should_continue)?;
    let mut out = y.serialize(d)?;
    for form in &intermediates {
        out.extend_from_slice(&form.serialize(d)?);
    }
    Ok(out)
}

/// Produce the proof form for a previously stored evaluation: `x`, `y` and
/// the concatenated checkpoint forms from [`evaluate_with_intermediates`].
/// Returns the serialized `pi`.
///
/// The checkpoint spacing is rederived from `T`, so the intermediates must
/// come from an evaluation of the same iteration count.
///
/// # Errors
///
/// [`VdfError::InvalidInput`] if any form fails to deserialize or the
/// checkpoint count does not cover `T`.
pub fn prove_with_intermediates(
    d: &BigInt,
    x_s: &[u8],
    y_s: &[u8],
    intermediates_s: &[u8],
    iterations: u64,
) -> Result<Vec<u8>, VdfError> {
    let x = Form::deserialize(x_s, d)?;
    let y = Form::deserialize(y_s, d)?;
    let form_size = Form::size_for(d);
    if intermediates_s.len() % form_size != 0 {
        return Err(VdfError::InvalidInput);
    }
    let mut intermediates = Vec::with_capacity(intermediates_s.len() / form_size);
    for chunk in intermediates_s.chunks_exact(form_size) {
        intermediates.push(Form::deserialize(chunk, d)?);
    }
    let (k, l) = crate::approximate_parameters(iterations);
    let pi = crate::generate_wesolowski(d, &x, &y, &intermediates, iterations, k, l)?;
    Ok(pi.serialize(d)?)
}

/// Reference prover over serialized forms; returns the serialized `pi`.
///
/// # Errors
///
/// [`VdfError::InvalidInput`] if `x` or `y` fails to deserialize.
pub fn prove_double_and_add(
    d: &BigInt,
    x_s: &[u8],
    y_s: &[u8],
    iterations: u64,
) -> Result<Vec<u8>, VdfError> {
    let x = Form::deserialize(x_s, d)?;
    let y = Form::deserialize(y_s, d)?;
    let pi = crate::prove_double_and_add(d, &x, &y, iterations)?;
    Ok(pi.serialize(d)?)
}

// ——— Verifier entry points ———————————————————————————————————————————————

/// Verify a single Wesolowski proof over serialized forms. Total: malformed
/// input yields `false`.
#[must_use]
pub fn verify(d: &BigInt, x_s: &[u8], y_s: &[u8], proof_s: &[u8], iterations: u64) -> bool {
    let (Ok(x), Ok(y), Ok(pi)) = (
        Form::deserialize(x_s, d),
        Form::deserialize(y_s, d),
        Form::deserialize(proof_s, d),
    ) else {
        return false;
    };
    crate::verify(d, &x, &y, &pi, iterations)
}

// ——— N-Wesolowski cascade ————————————————————————————————————————————————

struct Segment {
    y: Form,
    pi: Form,
    iterations: u64,
}

/// Parse a cascade blob into `count` segments at the width implied by
/// `disc_bits`, validating each form against `d`.
fn parse_segments(
    d: &BigInt,
    blob: &[u8],
    disc_bits: usize,
    count: usize,
) -> Result<Vec<Segment>, VdfError> {
    if disc_bits == 0 || disc_bits > (1 << 24) || count == 0 {
        return Err(VdfError::InvalidInput);
    }
    let form_size = 1 + 2 * disc_bits.div_ceil(8);
    let segment_size = 2 * form_size + 8;
    if count.checked_mul(segment_size) != Some(blob.len()) {
        return Err(VdfError::InvalidInput);
    }
    let mut segments = Vec::with_capacity(count);
    for raw in blob.chunks_exact(segment_size) {
        let y = Form::deserialize(&raw[..form_size], d)?;
        let pi = Form::deserialize(&raw[form_size..2 * form_size], d)?;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&raw[2 * form_size..]);
        segments.push(Segment {
            y,
            pi,
            iterations: u64::from_be_bytes(count_bytes),
        });
    }
    Ok(segments)
}

fn total_iterations(segments: &[Segment]) -> Option<u64> {
    segments
        .iter()
        .try_fold(0u64, |acc, seg| acc.checked_add(seg.iterations))
}

/// Verify an N-Wesolowski cascade: `recursion + 1` chained segments whose
/// iteration counts sum to `total`, each proving one hop `x_i -> y_i` with
/// `x_{i+1} = y_i`. Total on adversarial input.
#[must_use]
pub fn verify_cascade(
    d: &BigInt,
    x_s: &[u8],
    proof_blob: &[u8],
    total: u64,
    disc_bits: usize,
    recursion: u64,
) -> bool {
    let Some(count) = recursion.checked_add(1).and_then(|n| usize::try_from(n).ok()) else {
        return false;
    };
    let Ok(segments) = parse_segments(d, proof_blob, disc_bits, count) else {
        return false;
    };
    if total_iterations(&segments) != Some(total) {
        return false;
    }
    let Ok(mut cur) = Form::deserialize(x_s, d) else {
        return false;
    };
    for segment in segments {
        if !crate::verify(d, &cur, &segment.y, &segment.pi, segment.iterations) {
            return false;
        }
        cur = segment.y;
    }
    true
}

/// [`verify_cascade`] with the final segment's challenge prime supplied by
/// the caller; returns the verdict together with the serialized final `y`
/// (empty on rejection). The segment width is taken from `d` itself.
#[must_use]
pub fn verify_cascade_with_b(
    d: &BigInt,
    b: &BigUint,
    x_s: &[u8],
    proof_blob: &[u8],
    total: u64,
    recursion: u64,
) -> (bool, Vec<u8>) {
    let disc_bits = d.magnitude().bits() as usize;
    let Some(count) = recursion.checked_add(1).and_then(|n| usize::try_from(n).ok()) else {
        return (false, Vec::new());
    };
    let Ok(segments) = parse_segments(d, proof_blob, disc_bits, count) else {
        return (false, Vec::new());
    };
    if total_iterations(&segments) != Some(total) {
        return (false, Vec::new());
    }
    let Ok(mut cur) = Form::deserialize(x_s, d) else {
        return (false, Vec::new());
    };
    let last = segments.len() - 1;
    for (index, segment) in segments.into_iter().enumerate() {
        let ok = if index == last {
            crate::verify_with_challenge(d, &cur, &segment.y, &segment.pi, segment.iterations, b)
        } else {
            crate::verify(d, &cur, &segment.y, &segment.pi, segment.iterations)
        };
        if !ok {
            return (false, Vec::new());
        }
        cur = segment.y;
    }
    match cur.serialize(d) {
        Ok(bytes) => (true, bytes),
        Err(_) => (false, Vec::new()),
    }
}

/// Recompute the challenge prime of the cascade's final segment:
/// `B = get_b(D, x_last, y_last)` with `x_last` reached by chaining the
/// blob from `x`. Parses and checks the iteration sum, but does not verify
/// the segment proofs.
///
/// # Errors
///
/// [`VdfError::InvalidInput`] for a malformed blob or mismatched total.
pub fn get_b_from_proof(
    d: &BigInt,
    x_s: &[u8],
    proof_blob: &[u8],
    total: u64,
    recursion: u64,
) -> Result<BigUint, VdfError> {
    let disc_bits = d.magnitude().bits() as usize;
    let count = recursion
        .checked_add(1)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(VdfError::InvalidInput)?;
    let segments = parse_segments(d, proof_blob, disc_bits, count)?;
    if total_iterations(&segments) != Some(total) {
        return Err(VdfError::InvalidInput);
    }
    let x = Form::deserialize(x_s, d)?;
    let last = segments.len() - 1;
    let x_last = if last == 0 { &x } else { &segments[last - 1].y };
    crate::get_b(d, x_last, &segments[last].y)
}
