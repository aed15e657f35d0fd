//! Closed-form branching factor selection
//!
//! Picks the arity minimizing the expected range-query variance of a
//! hierarchical estimator (Qardaji, Yang and Li, PVLDB 2013). Arithmetic is
//! integral: the tree height is the exact ceiling logarithm and the
//! `2(b+1)h^2 / 3` term uses floor division, so the selected arity never
//! depends on floating-point rounding.

use privhist_core::{math, Error, Result};

/// Variance of a 1-D hierarchy with branching `b` over `domain_size` cells
///
/// `(b - 1) h^3 - 2 (b + 1) h^2 / 3` with `h = ceil(log_b(domain_size))`.
pub fn variance_1d(domain_size: usize, b: usize) -> Result<i128> {
    let h = math::ceil_log(domain_size, b)? as i128;
    let b = b as i128;
    Ok((b - 1) * h * h * h - (2 * (b + 1) * h * h) / 3)
}

/// Variance of a 2-D hierarchy with per-axis branching `b`
///
/// `b (n - 1) h^2` with `n = floor(sqrt(domain_size))` and
/// `h = ceil(log_b(n))`.
pub fn variance_2d(domain_size: usize, b: usize) -> Result<i128> {
    let n = math::isqrt(domain_size);
    let h = math::ceil_log(n, b)? as i128;
    Ok(b as i128 * (n as i128 - 1) * h * h)
}

/// Best 1-D branching factor for a domain of `domain_size` cells
///
/// Scans `b` in `[2, domain_size]`; ties go to the smallest `b`.
pub fn choose_branching(domain_size: usize) -> Result<usize> {
    argmin(2..=domain_size, |b| variance_1d(domain_size, b))?.ok_or_else(|| {
        Error::InvalidInput(format!(
            "no branching factor exists for a 1D domain of size {domain_size}"
        ))
    })
}

/// Best per-axis branching factor for a 2-D domain of `domain_size` cells
///
/// Scans `b` in `[2, floor(sqrt(domain_size))]`; ties go to the smallest `b`.
pub fn choose_branching_2d(domain_size: usize) -> Result<usize> {
    let n = math::isqrt(domain_size);
    argmin(2..=n, |b| variance_2d(domain_size, b))?.ok_or_else(|| {
        Error::InvalidInput(format!(
            "no branching factor exists for a 2D domain of size {domain_size}"
        ))
    })
}

fn argmin<I, F>(candidates: I, variance: F) -> Result<Option<usize>>
where
    I: Iterator<Item = usize>,
    F: Fn(usize) -> Result<i128>,
{
    let mut best: Option<(usize, i128)> = None;
    for b in candidates {
        let v = variance(b)?;
        // Strict comparison keeps the first minimizer
        if best.map_or(true, |(_, min)| v < min) {
            best = Some((b, v));
        }
    }
    Ok(best.map(|(b, _)| b))
}
