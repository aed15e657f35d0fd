//! Exact integer helpers for tree geometry
//!
//! Tree shapes are decided by integer logarithms. Going through `f64::log`
//! misrounds exact powers (e.g. `log_5(125)` evaluates just above 3), which
//! would add a whole level to the tree, so everything here stays in integers.

use crate::{Error, Result};

/// Smallest `h` such that `base^h >= n`
///
/// `ceil_log(1, b) == 0` for any valid base.
pub fn ceil_log(n: usize, base: usize) -> Result<u32> {
    if base < 2 {
        return Err(Error::InvalidParameter(format!(
            "logarithm base must be at least 2, got {base}"
        )));
    }
    if n == 0 {
        return Err(Error::empty_input("ceil_log"));
    }

    let target = n as u128;
    let base = base as u128;
    let mut power: u128 = 1;
    let mut h = 0u32;
    while power < target {
        // base >= 2 and target fits in usize, so this cannot overflow u128
        power *= base;
        h += 1;
    }
    Ok(h)
}

/// `base^exp`, failing instead of wrapping
pub fn checked_pow(base: usize, exp: u32) -> Result<usize> {
    base.checked_pow(exp).ok_or_else(|| {
        Error::Computation(format!("{base}^{exp} overflows the addressable size"))
    })
}

/// Integer square root: the largest `r` with `r * r <= n`
pub fn isqrt(n: usize) -> usize {
    if n < 2 {
        return n;
    }
    let mut r = (n as f64).sqrt() as usize;
    while r.checked_mul(r).map_or(true, |sq| sq > n) {
        r -= 1;
    }
    while (r + 1).checked_mul(r + 1).map_or(false, |sq| sq <= n) {
        r += 1;
    }
    r
}
