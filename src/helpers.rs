//! Shared integer arithmetic helpers
//!
//! All of the shape-feasibility and grid-sizing math is integer arithmetic on
//! non-negative values; these helpers centralize the rounding rules so the
//! planner and the constraint checker agree bit-for-bit.

/// `v` rounded up to the nearest multiple of `m`.
///
/// Defined for `m > 0` only.
#[inline]
pub fn round_up(v: u64, m: u64) -> u64 {
    debug_assert!(m > 0);
    if v % m != 0 {
        (v / m + 1) * m
    } else {
        v
    }
}

/// `ceil(x / y)`, defined for `y > 0` only.
#[inline]
pub fn ceil_div(x: u64, y: u64) -> u64 {
    debug_assert!(y > 0);
    round_up(x, y) / y
}

/// `floor(x / y)`, defined for `y > 0` only.
#[inline]
pub fn floor_div(x: u64, y: u64) -> u64 {
    debug_assert!(y > 0);
    x / y
}
