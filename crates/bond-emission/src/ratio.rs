//! Bounded utilization ratios.
//!
//! A ratio maps a utilization delta against a target onto
//! `[lower_bound, RATIO_SCALE]`, linearly between the two.

use bond_core::constants::RATIO_SCALE;

/// Normalize `delta` against `target` into `[lower_bound, RATIO_SCALE]`.
///
/// `had_eligible` tells whether anything was eligible for rewards in the
/// epoch that produced `target`: a zero target with nothing eligible is not
/// the participant's fault and yields the full ratio, while a zero target
/// with unclaimed eligibility yields the lower bound.
///
/// # Examples
///
/// ```
/// use bond_emission::ratio::normalize_ratio;
/// assert_eq!(normalize_ratio(250, 1_000, 5_000, true), 6_250);
/// ```
pub fn normalize_ratio(delta: i128, target: u128, lower_bound: u64, had_eligible: bool) -> u64 {
    if delta <= 0 {
        return lower_bound;
    }
    if target == 0 {
        return if had_eligible { lower_bound } else { RATIO_SCALE };
    }
    let delta = delta as u128;
    if delta >= target {
        return RATIO_SCALE;
    }
    let range = u128::from(RATIO_SCALE.saturating_sub(lower_bound));
    // delta < target, so the quotient is < range and fits in u64.
    let scaled = match delta.checked_mul(range) {
        Some(n) => n / target,
        None => delta / (target / range).max(1),
    };
    lower_bound + scaled.min(range) as u64
}
