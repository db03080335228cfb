//! Population-relative quorum.

/// Basis points in a whole (100%).
pub const BPS_SCALE: u32 = 10_000;

/// Votes required out of `population` for a fraction given in basis points.
///
/// `ceil(population * fraction)`, never below one: a ballot in an empty or
/// tiny community still needs somebody to vote.
pub fn required_votes(population: u64, fraction_bps: u32) -> u64 {
    let scale = u128::from(BPS_SCALE);
    let scaled = u128::from(population) * u128::from(fraction_bps);
    let required = scaled.div_ceil(scale);
    u64::try_from(required).unwrap_or(u64::MAX).max(1)
}
