use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert a tick count to Fixed64, saturating at `Fixed64::MAX`.
#[inline]
pub fn ticks_to_fixed64(ticks: Ticks) -> Fixed64 {
    Fixed64::saturating_from_num(ticks)
}

/// `numerator / denominator` as a fraction clamped to [0, 1].
///
/// A zero denominator yields zero. Used for display ratios (charge level,
/// burn progress) where the inputs are already known to be non-negative.
pub fn ratio_clamped(numerator: Fixed64, denominator: Fixed64) -> Fixed64 {
    match numerator.checked_div(denominator) {
        Some(r) => r.clamp(Fixed64::ZERO, Fixed64::ONE),
        None => Fixed64::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_convert_saturating() {
        assert_eq!(ticks_to_fixed64(5), Fixed64::from_num(5));
        assert_eq!(ticks_to_fixed64(u64::MAX), Fixed64::MAX);
    }

    #[test]
    fn ratio_is_clamped() {
        let half = ratio_clamped(Fixed64::from_num(50), Fixed64::from_num(100));
        assert_eq!(half, Fixed64::from_num(0.5));
        assert_eq!(
            ratio_clamped(Fixed64::from_num(200), Fixed64::from_num(100)),
            Fixed64::ONE
        );
        assert_eq!(ratio_clamped(Fixed64::from_num(3), Fixed64::ZERO), Fixed64::ZERO);
        assert_eq!(
            ratio_clamped(Fixed64::from_num(-3), Fixed64::from_num(4)),
            Fixed64::ZERO
        );
    }

    #[test]
    fn ratio_is_deterministic() {
        let a = ratio_clamped(Fixed64::from_num(1), Fixed64::from_num(3));
        let b = ratio_clamped(Fixed64::from_num(1), Fixed64::from_num(3));
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
