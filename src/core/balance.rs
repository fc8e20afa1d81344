//! Shared balance arithmetic used by the simulator, the advancement
//! evaluator and the crafting outcomes.
//!
//! Probability deltas are combined in integer parts-per-million so the
//! result does not depend on the order the sources are summed in, and
//! gains are always floored so fractions never accumulate across ticks.

use super::constants::RATE_SCALE;

/// Convert a probability delta to parts-per-million.
pub fn rate_to_ppm(rate: f64) -> i64 {
    (rate * RATE_SCALE).round() as i64
}

/// Convert parts-per-million back to a probability.
pub fn ppm_to_rate(ppm: i64) -> f64 {
    ppm as f64 / RATE_SCALE
}

/// Sum a base rate and its deltas in fixed point, clamped to `[min, max]`.
pub fn combine_rates<I>(base: f64, deltas: I, min: f64, max: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let total: i64 = deltas
        .into_iter()
        .map(rate_to_ppm)
        .fold(rate_to_ppm(base), |acc, d| acc.saturating_add(d));
    let clamped = total.clamp(rate_to_ppm(min), rate_to_ppm(max));
    ppm_to_rate(clamped)
}

/// True if `rate` is a finite probability in `[0, 1]`.
pub fn is_unit_rate(rate: f64) -> bool {
    rate.is_finite() && (0.0..=1.0).contains(&rate)
}

/// Floor a gain to a whole number, never below zero.
///
/// Positive overflow, including infinity, saturates at `u64::MAX`; NaN is 0.
pub fn floor_gain(value: f64) -> u64 {
    if value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_rates_is_order_independent() {
        let forward = combine_rates(0.05, [0.15, 0.05, 0.1, -0.03], 0.0, 1.0);
        let reverse = combine_rates(0.05, [-0.03, 0.1, 0.05, 0.15], 0.0, 1.0);
        assert_eq!(forward, reverse);
        assert_eq!(forward, 0.32);
    }

    #[test]
    fn test_combine_rates_clamps() {
        assert_eq!(combine_rates(0.9, [0.5], 0.0, 1.0), 1.0);
        assert_eq!(combine_rates(0.1, [-0.5], 0.0, 1.0), 0.0);
        assert_eq!(combine_rates(0.5, [0.6], 0.10, 0.95), 0.95);
    }

    #[test]
    fn test_scenario_rates_are_exact() {
        assert_eq!(combine_rates(0.05, [0.15, 0.05], 0.0, 1.0), 0.25);
    }

    #[test]
    fn test_floor_gain() {
        assert_eq!(floor_gain(19.999), 19);
        assert_eq!(floor_gain(20.0), 20);
        assert_eq!(floor_gain(-3.5), 0);
        assert_eq!(floor_gain(f64::NAN), 0);
        assert_eq!(floor_gain(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn test_floor_gain_saturates() {
        assert_eq!(floor_gain(f64::INFINITY), u64::MAX);
        assert_eq!(floor_gain(1e300), u64::MAX);
        assert_eq!(floor_gain(1e308 * 2.0), u64::MAX);
    }

    #[test]
    fn test_is_unit_rate() {
        assert!(is_unit_rate(0.0));
        assert!(is_unit_rate(1.0));
        assert!(!is_unit_rate(1.0001));
        assert!(!is_unit_rate(-0.1));
        assert!(!is_unit_rate(f64::INFINITY));
    }
}
