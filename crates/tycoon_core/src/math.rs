//! Numeric helpers shared by the economy model.
//!
//! Currency and prices are `f64`. The only rounding the simulation applies
//! is the two-decimal rounding of prices during drift and price events;
//! everything else is carried at full precision.

use rand_chacha::ChaCha8Rng;

/// Default random number generator for the simulation.
///
/// ChaCha8 gives a stable stream for a given seed on every platform,
/// which replays and determinism checks depend on.
pub type GameRng = ChaCha8Rng;

/// Round a value to two decimal places (cents).
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Linear per-level multiplier: `1 + growth × (level − 1)`.
///
/// Level 1 is always `1.0`. Levels below 1 are treated as level 1.
#[must_use]
pub fn level_multiplier(growth: f64, level: u32) -> f64 {
    1.0 + f64::from(level.saturating_sub(1)) * growth
}

/// Floor a non-negative float into an integer count.
///
/// Negative and non-finite values clamp to zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn floor_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert!((round_cents(5.126) - 5.13).abs() < f64::EPSILON);
        assert!((round_cents(5.124) - 5.12).abs() < f64::EPSILON);
        assert!((round_cents(0.1) - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_level_multiplier() {
        assert!((level_multiplier(0.5, 1) - 1.0).abs() < f64::EPSILON);
        assert!((level_multiplier(0.5, 3) - 2.0).abs() < f64::EPSILON);
        assert!((level_multiplier(0.3, 0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_floor_count() {
        assert_eq!(floor_count(75.9), 75);
        assert_eq!(floor_count(-3.0), 0);
        assert_eq!(floor_count(f64::NAN), 0);
    }
}
