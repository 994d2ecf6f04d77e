//! Activity classifier. Pure functions, no mutation.

use crate::Activity;

/// At or below this draw the mower is off, unplugged or faulted.
pub const ERROR_CEILING_WATTS: f64 = 0.0;
/// Lower bound of the docked band; anything between the error ceiling and this is mowing.
pub const DOCKED_FLOOR_WATTS: f64 = 2.0;
/// Lower bound of the charging band.
pub const CHARGING_FLOOR_WATTS: f64 = 3.0;

/// Classifies the power draw alone, ignoring the stuck flag.
pub fn power_band(power: f64) -> Activity {
    if power.is_nan() || power <= ERROR_CEILING_WATTS {
        Activity::Error
    } else if power < DOCKED_FLOOR_WATTS {
        Activity::Mowing
    } else if power < CHARGING_FLOOR_WATTS {
        Activity::Docked
    } else {
        Activity::Charging
    }
}

/// The stuck flag overrides every power band.
pub fn classify(power: f64, stuck: bool) -> Activity {
    if stuck {
        return Activity::Error;
    }
    power_band(power)
}

pub fn is_charging(power: f64) -> bool {
    power >= CHARGING_FLOOR_WATTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_fall_into_the_upper_band() {
        assert_eq!(classify(0.0, false), Activity::Error);
        assert_eq!(classify(f64::MIN_POSITIVE, false), Activity::Mowing);
        assert_eq!(classify(1.999, false), Activity::Mowing);
        assert_eq!(classify(2.0, false), Activity::Docked);
        assert_eq!(classify(2.999, false), Activity::Docked);
        assert_eq!(classify(3.0, false), Activity::Charging);
    }

    #[test]
    fn negative_and_sentinel_power_is_error() {
        assert_eq!(classify(-1.0, false), Activity::Error);
        assert_eq!(classify(f64::NEG_INFINITY, false), Activity::Error);
    }

    #[test]
    fn nan_is_error() {
        assert_eq!(classify(f64::NAN, false), Activity::Error);
    }

    #[test]
    fn stuck_overrides_every_band() {
        for power in [-1.0, 0.0, 1.0, 2.5, 5.0, f64::INFINITY] {
            assert_eq!(classify(power, true), Activity::Error, "power {power}");
        }
    }

    #[test]
    fn power_band_ignores_stuck() {
        assert_eq!(power_band(2.5), Activity::Docked);
        assert_eq!(power_band(4.0), Activity::Charging);
    }

    #[test]
    fn charging_flag_matches_band() {
        assert!(!is_charging(2.999));
        assert!(is_charging(3.0));
    }
}
