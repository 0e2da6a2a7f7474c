//! Array output sources feeding the simulation.
//!
//! The detailed PV physics (irradiance decomposition, I-V curve solving)
//! lives outside this crate; a source only has to hand back one electrical
//! operating point per hour. [`SyntheticArray`] is a deterministic built-in
//! stand-in good enough for sizing studies and tests.

use serde::Deserialize;

use crate::sim::calendar::{hour_stamp, DAYS_PER_YEAR, HOURS_PER_YEAR};
use crate::sim::types::ArraySample;

/// Per-hour electrical output of one physical sub-array.
pub trait ArraySource {
    /// Operating point for an absolute hour index (0-based from Jan 1).
    fn sample(&self, hour: usize) -> ArraySample;

    /// The full simulated year, hour by hour.
    fn year_series(&self) -> Vec<ArraySample> {
        (0..HOURS_PER_YEAR).map(|h| self.sample(h)).collect()
    }
}

/// Closed-form daylight model: a half-sine between sunrise and sunset,
/// scaled by a cosine seasonal factor peaking at the summer solstice.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticArray {
    /// Peak output at solar noon on the best day of the year (W).
    pub peak_power_w: f64,
    /// Maximum-power-point voltage, held constant (V).
    pub mpp_voltage_v: f64,
    /// First daylight hour, 0-23.
    pub sunrise_hour: u32,
    /// First dark hour after daylight, 0-24.
    pub sunset_hour: u32,
    /// Fractional winter-to-summer swing in daily peak output (0-1).
    pub seasonal_swing: f64,
}

impl Default for SyntheticArray {
    fn default() -> Self {
        Self {
            peak_power_w: 0.0,
            mpp_voltage_v: 0.0,
            sunrise_hour: 6,
            sunset_hour: 18,
            seasonal_swing: 0.25,
        }
    }
}

impl SyntheticArray {
    /// Seasonal derating for a day of year, 1 at the June solstice.
    fn seasonal_factor(&self, day_of_year: u32) -> f64 {
        let phase =
            2.0 * std::f64::consts::PI * (day_of_year as f64 - 172.0) / DAYS_PER_YEAR as f64;
        (1.0 - self.seasonal_swing) + self.seasonal_swing * 0.5 * (1.0 + phase.cos())
    }
}

impl ArraySource for SyntheticArray {
    fn sample(&self, hour: usize) -> ArraySample {
        let stamp = hour_stamp(hour);
        if stamp.hour_of_day < self.sunrise_hour || stamp.hour_of_day >= self.sunset_hour {
            return ArraySample::ZERO;
        }
        let daylight = (self.sunset_hour - self.sunrise_hour) as f64;
        let position = (stamp.hour_of_day - self.sunrise_hour) as f64 + 0.5;
        let elevation = (std::f64::consts::PI * position / daylight).sin();
        let power = self.peak_power_w * elevation * self.seasonal_factor(stamp.day_of_year);
        if power <= 0.0 || self.mpp_voltage_v <= 0.0 {
            return ArraySample::ZERO;
        }
        ArraySample::new(power, self.mpp_voltage_v, power / self.mpp_voltage_v)
    }
}
