//! Site load model: an appliance table flattened into a 24-hour demand
//! profile, replicated across the simulated year.

use serde::Deserialize;

use crate::sim::types::LoadSample;

/// Supply mode of an appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SupplyMode {
    #[default]
    Ac,
    Dc,
}

/// One row of the site's appliance table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Appliance {
    pub name: String,
    pub mode: SupplyMode,
    pub quantity: u32,
    /// Duty-cycle derating within the operating window (0-1).
    pub use_factor: f64,
    /// Rated draw per unit (W).
    pub watts: f64,
    /// Hour of day the appliance switches on, 0-23.
    pub start_hour: u32,
    /// Hours of operation per day.
    pub hours_per_day: u32,
}

impl Default for Appliance {
    fn default() -> Self {
        Self {
            name: String::new(),
            mode: SupplyMode::Ac,
            quantity: 1,
            use_factor: 1.0,
            watts: 0.0,
            start_hour: 0,
            hours_per_day: 0,
        }
    }
}

impl Appliance {
    /// Effective draw while the appliance is on (W).
    pub fn demand_w(&self) -> f64 {
        self.quantity as f64 * self.use_factor * self.watts
    }

    /// Whether the operating window covers the given hour of day.
    ///
    /// Windows that run past midnight wrap into the next day, so a light on
    /// from 18:00 for 8 hours is also drawing at 01:00.
    pub fn is_on(&self, hour_of_day: u32) -> bool {
        let start = self.start_hour % 24;
        let end = start + self.hours_per_day.min(24);
        if end <= 24 {
            hour_of_day >= start && hour_of_day < end
        } else {
            hour_of_day >= start || hour_of_day + 24 < end
        }
    }
}

/// Representative daily demand, one AC/DC sample per hour of day.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProfile {
    hourly: [LoadSample; 24],
}

impl LoadProfile {
    /// Flattens an appliance table into per-hour AC and DC demand.
    pub fn from_appliances(appliances: &[Appliance]) -> Self {
        let mut hourly = [LoadSample::default(); 24];
        for (hour, sample) in hourly.iter_mut().enumerate() {
            for appliance in appliances {
                if appliance.is_on(hour as u32) {
                    match appliance.mode {
                        SupplyMode::Ac => sample.ac_w += appliance.demand_w(),
                        SupplyMode::Dc => sample.dc_w += appliance.demand_w(),
                    }
                }
            }
        }
        Self { hourly }
    }

    /// A flat round-the-clock profile. Mostly useful in tests and sizing.
    pub fn constant(ac_w: f64, dc_w: f64) -> Self {
        Self {
            hourly: [LoadSample::new(ac_w, dc_w); 24],
        }
    }

    /// Demand at an absolute hour index; the profile repeats every 24 hours.
    pub fn sample_at(&self, hour: usize) -> LoadSample {
        self.hourly[hour % 24]
    }

    /// Total energy demanded over one representative day (Wh).
    pub fn daily_load_wh(&self) -> f64 {
        self.hourly.iter().map(LoadSample::total).sum()
    }

    /// Hours of the representative day with any demand at all.
    pub fn demand_hours(&self) -> usize {
        self.hourly.iter().filter(|s| s.total() > 0.0).count()
    }

    /// Largest single-hour total demand (W).
    pub fn peak_load_w(&self) -> f64 {
        self.hourly
            .iter()
            .map(LoadSample::total)
            .fold(0.0, f64::max)
    }
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self::constant(0.0, 0.0)
    }
}
