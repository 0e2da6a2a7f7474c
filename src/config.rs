//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::load::{Appliance, LoadProfile, SupplyMode};
use crate::sim::bank::{BankConfig, Chemistry};
use crate::sim::combiner::combine_series;
use crate::sim::equipment::{ChargeController, ControllerType, EquipmentConfig, Inverter};
use crate::sim::types::ArraySample;
use crate::source::{ArraySource, SyntheticArray};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults; absent equipment sections stay absent. Load
/// from TOML with [`ScenarioConfig::from_toml_file`] or start from one of
/// the built-in presets.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run-level simulation parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Physical sub-arrays, combined in parallel.
    #[serde(default)]
    pub arrays: Vec<SyntheticArray>,
    /// Site appliance table.
    #[serde(default)]
    pub load: LoadConfig,
    /// DC/AC inverter, if the site has one.
    #[serde(default)]
    pub inverter: Option<Inverter>,
    /// Solar charge controller, if the site has one.
    #[serde(default)]
    pub charge_controller: Option<ChargeController>,
    /// Battery bank, if the site has one.
    #[serde(default)]
    pub battery_bank: Option<BankConfig>,
}

/// Run-level simulation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Abort on fatal diagnostics instead of logging them.
    pub strict: bool,
    /// Requested bank starting state-of-charge fraction (0.0-1.0).
    pub start_soc_fraction: f64,
    /// Site grid voltage used for autonomy sizing (V).
    pub grid_voltage_v: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            strict: false,
            start_soc_fraction: 0.75,
            grid_voltage_v: 120.0,
        }
    }
}

/// Site appliance table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    pub appliances: Vec<Appliance>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery_bank.capacity_ah"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {} — {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the cabin-DC preset: a small array wired straight to DC
    /// loads, no conversion equipment and no storage.
    pub fn cabin_dc() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            arrays: vec![SyntheticArray {
                peak_power_w: 400.0,
                mpp_voltage_v: 18.0,
                ..SyntheticArray::default()
            }],
            load: LoadConfig {
                appliances: vec![
                    Appliance {
                        name: "led lighting".into(),
                        mode: SupplyMode::Dc,
                        quantity: 4,
                        watts: 9.0,
                        start_hour: 7,
                        hours_per_day: 10,
                        ..Appliance::default()
                    },
                    Appliance {
                        name: "radio".into(),
                        mode: SupplyMode::Dc,
                        watts: 15.0,
                        use_factor: 0.5,
                        start_hour: 8,
                        hours_per_day: 8,
                        ..Appliance::default()
                    },
                ],
            },
            inverter: None,
            charge_controller: None,
            battery_bank: None,
        }
    }

    /// Returns the off-grid inverter preset: MPPT controller, inverter,
    /// and a lead-acid bank carrying the site through the night.
    pub fn offgrid_inverter() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            arrays: vec![
                SyntheticArray {
                    peak_power_w: 2400.0,
                    mpp_voltage_v: 48.0,
                    ..SyntheticArray::default()
                },
                SyntheticArray {
                    peak_power_w: 1200.0,
                    mpp_voltage_v: 48.0,
                    sunrise_hour: 7,
                    sunset_hour: 17,
                    ..SyntheticArray::default()
                },
            ],
            load: LoadConfig {
                appliances: vec![
                    Appliance {
                        name: "refrigerator".into(),
                        mode: SupplyMode::Ac,
                        watts: 150.0,
                        use_factor: 0.4,
                        start_hour: 0,
                        hours_per_day: 24,
                        ..Appliance::default()
                    },
                    Appliance {
                        name: "well pump".into(),
                        mode: SupplyMode::Ac,
                        watts: 750.0,
                        use_factor: 0.3,
                        start_hour: 8,
                        hours_per_day: 4,
                        ..Appliance::default()
                    },
                    Appliance {
                        name: "lighting".into(),
                        mode: SupplyMode::Dc,
                        quantity: 6,
                        watts: 9.0,
                        start_hour: 18,
                        hours_per_day: 6,
                        ..Appliance::default()
                    },
                ],
            },
            inverter: Some(Inverter {
                night_power_w: 12.0,
                ac_rated_w: 2000.0,
                dc_rated_w: 2200.0,
                dc_rated_v: 48.0,
                max_dc_v: 150.0,
                max_dc_a: 60.0,
                mppt_low_v: 40.0,
                mppt_high_v: 120.0,
            }),
            charge_controller: Some(ChargeController {
                controller_type: ControllerType::Mppt,
                max_pv_v: 150.0,
                max_pv_a: 60.0,
                nominal_battery_v: 48.0,
                max_charge_v: 58.0,
                max_charge_a: 60.0,
                max_discharge_a: 60.0,
                self_consumption_w: 2.5,
                efficiency_pct: 96.0,
                ..ChargeController::default()
            }),
            battery_bank: Some(BankConfig {
                capacity_ah: 400.0,
                nominal_voltage_v: 48.0,
                chemistry: Chemistry::FloodedLeadAcid,
                depth_of_discharge_pct: 50.0,
                max_discharge_cycles: 1200.0,
                max_cycle_dod_pct: 50.0,
            }),
        }
    }

    /// Returns the PWM-budget preset: a small PWM-regulated system with a
    /// gel bank, the economy build of a weekend cabin.
    pub fn pwm_budget() -> Self {
        Self {
            simulation: SimulationConfig {
                start_soc_fraction: 0.5,
                ..SimulationConfig::default()
            },
            arrays: vec![SyntheticArray {
                peak_power_w: 600.0,
                mpp_voltage_v: 24.0,
                ..SyntheticArray::default()
            }],
            load: LoadConfig {
                appliances: vec![Appliance {
                    name: "cabin circuit".into(),
                    mode: SupplyMode::Dc,
                    watts: 80.0,
                    start_hour: 17,
                    hours_per_day: 7,
                    ..Appliance::default()
                }],
            },
            inverter: None,
            charge_controller: Some(ChargeController {
                controller_type: ControllerType::Pwm,
                max_pv_v: 50.0,
                max_pv_a: 30.0,
                nominal_battery_v: 24.0,
                max_charge_v: 29.0,
                max_charge_a: 30.0,
                max_discharge_a: 30.0,
                self_consumption_w: 1.0,
                efficiency_pct: 85.0,
                ..ChargeController::default()
            }),
            battery_bank: Some(BankConfig {
                capacity_ah: 150.0,
                nominal_voltage_v: 24.0,
                chemistry: Chemistry::Gel,
                depth_of_discharge_pct: 60.0,
                max_discharge_cycles: 900.0,
                max_cycle_dod_pct: 50.0,
            }),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["cabin_dc", "offgrid_inverter", "pwm_budget"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "cabin_dc" => Ok(Self::cabin_dc()),
            "offgrid_inverter" => Ok(Self::offgrid_inverter()),
            "pwm_budget" => Ok(Self::pwm_budget()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// The conversion equipment between the combined array and the load.
    pub fn equipment(&self) -> EquipmentConfig {
        EquipmentConfig {
            inverter: self.inverter.clone(),
            charge_controller: self.charge_controller.clone(),
        }
    }

    /// Flattens the appliance table into the daily demand profile.
    pub fn load_profile(&self) -> LoadProfile {
        LoadProfile::from_appliances(&self.load.appliances)
    }

    /// Computes each sub-array's year and combines them in parallel.
    pub fn combined_array_series(&self) -> Vec<ArraySample> {
        let per_array: Vec<Vec<ArraySample>> =
            self.arrays.iter().map(ArraySource::year_series).collect();
        combine_series(&per_array)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if !(0.0..=1.0).contains(&s.start_soc_fraction) {
            errors.push(ConfigError {
                field: "simulation.start_soc_fraction".into(),
                message: "must be in [0.0, 1.0]".into(),
            });
        }
        if s.grid_voltage_v < 0.0 {
            errors.push(ConfigError {
                field: "simulation.grid_voltage_v".into(),
                message: "must be >= 0".into(),
            });
        }

        for (i, array) in self.arrays.iter().enumerate() {
            if array.peak_power_w < 0.0 {
                errors.push(ConfigError {
                    field: format!("arrays[{i}].peak_power_w"),
                    message: "must be >= 0".into(),
                });
            }
            if array.peak_power_w > 0.0 && array.mpp_voltage_v <= 0.0 {
                errors.push(ConfigError {
                    field: format!("arrays[{i}].mpp_voltage_v"),
                    message: "must be > 0 for a producing array".into(),
                });
            }
            if array.sunrise_hour >= array.sunset_hour {
                errors.push(ConfigError {
                    field: format!("arrays[{i}].sunrise_hour"),
                    message: "must be < sunset_hour".into(),
                });
            }
            if array.sunset_hour > 24 {
                errors.push(ConfigError {
                    field: format!("arrays[{i}].sunset_hour"),
                    message: "must be <= 24".into(),
                });
            }
            if !(0.0..=1.0).contains(&array.seasonal_swing) {
                errors.push(ConfigError {
                    field: format!("arrays[{i}].seasonal_swing"),
                    message: "must be in [0.0, 1.0]".into(),
                });
            }
        }

        for (i, appliance) in self.load.appliances.iter().enumerate() {
            if appliance.watts < 0.0 {
                errors.push(ConfigError {
                    field: format!("load.appliances[{i}].watts"),
                    message: "must be >= 0".into(),
                });
            }
            if !(0.0..=1.0).contains(&appliance.use_factor) {
                errors.push(ConfigError {
                    field: format!("load.appliances[{i}].use_factor"),
                    message: "must be in [0.0, 1.0]".into(),
                });
            }
            if appliance.start_hour > 23 {
                errors.push(ConfigError {
                    field: format!("load.appliances[{i}].start_hour"),
                    message: "must be in 0..=23".into(),
                });
            }
            if appliance.hours_per_day > 24 {
                errors.push(ConfigError {
                    field: format!("load.appliances[{i}].hours_per_day"),
                    message: "must be <= 24".into(),
                });
            }
        }

        if let Some(inv) = &self.inverter {
            if inv.ac_rated_w <= 0.0 {
                errors.push(ConfigError {
                    field: "inverter.ac_rated_w".into(),
                    message: "must be > 0".into(),
                });
            }
            if inv.dc_rated_w < inv.ac_rated_w {
                errors.push(ConfigError {
                    field: "inverter.dc_rated_w".into(),
                    message: "must be >= inverter.ac_rated_w".into(),
                });
            }
            if inv.dc_rated_v <= 0.0 {
                errors.push(ConfigError {
                    field: "inverter.dc_rated_v".into(),
                    message: "must be > 0".into(),
                });
            }
        }

        if let Some(ctl) = &self.charge_controller {
            if !(0.0..=100.0).contains(&ctl.efficiency_pct) || ctl.efficiency_pct == 0.0 {
                errors.push(ConfigError {
                    field: "charge_controller.efficiency_pct".into(),
                    message: "must be in (0.0, 100.0]".into(),
                });
            }
            if ctl.max_pv_v <= 0.0 {
                errors.push(ConfigError {
                    field: "charge_controller.max_pv_v".into(),
                    message: "must be > 0".into(),
                });
            }
        }

        if let Some(bank) = &self.battery_bank {
            if bank.capacity_ah <= 0.0 {
                errors.push(ConfigError {
                    field: "battery_bank.capacity_ah".into(),
                    message: "must be > 0".into(),
                });
            }
            if bank.nominal_voltage_v <= 0.0 {
                errors.push(ConfigError {
                    field: "battery_bank.nominal_voltage_v".into(),
                    message: "must be > 0".into(),
                });
            }
            if !(0.0..=100.0).contains(&bank.depth_of_discharge_pct)
                || bank.depth_of_discharge_pct == 0.0
            {
                errors.push(ConfigError {
                    field: "battery_bank.depth_of_discharge_pct".into(),
                    message: "must be in (0.0, 100.0]".into(),
                });
            }
            if bank.max_cycle_dod_pct <= 0.0 || bank.max_cycle_dod_pct > 100.0 {
                errors.push(ConfigError {
                    field: "battery_bank.max_cycle_dod_pct".into(),
                    message: "must be in (0.0, 100.0]".into(),
                });
            }
            if bank.max_discharge_cycles <= 0.0 {
                errors.push(ConfigError {
                    field: "battery_bank.max_discharge_cycles".into(),
                    message: "must be > 0".into(),
                });
            }
            if self.charge_controller.is_none() && self.inverter.is_none() {
                errors.push(ConfigError {
                    field: "battery_bank".into(),
                    message: "requires an inverter or charge controller".into(),
                });
            }
        }

        errors
    }
}
