//! Shared test fixtures for integration tests.

use offgrid_sim::load::LoadProfile;
use offgrid_sim::sim::bank::{BankConfig, Chemistry};
use offgrid_sim::sim::equipment::{ChargeController, ControllerType, EquipmentConfig};
use offgrid_sim::sim::types::ArraySample;

/// Square-wave array series: `daylight_power` W from 06:00 to 18:00, dark
/// otherwise, at a 40 V bus.
pub fn square_wave_series(hours: usize, daylight_power: f64) -> Vec<ArraySample> {
    (0..hours)
        .map(|h| {
            if (6..18).contains(&(h % 24)) {
                ArraySample::new(daylight_power, 40.0, daylight_power / 40.0)
            } else {
                ArraySample::ZERO
            }
        })
        .collect()
}

/// Default MPPT charge controller (150 V / 60 A PV input, 96% efficient).
pub fn mppt_controller() -> ChargeController {
    ChargeController {
        controller_type: ControllerType::Mppt,
        max_pv_v: 150.0,
        max_pv_a: 60.0,
        nominal_battery_v: 24.0,
        max_charge_v: 30.0,
        max_charge_a: 60.0,
        max_discharge_a: 60.0,
        self_consumption_w: 2.0,
        efficiency_pct: 96.0,
        ..ChargeController::default()
    }
}

/// Controller-only equipment around [`mppt_controller`].
pub fn controller_equipment() -> EquipmentConfig {
    EquipmentConfig {
        inverter: None,
        charge_controller: Some(mppt_controller()),
    }
}

/// Default lead-acid bank (400 Ah at 24 V, 50% DOD).
pub fn lead_acid_bank() -> BankConfig {
    BankConfig {
        capacity_ah: 400.0,
        nominal_voltage_v: 24.0,
        chemistry: Chemistry::FloodedLeadAcid,
        depth_of_discharge_pct: 50.0,
        max_discharge_cycles: 1000.0,
        max_cycle_dod_pct: 50.0,
    }
}

/// Flat round-the-clock DC demand.
pub fn constant_dc_profile(watts: f64) -> LoadProfile {
    LoadProfile::constant(0.0, watts)
}
