//! Inverter and charge-controller equipment models.

use serde::Deserialize;

/// Inverter self-efficiency reference from the CEC performance model.
const INVERTER_EFF_REF: f64 = 0.9637;

/// DC/AC inverter ratings relevant to the energy balance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Inverter {
    /// Tare draw with no AC output (W).
    pub night_power_w: f64,
    /// Rated AC output power (W).
    pub ac_rated_w: f64,
    /// Rated DC input power (W).
    pub dc_rated_w: f64,
    /// Rated DC input voltage (V).
    pub dc_rated_v: f64,
    /// Maximum DC input voltage (V).
    pub max_dc_v: f64,
    /// Maximum DC input current (A).
    pub max_dc_a: f64,
    /// Lower bound of the MPPT voltage window (V).
    pub mppt_low_v: f64,
    /// Upper bound of the MPPT voltage window (V).
    pub mppt_high_v: f64,
}

impl Default for Inverter {
    fn default() -> Self {
        Self {
            night_power_w: 0.0,
            ac_rated_w: 0.0,
            dc_rated_w: 0.0,
            dc_rated_v: 0.0,
            max_dc_v: 0.0,
            max_dc_a: 0.0,
            mppt_low_v: 0.0,
            mppt_high_v: 0.0,
        }
    }
}

impl Inverter {
    /// Extra DC draw implied by serving `ac_load_w` through the inverter's
    /// no-load/full-load power curve.
    pub fn dc_input_power(&self, ac_load_w: f64) -> f64 {
        if ac_load_w > 0.0 && self.ac_rated_w > 0.0 {
            (1.0 + ac_load_w * ((self.dc_rated_w - self.ac_rated_w) / self.ac_rated_w))
                / INVERTER_EFF_REF
        } else {
            0.0
        }
    }
}

/// Charge-controller regulation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ControllerType {
    /// Maximum-power-point tracking: actively re-optimizes operating current.
    #[default]
    Mppt,
    /// Pulse-width modulated: voltage-clamped, takes the smaller current.
    Pwm,
}

/// Solar charge-controller ratings relevant to the energy balance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChargeController {
    pub controller_type: ControllerType,
    /// Maximum PV input voltage (V).
    pub max_pv_v: f64,
    /// Maximum PV input current (A).
    pub max_pv_a: f64,
    /// Nominal battery-side voltage (V).
    pub nominal_battery_v: f64,
    /// Maximum charge voltage (V).
    pub max_charge_v: f64,
    /// Maximum charge current (A).
    pub max_charge_a: f64,
    /// Maximum discharge current (A).
    pub max_discharge_a: f64,
    /// Temperature compensation coefficient (per degree C).
    pub temp_compensation: f64,
    /// Self consumption of the controller electronics (W).
    pub self_consumption_w: f64,
    /// Conversion efficiency (%).
    pub efficiency_pct: f64,
}

impl Default for ChargeController {
    fn default() -> Self {
        Self {
            controller_type: ControllerType::Mppt,
            max_pv_v: 0.0,
            max_pv_a: 0.0,
            nominal_battery_v: 0.0,
            max_charge_v: 0.0,
            max_charge_a: 0.0,
            max_discharge_a: 0.0,
            temp_compensation: 0.0,
            self_consumption_w: 0.0,
            efficiency_pct: 90.0,
        }
    }
}

/// Optional equipment sitting between the array and the load.
///
/// Presence is explicit: an absent inverter is `None`, never a zeroed-out
/// record tested for truthiness.
#[derive(Debug, Clone, Default)]
pub struct EquipmentConfig {
    pub inverter: Option<Inverter>,
    pub charge_controller: Option<ChargeController>,
}

impl EquipmentConfig {
    /// True when nothing sits between the array and the DC load.
    pub fn is_direct(&self) -> bool {
        self.inverter.is_none() && self.charge_controller.is_none()
    }
}
