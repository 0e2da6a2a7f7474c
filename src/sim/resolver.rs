//! Power-distribution resolver: maps one hour of array output and demand to
//! a delivery decision, optionally charging or discharging a battery bank.

use crate::sim::bank::BatteryBank;
use crate::sim::equipment::{ChargeController, ControllerType, EquipmentConfig, Inverter};
use crate::sim::types::{ArraySample, Diagnostic, HourlyResult, LoadSample, SimError};

/// Headroom factor over the required power before surplus flows to the bank.
const SURPLUS_MARGIN: f64 = 1.1;

/// Charge-acceptance voltage rise above the bank's resting voltage.
const CHARGE_VOLTAGE_RISE: f64 = 1.2;

/// Operating ceilings derived from whichever equipment is present.
///
/// At most one of inverter/controller is expected to gate the ceilings in a
/// given configuration, but both may be present; the inverter wins the
/// voltage/current limits and the tighter conversion efficiency applies.
struct InternalParams {
    standby_power_w: f64,
    conversion_efficiency: f64,
    pv_max_voltage_v: f64,
    pv_max_current_a: f64,
    max_charge_voltage_v: f64,
    max_discharge_current_a: f64,
    controller_type: ControllerType,
}

impl InternalParams {
    /// Returns `None` when neither inverter nor controller is configured.
    fn derive(inverter: Option<&Inverter>, controller: Option<&ChargeController>) -> Option<Self> {
        let (pv_max_voltage_v, pv_max_current_a, max_charge_voltage_v, max_discharge_current_a) =
            if let Some(inv) = inverter {
                let pv_max_current = if inv.dc_rated_v > 0.0 {
                    inv.dc_rated_w / inv.dc_rated_v
                } else {
                    0.0
                };
                (inv.max_dc_v, pv_max_current, inv.max_dc_v, inv.max_dc_a)
            } else if let Some(ctl) = controller {
                (ctl.max_pv_v, ctl.max_pv_a, ctl.max_charge_v, ctl.max_discharge_a)
            } else {
                return None;
            };

        let inverter_efficiency = inverter.map_or(1.0, |inv| {
            if inv.dc_rated_w > 0.0 {
                inv.ac_rated_w / inv.dc_rated_w
            } else {
                1.0
            }
        });
        let controller_efficiency = controller.map_or(1.0, |ctl| ctl.efficiency_pct / 100.0);

        Some(Self {
            standby_power_w: inverter.map_or(0.0, |inv| inv.night_power_w)
                + controller.map_or(0.0, |ctl| ctl.self_consumption_w),
            conversion_efficiency: inverter_efficiency.min(controller_efficiency),
            pv_max_voltage_v,
            pv_max_current_a,
            max_charge_voltage_v,
            max_discharge_current_a,
            controller_type: controller.map_or(ControllerType::Mppt, |ctl| ctl.controller_type),
        })
    }
}

/// Resolves one hour of the energy balance.
///
/// Mutates the bank at most once. Under-supply is reported through the
/// result's diagnostic, never as an error; `Err` is reserved for invariant
/// defects surfacing from the bank update.
pub fn resolve_hour(
    array: ArraySample,
    load: LoadSample,
    equipment: &EquipmentConfig,
    bank: Option<&mut BatteryBank>,
) -> Result<HourlyResult, SimError> {
    let array = array.normalized();
    let mut out = HourlyResult::default();

    let Some(params) = InternalParams::derive(
        equipment.inverter.as_ref(),
        equipment.charge_controller.as_ref(),
    ) else {
        // Direct DC coupling: the array feeds the DC load with nothing in
        // between, and the bank (if any) is not reachable.
        if load.dc_w > 0.0 && array.power_w > 0.0 {
            out.power_out_w = array.power_w.min(load.dc_w);
            out.delivery_efficiency = out.power_out_w / array.power_w;
            out.service = out.power_out_w / load.dc_w;
        }
        if let Some(bank) = bank {
            out.battery_soc_pct = bank.soc() * 100.0;
            out.battery_power_w = bank.current_power_w();
        }
        return Ok(out);
    };

    let user_load = load.total();
    let mut system_load = params.standby_power_w;
    if let Some(inv) = &equipment.inverter {
        system_load += inv.dc_input_power(load.ac_w);
    }
    system_load = (user_load + system_load) / params.conversion_efficiency - user_load;
    let required_power = user_load + system_load;
    out.system_load_w = system_load;

    let mut vout = array.voltage_v.min(params.pv_max_voltage_v);
    let mut iout = array.current_a.min(params.pv_max_current_a);
    let surplus = array.power_w - required_power * SURPLUS_MARGIN;

    let bank_usable = bank
        .as_ref()
        .is_some_and(|b| surplus >= 0.0 || b.is_okay());

    match bank {
        Some(bank) if bank_usable => {
            let mut bank_voltage = bank.voltage();
            if bank_voltage <= 0.0 {
                bank_voltage = 1.0;
            }

            if surplus >= 0.0 {
                // Charge: route the surplus into the bank at whichever
                // current the controller strategy allows.
                vout = vout.min(params.max_charge_voltage_v);
                let accept_v = bank_voltage * CHARGE_VOLTAGE_RISE;
                iout = if vout > 0.0 {
                    match params.controller_type {
                        ControllerType::Mppt => (surplus / vout).max(surplus / accept_v),
                        ControllerType::Pwm => (surplus / vout).min(surplus / accept_v),
                    }
                } else {
                    0.0
                };
            } else {
                let deficit = -surplus;
                if deficit <= bank.current_power_w() {
                    if vout == 0.0 || iout == 0.0 {
                        vout = bank_voltage;
                    }
                    iout = -params.max_discharge_current_a.min(deficit / vout);
                } else if array.power_w < system_load {
                    out.diagnostic = Some(Diagnostic::warning(format!(
                        "insufficient array and bank power to sustain system operation: \
                         {system_load:.2} W needed but only {:.2} W generated",
                        array.power_w
                    )));
                    // The clamped array current still trickles into the bank.
                } else {
                    if vout == 0.0 {
                        vout = bank_voltage;
                    }
                    iout = -((array.power_w - system_load) / vout);
                }
            }

            let update = bank.update(iout)?;
            out.battery_drain_w = update.drain_w;
            out.battery_soc_pct = update.soc * 100.0;
            out.battery_power_w = update.power_w;

            if array.power_w - update.drain_w - required_power >= 0.0 {
                out.power_out_w = required_power;
            } else if array.power_w - system_load >= 0.0 {
                out.power_out_w = array.power_w - system_load;
            } else {
                out.power_out_w = 0.0;
                out.diagnostic = Some(Diagnostic::warning(format!(
                    "insufficient array and bank power to sustain system operation: \
                     {system_load:.2} W needed but only {:.2} W generated",
                    array.power_w
                )));
            }

            if user_load > 0.0 {
                out.service = out.power_out_w / required_power;
            }
            if array.power_w > 0.0 {
                out.delivery_efficiency = out.power_out_w / array.power_w;
            }
        }
        bank => {
            // No bank, or the bank has hit its depth-of-discharge floor.
            if array.power_w < system_load && user_load > 0.0 {
                out.diagnostic = Some(Diagnostic::warning(format!(
                    "insufficient array power to sustain system operation: \
                     {system_load:.2} W needed but only {:.2} W available",
                    array.power_w
                )));
            }
            vout = vout.min(params.max_charge_voltage_v);
            iout = iout.min(params.max_discharge_current_a);
            if params.controller_type == ControllerType::Mppt {
                // MPPT re-optimizes the operating point; it does not
                // under-clamp the current.
                iout = iout.max(params.max_discharge_current_a);
            }
            let power_out = array.power_w.min(vout * iout).min(required_power);
            if array.power_w > 0.0 && user_load > 0.0 {
                out.power_out_w = power_out;
                out.delivery_efficiency = power_out / array.power_w;
            }
            if array.power_w > required_power && user_load > 0.0 {
                out.service = power_out / required_power;
            }
            if let Some(bank) = bank {
                out.battery_soc_pct = bank.soc() * 100.0;
                out.battery_power_w = bank.current_power_w();
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::sim::bank::{BankConfig, BatteryBank, Chemistry};
    use crate::sim::types::Severity;

    fn controller(controller_type: ControllerType) -> ChargeController {
        ChargeController {
            controller_type,
            max_pv_v: 100.0,
            max_pv_a: 40.0,
            nominal_battery_v: 24.0,
            max_charge_v: 30.0,
            max_charge_a: 40.0,
            max_discharge_a: 25.0,
            self_consumption_w: 2.0,
            efficiency_pct: 95.0,
            ..ChargeController::default()
        }
    }

    fn inverter() -> Inverter {
        Inverter {
            night_power_w: 10.0,
            ac_rated_w: 1000.0,
            dc_rated_w: 1100.0,
            dc_rated_v: 48.0,
            max_dc_v: 60.0,
            max_dc_a: 30.0,
            ..Inverter::default()
        }
    }

    fn bank_at(start_fraction: f64) -> BatteryBank {
        let mut bank = BatteryBank::new(&BankConfig {
            capacity_ah: 200.0,
            nominal_voltage_v: 24.0,
            chemistry: Chemistry::FloodedLeadAcid,
            depth_of_discharge_pct: 50.0,
            ..BankConfig::default()
        });
        bank.initialize(start_fraction);
        bank
    }

    fn controller_only(controller_type: ControllerType) -> EquipmentConfig {
        EquipmentConfig {
            inverter: None,
            charge_controller: Some(controller(controller_type)),
        }
    }

    #[test]
    fn direct_dc_passthrough_caps_at_load() {
        let result = resolve_hour(
            ArraySample::new(1000.0, 40.0, 25.0),
            LoadSample::new(0.0, 200.0),
            &EquipmentConfig::default(),
            None,
        )
        .expect("resolve");
        assert_relative_eq!(result.power_out_w, 200.0);
        assert_relative_eq!(result.service, 1.0);
        assert_relative_eq!(result.delivery_efficiency, 0.2);
        assert!(result.diagnostic.is_none());
    }

    #[test]
    fn direct_dc_passthrough_caps_at_array() {
        let result = resolve_hour(
            ArraySample::new(150.0, 40.0, 3.75),
            LoadSample::new(0.0, 200.0),
            &EquipmentConfig::default(),
            None,
        )
        .expect("resolve");
        assert_relative_eq!(result.power_out_w, 150.0);
        assert_relative_eq!(result.service, 0.75);
        assert_relative_eq!(result.delivery_efficiency, 1.0);
    }

    #[test]
    fn direct_dc_dark_hour_delivers_nothing() {
        let result = resolve_hour(
            ArraySample::ZERO,
            LoadSample::new(0.0, 200.0),
            &EquipmentConfig::default(),
            None,
        )
        .expect("resolve");
        assert_eq!(result.power_out_w, 0.0);
        assert_eq!(result.service, 0.0);
    }

    #[test]
    fn backfeed_sample_is_treated_as_dark() {
        let result = resolve_hour(
            ArraySample::new(500.0, -40.0, 12.5),
            LoadSample::new(0.0, 200.0),
            &EquipmentConfig::default(),
            None,
        )
        .expect("resolve");
        assert_eq!(result.power_out_w, 0.0);
    }

    #[test]
    fn system_load_reflects_standby_and_conversion_losses() {
        let equipment = controller_only(ControllerType::Mppt);
        let result = resolve_hour(
            ArraySample::new(1500.0, 40.0, 37.5),
            LoadSample::new(0.0, 200.0),
            &equipment,
            None,
        )
        .expect("resolve");
        // (200 + 2) / 0.95 - 200
        assert_relative_eq!(result.system_load_w, 202.0 / 0.95 - 200.0, epsilon = 1e-9);
    }

    #[test]
    fn no_bank_daylight_serves_required_power() {
        let equipment = controller_only(ControllerType::Mppt);
        let result = resolve_hour(
            ArraySample::new(1500.0, 40.0, 37.5),
            LoadSample::new(0.0, 200.0),
            &equipment,
            None,
        )
        .expect("resolve");
        let required = 202.0 / 0.95;
        assert_relative_eq!(result.power_out_w, required, epsilon = 1e-9);
        assert_relative_eq!(result.service, 1.0, epsilon = 1e-9);
        assert!(result.diagnostic.is_none());
    }

    #[test]
    fn no_bank_dark_hour_with_load_warns() {
        let equipment = controller_only(ControllerType::Mppt);
        let result = resolve_hour(
            ArraySample::ZERO,
            LoadSample::new(0.0, 200.0),
            &equipment,
            None,
        )
        .expect("resolve");
        assert_eq!(result.power_out_w, 0.0);
        let diagnostic = result.diagnostic.expect("under-supply diagnostic");
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert!(diagnostic.message.contains("insufficient array power"));
    }

    #[test]
    fn no_bank_no_load_stays_silent() {
        let equipment = controller_only(ControllerType::Mppt);
        let result = resolve_hour(ArraySample::ZERO, LoadSample::default(), &equipment, None)
            .expect("resolve");
        assert!(result.diagnostic.is_none());
        assert_eq!(result.power_out_w, 0.0);
    }

    #[test]
    fn surplus_charges_bank_and_serves_load() {
        let equipment = controller_only(ControllerType::Mppt);
        let mut bank = bank_at(0.0); // SOC 0.5 after the DOD blend
        let soc_before = bank.soc();
        let result = resolve_hour(
            ArraySample::new(2000.0, 40.0, 50.0),
            LoadSample::new(0.0, 200.0),
            &equipment,
            Some(&mut bank),
        )
        .expect("resolve");
        assert!(bank.soc() > soc_before);
        assert!(result.battery_drain_w > 0.0);
        assert_relative_eq!(result.service, 1.0, epsilon = 1e-9);
        assert!(result.diagnostic.is_none());
    }

    #[test]
    fn mppt_pulls_more_charge_current_than_pwm() {
        let array = ArraySample::new(2000.0, 40.0, 50.0);
        let load = LoadSample::new(0.0, 200.0);

        let mut mppt_bank = bank_at(0.0);
        resolve_hour(array, load, &controller_only(ControllerType::Mppt), Some(&mut mppt_bank))
            .expect("mppt resolve");

        let mut pwm_bank = bank_at(0.0);
        resolve_hour(array, load, &controller_only(ControllerType::Pwm), Some(&mut pwm_bank))
            .expect("pwm resolve");

        assert!(mppt_bank.soc() > pwm_bank.soc());
    }

    #[test]
    fn deficit_within_bank_discharges_it() {
        let equipment = controller_only(ControllerType::Mppt);
        let mut bank = bank_at(0.9); // well above the DOD floor
        let soc_before = bank.soc();
        let result = resolve_hour(
            ArraySample::ZERO,
            LoadSample::new(0.0, 200.0),
            &equipment,
            Some(&mut bank),
        )
        .expect("resolve");
        assert!(bank.soc() < soc_before);
        assert!(result.battery_drain_w < 0.0);
        assert_relative_eq!(result.power_out_w, result.system_load_w + 200.0, epsilon = 1e-9);
        assert_relative_eq!(result.service, 1.0, epsilon = 1e-9);
        assert!(result.diagnostic.is_none());
    }

    #[test]
    fn discharge_respects_current_ceiling() {
        let mut ctl = controller(ControllerType::Mppt);
        ctl.max_discharge_a = 1.0;
        let equipment = EquipmentConfig {
            inverter: None,
            charge_controller: Some(ctl),
        };
        let mut bank = bank_at(0.9);
        let voltage = bank.voltage();
        let result = resolve_hour(
            ArraySample::ZERO,
            LoadSample::new(0.0, 200.0),
            &equipment,
            Some(&mut bank),
        )
        .expect("resolve");
        // Only 1 A may flow, so the hour cannot cover the demand.
        assert!(result.battery_drain_w >= -voltage);
        assert!(result.power_out_w < 200.0);
    }

    #[test]
    fn deficit_beyond_bank_warns_and_delivers_nothing() {
        let equipment = controller_only(ControllerType::Mppt);
        // Dischargeable bank, but its stored power is tiny relative to
        // the demand.
        let mut bank = bank_at(0.6);
        assert!(bank.is_okay());
        let soc_before = bank.soc();
        let result = resolve_hour(
            ArraySample::ZERO,
            LoadSample::new(0.0, 1_000_000.0),
            &equipment,
            Some(&mut bank),
        )
        .expect("resolve");
        assert_eq!(result.power_out_w, 0.0);
        // Dark hour, so no array current reaches the bank either.
        assert_relative_eq!(bank.soc(), soc_before);
        let diagnostic = result.diagnostic.expect("under-supply diagnostic");
        assert!(diagnostic.message.contains("array and bank"));
    }

    #[test]
    fn dim_hour_beyond_bank_still_trickle_charges() {
        let equipment = controller_only(ControllerType::Mppt);
        let mut bank = bank_at(0.6);
        let soc_before = bank.soc();
        let result = resolve_hour(
            ArraySample::new(5.0, 20.0, 0.25),
            LoadSample::new(0.0, 1_000_000.0),
            &equipment,
            Some(&mut bank),
        )
        .expect("resolve");
        assert_eq!(result.power_out_w, 0.0);
        assert!(result.battery_drain_w > 0.0);
        assert!(bank.soc() > soc_before);
        let diagnostic = result.diagnostic.expect("under-supply diagnostic");
        assert!(diagnostic.message.contains("array and bank"));
    }

    #[test]
    fn floored_bank_falls_back_to_array_only_path() {
        let equipment = controller_only(ControllerType::Mppt);
        let mut bank = bank_at(0.0);
        // Pull the bank below its floor so it is no longer dischargeable.
        bank.update(-60.0).expect("drawdown");
        assert!(!bank.is_okay());
        let soc_before = bank.soc();
        let result = resolve_hour(
            ArraySample::ZERO,
            LoadSample::new(0.0, 200.0),
            &equipment,
            Some(&mut bank),
        )
        .expect("resolve");
        // The bank is reported but untouched.
        assert_relative_eq!(bank.soc(), soc_before);
        assert_relative_eq!(result.battery_soc_pct, soc_before * 100.0);
        assert!(result.diagnostic.is_some());
    }

    #[test]
    fn inverter_limits_gate_when_present() {
        let equipment = EquipmentConfig {
            inverter: Some(inverter()),
            charge_controller: None,
        };
        let result = resolve_hour(
            ArraySample::new(1500.0, 80.0, 18.75),
            LoadSample::new(500.0, 0.0),
            &equipment,
            None,
        )
        .expect("resolve");
        // System load includes the night draw and the AC conversion draw;
        // conversion efficiency is Paco/Pdco.
        let eff: f64 = 1000.0 / 1100.0;
        let dc_draw = (1.0 + 500.0 * 0.1) / 0.9637;
        let system_load = (500.0 + 10.0 + dc_draw) / eff - 500.0;
        assert_relative_eq!(result.system_load_w, system_load, epsilon = 1e-9);
        assert_relative_eq!(result.power_out_w, 500.0 + system_load, epsilon = 1e-9);
    }

    #[test]
    fn resolver_without_user_load_still_charges_bank() {
        let equipment = controller_only(ControllerType::Mppt);
        let mut bank = bank_at(0.0);
        let soc_before = bank.soc();
        let result = resolve_hour(
            ArraySample::new(1000.0, 40.0, 25.0),
            LoadSample::default(),
            &equipment,
            Some(&mut bank),
        )
        .expect("resolve");
        assert!(bank.soc() > soc_before);
        // No user load means no service figure.
        assert_eq!(result.service, 0.0);
    }
}
