//! Battery bank state: SOC, terminal voltage, and cycle-life bookkeeping.

use serde::Deserialize;

use crate::sim::types::SimError;

/// Logarithmic discharge-curve slope divisor.
///
/// Kept as the literal pair used by the reference discharge model so runs
/// stay numerically comparable with it.
const DISCHARGE_CURVE_SLOPE: f64 = 1.2 / 6.22;

/// Grid voltage assumed for autonomy sizing when the site leaves it unset.
const DEFAULT_GRID_VOLTAGE_V: f64 = 120.0;

/// Upper bound on the lifecycle estimate, preserved as a literal contract.
const LIFECYCLE_ESTIMATE_CAP: f64 = 5.0;

/// Battery chemistry, selecting the voltage-curve efficiency constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Chemistry {
    #[default]
    FloodedLeadAcid,
    Gel,
    Agm,
    LithiumIon,
}

impl Chemistry {
    /// Efficiency constant shaping the logarithmic discharge curve.
    pub fn voltage_efficiency(self) -> f64 {
        match self {
            Self::FloodedLeadAcid => 0.80,
            Self::Gel => 0.85,
            Self::Agm => 0.90,
            Self::LithiumIon => 0.95,
        }
    }
}

/// Battery bank ratings supplied once at simulation setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BankConfig {
    /// Total bank capacity (Ah).
    pub capacity_ah: f64,
    /// Bank nominal voltage (V).
    pub nominal_voltage_v: f64,
    pub chemistry: Chemistry,
    /// Design depth-of-discharge limit (%).
    pub depth_of_discharge_pct: f64,
    /// Rated number of discharge cycles at the rated cycle DOD.
    pub max_discharge_cycles: f64,
    /// Depth of discharge per cycle at which the cycle rating holds (%).
    pub max_cycle_dod_pct: f64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            capacity_ah: 0.0,
            nominal_voltage_v: 0.0,
            chemistry: Chemistry::default(),
            depth_of_discharge_pct: 100.0,
            max_discharge_cycles: 1000.0,
            max_cycle_dod_pct: 50.0,
        }
    }
}

/// Per-hour state report returned by [`BatteryBank::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BankUpdate {
    /// Power pushed into (positive) or drawn from (negative) the bank (W).
    pub drain_w: f64,
    /// State of charge after the update, 0.0 to 1.0.
    pub soc: f64,
    /// Usable power remaining in the bank (W).
    pub power_w: f64,
}

/// A bank of batteries tracked as one lumped store.
///
/// Created once per simulation run; `initialize` sets the starting point and
/// `update` is then called exactly once per simulated hour.
#[derive(Debug, Clone)]
pub struct BatteryBank {
    capacity_ah: f64,
    nominal_voltage_v: f64,
    chemistry: Chemistry,
    depth_of_discharge_pct: f64,
    max_discharge_cycles: f64,
    max_cycle_dod_pct: f64,
    soc: f64,
    current_capacity_ah: f64,
    voltage_v: f64,
    total_cycles: f64,
}

impl BatteryBank {
    pub fn new(config: &BankConfig) -> Self {
        Self {
            capacity_ah: config.capacity_ah,
            nominal_voltage_v: config.nominal_voltage_v,
            chemistry: config.chemistry,
            depth_of_discharge_pct: config.depth_of_discharge_pct,
            max_discharge_cycles: config.max_discharge_cycles,
            max_cycle_dod_pct: config.max_cycle_dod_pct,
            soc: 1.0,
            current_capacity_ah: config.capacity_ah,
            voltage_v: config.nominal_voltage_v,
            total_cycles: 0.0,
        }
    }

    /// Resets the bank to a known starting point.
    ///
    /// The starting SOC blends the requested fraction with the design DOD
    /// floor, so a bank that may only be drawn down 50% never starts below
    /// half charge.
    pub fn initialize(&mut self, start_fraction: f64) {
        self.total_cycles = 0.0;
        self.soc = start_fraction + (self.depth_of_discharge_pct / 100.0) * (1.0 - start_fraction);
        self.current_capacity_ah = self.capacity_ah * self.soc;
        self.set_voltage();
    }

    /// State of charge, 0.0 to 1.0.
    pub fn soc(&self) -> f64 {
        self.soc
    }

    /// Terminal voltage at the current SOC (V).
    pub fn voltage(&self) -> f64 {
        self.voltage_v
    }

    /// Usable capacity at the current SOC (Ah).
    pub fn current_capacity_ah(&self) -> f64 {
        self.capacity_ah * self.soc
    }

    /// Usable power remaining in the bank (W).
    pub fn current_power_w(&self) -> f64 {
        self.current_capacity_ah() * self.voltage_v
    }

    /// Cumulative discharge cycles recorded this run.
    pub fn total_cycles(&self) -> f64 {
        self.total_cycles
    }

    /// Rated discharge-cycle lifetime.
    pub fn rated_cycles(&self) -> f64 {
        self.max_discharge_cycles
    }

    /// True while the bank remains above its depth-of-discharge floor.
    pub fn is_okay(&self) -> bool {
        self.soc > 1.0 - self.depth_of_discharge_pct / 100.0
    }

    /// Applies one hour of signed current flow (Ah; positive charges).
    ///
    /// The transfer magnitude is capped at the usable capacity before the
    /// sign is reapplied, the capacity is clamped to the bank's bounds, and
    /// the voltage and cycle counters are refreshed. A negative SOC after a
    /// correctly clamped update is a defect, reported as
    /// [`SimError::InvariantViolation`].
    pub fn update(&mut self, current_a: f64) -> Result<BankUpdate, SimError> {
        let old_soc = self.soc;
        let mut drain_w = 0.0;

        if current_a != 0.0 {
            let transfer = current_a.abs().min(self.current_capacity_ah()) * current_a.signum();
            drain_w = self.voltage_v * transfer;

            let new_capacity = (self.current_capacity_ah + current_a).clamp(0.0, self.capacity_ah);
            let new_soc = (new_capacity / self.capacity_ah).min(1.0);
            if new_soc < 0.0 {
                return Err(SimError::InvariantViolation(format!(
                    "bank SOC fell below zero for current {current_a} Ah, capacity {new_capacity} Ah"
                )));
            }
            self.current_capacity_ah = new_capacity;
            self.soc = new_soc;
            self.set_voltage();
        }

        self.record_cycles(old_soc - self.soc);

        Ok(BankUpdate {
            drain_w,
            soc: self.soc,
            power_w: self.current_power_w(),
        })
    }

    /// Multiple of the rated cycle life remaining, capped at 5.0.
    ///
    /// Returns 0 before any discharge has been recorded.
    pub fn lifecycle_estimate(&self) -> f64 {
        if self.total_cycles > 0.0 {
            (self.max_discharge_cycles / self.total_cycles).min(LIFECYCLE_ESTIMATE_CAP)
        } else {
            0.0
        }
    }

    /// Bank capacity (Ah) required to carry `daily_load_wh` for
    /// `days_of_autonomy` days within the design DOD.
    pub fn capacity_requirement(
        &self,
        days_of_autonomy: f64,
        daily_load_wh: f64,
        grid_voltage_v: f64,
    ) -> f64 {
        let gv = if grid_voltage_v > 0.0 {
            grid_voltage_v
        } else {
            DEFAULT_GRID_VOLTAGE_V
        };
        let dod = self.depth_of_discharge_pct / 100.0;
        let eff = self.chemistry.voltage_efficiency();
        ((days_of_autonomy * daily_load_wh) / (gv * dod * eff)).round()
    }

    /// Recomputes terminal voltage from SOC via the logarithmic
    /// discharge-curve approximation.
    fn set_voltage(&mut self) {
        if self.soc >= 1.0 {
            self.voltage_v = self.nominal_voltage_v;
        } else if self.soc <= 0.0 {
            self.voltage_v = 0.0;
        } else {
            let eff = self.chemistry.voltage_efficiency();
            self.voltage_v = eff * (self.nominal_voltage_v * DISCHARGE_CURVE_SLOPE) * self.soc.ln()
                + self.nominal_voltage_v;
        }
    }

    /// Accumulates discharge cycles; `delta` is `old_soc - new_soc`.
    fn record_cycles(&mut self, delta: f64) {
        if delta > 0.0 {
            self.total_cycles += delta * 100.0 / (2.0 * self.max_cycle_dod_pct);
        }
    }
}
