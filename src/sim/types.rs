//! Core simulation types: samples, per-hour results, and diagnostics.

use std::fmt;

use thiserror::Error;

use crate::sim::calendar::HourStamp;

/// One hour of combined array electrical output at the maximum power point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArraySample {
    /// Array power (W).
    pub power_w: f64,
    /// Array voltage (V).
    pub voltage_v: f64,
    /// Array current (A).
    pub current_a: f64,
}

impl ArraySample {
    /// A fully dark sample.
    pub const ZERO: Self = Self {
        power_w: 0.0,
        voltage_v: 0.0,
        current_a: 0.0,
    };

    pub fn new(power_w: f64, voltage_v: f64, current_a: f64) -> Self {
        Self {
            power_w,
            voltage_v,
            current_a,
        }
    }

    /// Zeroes the whole sample when any component is non-positive.
    ///
    /// Corrupt upstream physics results (backfeed, negative currents) are
    /// normalized away rather than propagated into the energy balance.
    pub fn normalized(self) -> Self {
        if self.power_w <= 0.0 || self.voltage_v <= 0.0 || self.current_a <= 0.0 {
            Self::ZERO
        } else {
            self
        }
    }
}

/// One hour of user demand, split by supply mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadSample {
    /// AC demand (W).
    pub ac_w: f64,
    /// DC demand (W).
    pub dc_w: f64,
}

impl LoadSample {
    pub fn new(ac_w: f64, dc_w: f64) -> Self {
        Self { ac_w, dc_w }
    }

    /// Total user demand (W).
    pub fn total(&self) -> f64 {
        self.ac_w + self.dc_w
    }
}

/// Severity tiers for per-hour diagnostics.
///
/// `Fatal` is a reserved contract tier: no resolver path emits it today, but
/// the engine honors it with an early abort when running in strict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "Warning"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// A recorded under-supply condition for one hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// Resolver output for a single hour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlyResult {
    /// Power delivered to the user load (W).
    pub power_out_w: f64,
    /// Fraction of required load actually delivered.
    pub service: f64,
    /// Fraction of available array power actually delivered.
    pub delivery_efficiency: f64,
    /// Overhead load imposed by the inverter and charge controller (W).
    pub system_load_w: f64,
    /// Power drawn from (negative) or pushed into (positive) the bank (W).
    pub battery_drain_w: f64,
    /// Bank state of charge after the hour (%).
    pub battery_soc_pct: f64,
    /// Usable power remaining in the bank (W).
    pub battery_power_w: f64,
    /// Under-supply condition recorded for this hour, if any.
    pub diagnostic: Option<Diagnostic>,
}

/// Header line for the per-hour text log.
pub const HOURLY_LOG_HEADER: &str = " Indx \t ArP  \t ArI  \t ArV  \t dcLd \t acLd \t ttLd \
                                     \t  PO  \t  PS  \t  DE  \t  SL  \t  BP  \t  BD  \t  BS  \t  EM";

/// Complete record of one simulated hour, as exported to CSV and logs.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyRecord {
    /// Hour index from the start of the run.
    pub hour: usize,
    /// Calendar position of the hour.
    pub stamp: HourStamp,
    /// Combined (already normalized) array output.
    pub array: ArraySample,
    /// User demand for the hour.
    pub load: LoadSample,
    /// Resolver decision for the hour.
    pub result: HourlyResult,
}

impl fmt::Display for HourlyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.result;
        let message = match &r.diagnostic {
            Some(d) => format!("After {} days {}", 1 + self.hour / 24, d.message),
            None => String::new(),
        };
        write!(
            f,
            "{:06}\t{:6.2}\t{:6.2}\t{:6.2}\t{:6.2}\t{:6.2}\t{:6.2}\t{:6.2}\t{:6.2}\t{:6.2}\t{:6.2}\t{:6.2}\t{:6.2}\t{:6.2}\t{}",
            self.hour,
            self.array.power_w,
            self.array.current_a,
            self.array.voltage_v,
            self.load.dc_w,
            self.load.ac_w,
            self.load.total(),
            r.power_out_w,
            r.service,
            r.delivery_efficiency,
            r.system_load_w,
            r.battery_power_w,
            r.battery_drain_w,
            r.battery_soc_pct,
            message,
        )
    }
}

/// Simulation-level failures.
///
/// Both variants are defects or strict-mode aborts, never ordinary
/// under-supply: those are recorded as [`Diagnostic`]s and the run continues.
#[derive(Debug, Error)]
pub enum SimError {
    /// A state invariant that correct clamping makes unreachable was violated.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// A fatal diagnostic was raised while running in strict mode.
    #[error("fatal diagnostic after hour {hour}: {message}")]
    FatalDiagnostic { hour: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::calendar::hour_stamp;

    #[test]
    fn normalization_zeroes_backfeed() {
        let s = ArraySample::new(100.0, -12.0, 4.0).normalized();
        assert_eq!(s, ArraySample::ZERO);
    }

    #[test]
    fn normalization_keeps_positive_samples() {
        let s = ArraySample::new(480.0, 24.0, 20.0);
        assert_eq!(s.normalized(), s);
    }

    #[test]
    fn load_total_sums_modes() {
        let l = LoadSample::new(150.0, 50.0);
        assert_eq!(l.total(), 200.0);
    }

    #[test]
    fn record_display_includes_day_prefix_for_diagnostics() {
        let record = HourlyRecord {
            hour: 49,
            stamp: hour_stamp(49),
            array: ArraySample::ZERO,
            load: LoadSample::new(0.0, 100.0),
            result: HourlyResult {
                diagnostic: Some(Diagnostic::warning("insufficient array power")),
                ..HourlyResult::default()
            },
        };
        let line = record.to_string();
        assert!(line.contains("After 3 days insufficient array power"));
    }

    #[test]
    fn record_display_does_not_panic_without_diagnostic() {
        let record = HourlyRecord {
            hour: 0,
            stamp: hour_stamp(0),
            array: ArraySample::new(1000.0, 40.0, 25.0),
            load: LoadSample::new(200.0, 100.0),
            result: HourlyResult::default(),
        };
        assert!(!record.to_string().is_empty());
    }
}
