//! Parallel combination of independently-computed array output series.
//!
//! Sub-arrays are computed independently by the PV model and merged with a
//! linearized constant-power parallel-source approximation. The combined bus
//! runs at the lowest contributing voltage and each source's current scales
//! to that voltage at constant power. This is not a true I-V curve
//! intersection; the approximation is part of the output contract.

use crate::sim::types::ArraySample;

/// Merges one hour's samples from every sub-array into a single source.
///
/// A single sample is returned unchanged, dark or not. Subsequent dark
/// sub-arrays are skipped, so a shaded or disconnected array never drags
/// the bus voltage down.
pub fn combine_samples(samples: &[ArraySample]) -> ArraySample {
    let mut combined = samples.first().copied().unwrap_or(ArraySample::ZERO);
    for sample in samples.iter().skip(1) {
        if combined.power_w > 0.0 && sample.power_w > 0.0 {
            let voltage = combined.voltage_v.min(sample.voltage_v);
            let current = combined.current_a * (voltage / combined.voltage_v)
                + sample.current_a * (voltage / sample.voltage_v);
            combined = ArraySample::new(voltage * current, voltage, current);
        } else if sample.power_w > 0.0 {
            combined = *sample;
        }
    }
    combined
}

/// Merges whole year series element-wise. Shorter series pad as dark hours.
pub fn combine_series(series: &[Vec<ArraySample>]) -> Vec<ArraySample> {
    let hours = series.iter().map(Vec::len).max().unwrap_or(0);
    (0..hours)
        .map(|hour| {
            let at_hour: Vec<ArraySample> = series
                .iter()
                .map(|s| s.get(hour).copied().unwrap_or(ArraySample::ZERO))
                .collect();
            combine_samples(&at_hour)
        })
        .collect()
}
