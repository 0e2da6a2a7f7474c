//! CSV export for the hourly simulation series.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::HourlyRecord;

/// Schema v1 column header for hourly CSV export.
const HEADER: &str = "hour,month,day_of_year,array_power_w,array_voltage_v,array_current_a,\
                      ac_load_w,dc_load_w,power_out_w,service,delivery_efficiency,\
                      system_load_w,battery_drain_w,battery_soc_pct,battery_power_w,message";

/// Exports the hourly series to a CSV file at the given path.
///
/// Writes a header row followed by one data row per hour. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[HourlyRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, buf)
}

/// Writes the hourly series as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[HourlyRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    // Header
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    // Data rows
    for r in records {
        let res = &r.result;
        wtr.write_record(&[
            r.hour.to_string(),
            r.stamp.month.to_string(),
            r.stamp.day_of_year.to_string(),
            format!("{:.4}", r.array.power_w),
            format!("{:.4}", r.array.voltage_v),
            format!("{:.4}", r.array.current_a),
            format!("{:.4}", r.load.ac_w),
            format!("{:.4}", r.load.dc_w),
            format!("{:.4}", res.power_out_w),
            format!("{:.4}", res.service),
            format!("{:.4}", res.delivery_efficiency),
            format!("{:.4}", res.system_load_w),
            format!("{:.4}", res.battery_drain_w),
            format!("{:.4}", res.battery_soc_pct),
            format!("{:.4}", res.battery_power_w),
            res.diagnostic
                .as_ref()
                .map(|d| d.message.clone())
                .unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
