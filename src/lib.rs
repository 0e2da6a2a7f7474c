//! Hourly energy-balance simulator for off-grid and hybrid solar PV systems.
//!
//! Given a year of per-hour array electrical output and a 24-hour load
//! profile, the simulator decides how much of the load is served each hour,
//! how a battery bank charges or discharges, and whether the design failed to
//! meet demand, then aggregates the hourly series into monthly and annual
//! summaries.

pub mod config;
pub mod io;
pub mod load;
/// Battery bank, power-distribution resolver, and year-long orchestration.
pub mod sim;
pub mod source;
