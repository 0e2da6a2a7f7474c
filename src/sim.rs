//! Simulation core: battery bank, resolver, combiner, engine, and aggregation.

pub mod bank;
/// Non-leap-year hour calendar.
pub mod calendar;
pub mod combiner;
pub mod engine;
/// Inverter and charge-controller equipment models.
pub mod equipment;
pub mod resolver;
pub mod summary;
pub mod types;
