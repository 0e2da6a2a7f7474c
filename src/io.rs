//! File output: CSV export of the hourly series.

pub mod export;
