//! Monthly, best/worst-day, and annual aggregation of the hourly series.

use std::collections::BTreeMap;
use std::fmt;

use crate::sim::types::HourlyRecord;

/// Hourly quantity a monthly rollup can be computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Combined array output power.
    ArrayPower,
    /// Power delivered to the user load.
    PowerOut,
}

impl Metric {
    fn value(&self, record: &HourlyRecord) -> f64 {
        match self {
            Self::ArrayPower => record.array.power_w,
            Self::PowerOut => record.result.power_out_w,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArrayPower => write!(f, "Array Power"),
            Self::PowerOut => write!(f, "Power Delivered"),
        }
    }
}

/// Rollup of one calendar month's daily totals.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthSummary {
    /// Calendar month, 1-12.
    pub month: u32,
    /// Sum of the daily totals (Wh).
    pub total_wh: f64,
    /// Mean daily total (Wh).
    pub mean_wh: f64,
    /// Largest daily total (Wh).
    pub max_wh: f64,
    /// Smallest daily total (Wh).
    pub min_wh: f64,
    /// Days contributing to the month.
    pub days: usize,
}

/// Year of monthly rollups plus the best and worst single days.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyPerformance {
    pub metric: Metric,
    pub months: Vec<MonthSummary>,
    /// Day-of-year with the largest daily total. First occurrence wins ties.
    pub best_day_of_year: Option<u32>,
    /// Day-of-year with the smallest daily total. First occurrence wins ties.
    pub worst_day_of_year: Option<u32>,
}

impl MonthlyPerformance {
    /// Groups the hourly series by calendar day and rolls each month up.
    pub fn compute(records: &[HourlyRecord], metric: Metric) -> Self {
        let mut daily: BTreeMap<u32, (u32, f64)> = BTreeMap::new();
        for record in records {
            let entry = daily
                .entry(record.stamp.day_of_year)
                .or_insert((record.stamp.month, 0.0));
            entry.1 += metric.value(record);
        }

        let mut best: Option<(u32, f64)> = None;
        let mut worst: Option<(u32, f64)> = None;
        let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (&day, &(month, total)) in &daily {
            if best.is_none_or(|(_, b)| total > b) {
                best = Some((day, total));
            }
            if worst.is_none_or(|(_, w)| total < w) {
                worst = Some((day, total));
            }
            by_month.entry(month).or_default().push(total);
        }

        let months = by_month
            .into_iter()
            .map(|(month, totals)| {
                let total: f64 = totals.iter().sum();
                let max = totals.iter().copied().fold(f64::MIN, f64::max);
                let min = totals.iter().copied().fold(f64::MAX, f64::min);
                MonthSummary {
                    month,
                    total_wh: total,
                    mean_wh: total / totals.len() as f64,
                    max_wh: max,
                    min_wh: min,
                    days: totals.len(),
                }
            })
            .collect();

        Self {
            metric,
            months,
            best_day_of_year: best.map(|(day, _)| day),
            worst_day_of_year: worst.map(|(day, _)| day),
        }
    }
}

impl fmt::Display for MonthlyPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Monthly {} (Wh per day)", self.metric)?;
        writeln!(
            f,
            "{:>5} {:>12} {:>12} {:>12} {:>12} {:>5}",
            "Month", "Total", "Mean", "Max", "Min", "Days"
        )?;
        for m in &self.months {
            writeln!(
                f,
                "{:>5} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>5}",
                m.month, m.total_wh, m.mean_wh, m.max_wh, m.min_wh, m.days
            )?;
        }
        if let (Some(best), Some(worst)) = (self.best_day_of_year, self.worst_day_of_year) {
            writeln!(f, "Best day of year: {best}, worst day of year: {worst}")?;
        }
        Ok(())
    }
}

/// Whole-run service and battery-wear summary.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualSummary {
    /// Percentage of demanded service hours actually met.
    pub service_percentage: f64,
    /// Hours per representative day with nonzero demand.
    pub demand_hours: usize,
    /// Cumulative battery cycles over the run.
    pub cumulative_cycles: f64,
    /// Rated lifetime cycles of the bank, when a bank was present.
    pub rated_cycles: Option<f64>,
}

impl AnnualSummary {
    /// Scores the run against the representative daily demand profile.
    ///
    /// Hours with no demand do not count for or against service, so a
    /// nighttime-only load profile is not diluted by idle daylight hours.
    pub fn compute(
        records: &[HourlyRecord],
        demand_hours: usize,
        cumulative_cycles: f64,
        rated_cycles: Option<f64>,
    ) -> Self {
        let service_sum: f64 = records
            .iter()
            .filter(|r| r.load.total() > 0.0)
            .map(|r| r.result.service)
            .sum();
        let service_percentage = if demand_hours > 0 {
            service_sum * 100.0 / (demand_hours as f64 * 365.0)
        } else {
            0.0
        };
        Self {
            service_percentage,
            demand_hours,
            cumulative_cycles,
            rated_cycles,
        }
    }
}

impl fmt::Display for AnnualSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Service level: {:.2}% of demand met over {} demand hours per day",
            self.service_percentage, self.demand_hours
        )?;
        match self.rated_cycles {
            Some(rated) => writeln!(
                f,
                "Battery wear: {:.2} cycles used of {:.0} rated",
                self.cumulative_cycles, rated
            ),
            None => writeln!(f, "No battery bank configured"),
        }
    }
}
