//! Non-leap-year hour calendar: month, day-of-month, and day-of-year stamps.
//!
//! The simulation always runs over a fixed 365-day year, so calendar math is
//! a pure function of the hour index and needs no timezone handling.

/// Hours in the simulated non-leap year.
pub const HOURS_PER_YEAR: usize = 8760;

/// Days in the simulated non-leap year.
pub const DAYS_PER_YEAR: usize = 365;

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Calendar position of one simulated hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourStamp {
    /// Calendar month, 1-12.
    pub month: u32,
    /// Day within the month, 1-31.
    pub day_of_month: u32,
    /// Day within the year, 1-365.
    pub day_of_year: u32,
    /// Hour within the day, 0-23.
    pub hour_of_day: u32,
}

/// Computes the calendar stamp for an hour index (0-based from Jan 1, 00:00).
///
/// Hour indices past the end of the year wrap around, so partial or
/// multi-year series still stamp consistently.
pub fn hour_stamp(hour: usize) -> HourStamp {
    let hour = hour % HOURS_PER_YEAR;
    let day_of_year = (hour / 24) as u32 + 1;
    let hour_of_day = (hour % 24) as u32;

    let mut remaining = day_of_year;
    let mut month = 1;
    for (i, days) in DAYS_IN_MONTH.iter().enumerate() {
        if remaining <= *days {
            month = i as u32 + 1;
            break;
        }
        remaining -= days;
    }

    HourStamp {
        month,
        day_of_month: remaining,
        day_of_year,
        hour_of_day,
    }
}

/// Stamps for every hour of the simulated year.
pub fn year_stamps() -> Vec<HourStamp> {
    (0..HOURS_PER_YEAR).map(hour_stamp).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_hour_is_new_year() {
        let s = hour_stamp(0);
        assert_eq!(s.month, 1);
        assert_eq!(s.day_of_month, 1);
        assert_eq!(s.day_of_year, 1);
        assert_eq!(s.hour_of_day, 0);
    }

    #[test]
    fn last_hour_of_first_day() {
        let s = hour_stamp(23);
        assert_eq!(s.day_of_year, 1);
        assert_eq!(s.hour_of_day, 23);
    }

    #[test]
    fn first_hour_of_second_day() {
        let s = hour_stamp(24);
        assert_eq!(s.day_of_year, 2);
        assert_eq!(s.day_of_month, 2);
        assert_eq!(s.hour_of_day, 0);
    }

    #[test]
    fn february_first() {
        // Jan has 31 days, so hour 31*24 lands on Feb 1.
        let s = hour_stamp(31 * 24);
        assert_eq!(s.month, 2);
        assert_eq!(s.day_of_month, 1);
        assert_eq!(s.day_of_year, 32);
    }

    #[test]
    fn last_hour_of_year() {
        let s = hour_stamp(HOURS_PER_YEAR - 1);
        assert_eq!(s.month, 12);
        assert_eq!(s.day_of_month, 31);
        assert_eq!(s.day_of_year, 365);
        assert_eq!(s.hour_of_day, 23);
    }

    #[test]
    fn year_stamps_cover_every_day() {
        let stamps = year_stamps();
        assert_eq!(stamps.len(), HOURS_PER_YEAR);
        assert_eq!(stamps.last().map(|s| s.day_of_year), Some(365));
        let month_hours = stamps.iter().filter(|s| s.month == 2).count();
        assert_eq!(month_hours, 28 * 24);
    }

    #[test]
    fn stamps_wrap_past_year_end() {
        assert_eq!(hour_stamp(HOURS_PER_YEAR), hour_stamp(0));
    }
}
