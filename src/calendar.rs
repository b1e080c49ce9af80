//! Month grid for the calendar view.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{Error, Result};
use crate::models::{CalendarDay, DayLog, MonthData, UserSettings};
use crate::prediction::phase_for_date;

/// Build the grid for `year`/`month`, padded out to whole Sunday-first weeks.
pub fn month_view(
    year: i32,
    month: u32,
    settings: &UserSettings,
    day_logs: &BTreeMap<NaiveDate, DayLog>,
    today: NaiveDate,
) -> Result<MonthData> {
    let (first_day, last_day) = month_bounds(year, month)?;
    let lead = i64::from(first_day.weekday().num_days_from_sunday());
    let trail = 6 - i64::from(last_day.weekday().num_days_from_sunday());
    let out_of_range = || Error::InvalidDate(format!("{year}-{month:02} grid is out of range"));
    let grid_start = first_day
        .checked_sub_signed(Duration::days(lead))
        .ok_or_else(out_of_range)?;
    let grid_end = last_day
        .checked_add_signed(Duration::days(trail))
        .ok_or_else(out_of_range)?;

    let mut days = Vec::new();
    for date in grid_start.iter_days().take_while(|d| *d <= grid_end) {
        days.push(CalendarDay {
            date,
            in_month: date.month() == month && date.year() == year,
            is_today: date == today,
            phase: phase_for_date(date, settings)?,
            is_period: day_logs.get(&date).is_some_and(|l| l.is_period),
        });
    }

    Ok(MonthData { year, month, days })
}

fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || Error::InvalidDate(format!("{year}-{month:02}"));
    let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((first_day, next_month - Duration::days(1)))
}
