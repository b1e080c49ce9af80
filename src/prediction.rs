use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::error::{Error, Result};
use crate::models::{
    CyclePhase, CycleRecord, CycleStats, DayLog, Insights, PhaseSegment, UpcomingEvents,
    UserSettings,
};

/// Fixed day boundaries of the nominal 28-day model used by `phase_for_date`.
const FOLLICULAR_END_DAY: i64 = 13;
const OVULATION_END_DAY: i64 = 17;

/// Luteal phase length assumed when projecting ovulation.
const LUTEAL_DAYS: i64 = 14;
const FERTILE_DAYS_BEFORE: i64 = 5;
const FERTILE_DAYS_AFTER: i64 = 1;

/// History must hold at least this many records before it overrides settings.
const MIN_HISTORY_RECORDS: usize = 3;

/// Phase of the cycle that `date` falls in, projected from the settings anchor.
///
/// Dates before `last_period_date` wrap backwards through earlier cycles.
/// Boundaries after menstruation are the fixed day 13 / day 17 of the
/// nominal model and do not scale with `average_cycle_length`.
pub fn phase_for_date(date: NaiveDate, settings: &UserSettings) -> Result<CyclePhase> {
    let cycle_length = checked_cycle_length(settings)?;
    let day = days_between(settings.last_period_date, date).rem_euclid(cycle_length);

    let phase = if day < i64::from(settings.average_period_length) {
        CyclePhase::Menstruation
    } else if day < FOLLICULAR_END_DAY {
        CyclePhase::Follicular
    } else if day < OVULATION_END_DAY {
        CyclePhase::Ovulation
    } else {
        CyclePhase::Luteal
    };
    Ok(phase)
}

/// Snapshot of the cycle as of `today`.
///
/// With three or more recorded cycles, the closed ones (non-zero `length`)
/// replace the settings' period length by their rounded mean length. The
/// cycle length always comes from settings.
pub fn compute_stats(
    settings: &UserSettings,
    cycles: &[CycleRecord],
    today: NaiveDate,
) -> Result<CycleStats> {
    let avg_cycle_length = checked_cycle_length(settings)?;
    let day = days_between(settings.last_period_date, today).max(0);

    let mut avg_period_length = i64::from(settings.average_period_length);
    if cycles.len() >= MIN_HISTORY_RECORDS {
        if let Some(avg) = mean_closed_length(cycles) {
            tracing::debug!(avg, "period length taken from cycle history");
            avg_period_length = avg;
        }
    }

    let anchor = settings.last_period_date;
    let ovulation_day = avg_cycle_length - LUTEAL_DAYS;
    let ovulation_date = shift(anchor, ovulation_day)?;

    let current_phase = if day < avg_period_length {
        CyclePhase::Menstruation
    } else if day < ovulation_day - 1 {
        CyclePhase::Follicular
    } else if day < ovulation_day + 3 {
        CyclePhase::Ovulation
    } else {
        CyclePhase::Luteal
    };

    Ok(CycleStats {
        average_cycle_length: avg_cycle_length,
        average_period_length: avg_period_length,
        next_period_date: shift(anchor, avg_cycle_length)?,
        ovulation_date,
        fertile_window_start: shift(ovulation_date, -FERTILE_DAYS_BEFORE)?,
        fertile_window_end: shift(ovulation_date, FERTILE_DAYS_AFTER)?,
        current_phase,
        day_in_cycle: day + 1,
    })
}

/// Countdown to the projected period and ovulation, seen from `today`.
pub fn upcoming_events(stats: &CycleStats, today: NaiveDate) -> UpcomingEvents {
    UpcomingEvents {
        next_period_date: stats.next_period_date,
        days_until_period: days_between(today, stats.next_period_date),
        ovulation_date: stats.ovulation_date,
        days_until_ovulation: days_between(today, stats.ovulation_date),
        in_fertile_window: today >= stats.fertile_window_start
            && today <= stats.fertile_window_end,
    }
}

/// Split of the cycle ring into phases, using the same ovulation-relative
/// boundaries as `compute_stats`.
pub fn phase_segments(stats: &CycleStats) -> Vec<PhaseSegment> {
    let cycle = stats.average_cycle_length.max(1) as f64;
    let period = stats.average_period_length as f64 / cycle;
    let ovulation_day = (stats.average_cycle_length - LUTEAL_DAYS) as f64;
    let ovulation_start = (ovulation_day - 1.0) / cycle;
    let ovulation_end = (ovulation_day + 3.0) / cycle;

    vec![
        PhaseSegment {
            phase: CyclePhase::Menstruation,
            start: 0.0,
            end: period,
        },
        PhaseSegment {
            phase: CyclePhase::Follicular,
            start: period,
            end: ovulation_start,
        },
        PhaseSegment {
            phase: CyclePhase::Ovulation,
            start: ovulation_start,
            end: ovulation_end,
        },
        PhaseSegment {
            phase: CyclePhase::Luteal,
            start: ovulation_end,
            end: 1.0,
        },
    ]
}

/// Aggregate patterns across the whole history for the insights view.
pub fn insights(
    stats: &CycleStats,
    cycles: &[CycleRecord],
    day_logs: &BTreeMap<NaiveDate, DayLog>,
) -> Insights {
    let avg_cycle_length = mean_closed_length(cycles).unwrap_or(stats.average_cycle_length);

    Insights {
        avg_cycle_length,
        total_cycles: cycles.len(),
        total_logs: day_logs.len(),
        top_mood: most_frequent(day_logs.values().flat_map(|l| l.moods.iter().copied())),
        top_symptom: most_frequent(day_logs.values().flat_map(|l| l.symptoms.iter().copied())),
        days_until_next_period: (stats.average_cycle_length - stats.day_in_cycle).max(0),
    }
}

fn checked_cycle_length(settings: &UserSettings) -> Result<i64> {
    if settings.average_cycle_length == 0 {
        return Err(Error::InvalidArgument(
            "average cycle length must be at least 1 day".into(),
        ));
    }
    Ok(i64::from(settings.average_cycle_length))
}

/// `date` moved by `days`, or an error past the representable calendar range.
fn shift(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    date.checked_add_signed(Duration::days(days)).ok_or_else(|| {
        Error::InvalidDate(format!("{date} shifted by {days} days is out of range"))
    })
}

fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Rounded mean of the recorded lengths, ignoring open and zero-length records.
fn mean_closed_length(cycles: &[CycleRecord]) -> Option<i64> {
    let lengths: Vec<i64> = cycles
        .iter()
        .filter_map(|c| c.length)
        .filter(|&l| l != 0)
        .collect();
    if lengths.is_empty() {
        return None;
    }
    let mean = lengths.iter().sum::<i64>() as f64 / lengths.len() as f64;
    // Halves round up, towards positive infinity.
    Some((mean + 0.5).floor() as i64)
}

/// Most frequent item; ties go to whichever was seen first.
fn most_frequent<T: Copy + PartialEq>(items: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (item, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((item, n));
        }
    }
    best.map(|(item, _)| item)
}
