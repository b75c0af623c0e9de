use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};

use crate::models::{
    slot_label, weekday_index, ClinicTimezone, Slot, SlotSource, WorkingHours,
    DEFAULT_GRID_END, DEFAULT_GRID_START, SLOT_MINUTES,
};

/// Time windows that produce slots for `date`, and where they came from.
pub fn windows_for(hours: &[WorkingHours], date: NaiveDate) -> (SlotSource, Vec<(NaiveTime, NaiveTime)>) {
    let weekday = weekday_index(date);
    let mut windows: Vec<(NaiveTime, NaiveTime)> = hours
        .iter()
        .filter(|h| h.active && h.weekday == weekday && h.start_time < h.end_time)
        .map(|h| (h.start_time, h.end_time))
        .collect();

    if windows.is_empty() {
        return (SlotSource::DefaultGrid, vec![default_window()]);
    }

    windows.sort();
    (SlotSource::WorkingHours, windows)
}

pub fn default_window() -> (NaiveTime, NaiveTime) {
    let (sh, sm) = DEFAULT_GRID_START;
    let (eh, em) = DEFAULT_GRID_END;
    (
        NaiveTime::from_hms_opt(sh, sm, 0).unwrap_or(NaiveTime::MIN),
        NaiveTime::from_hms_opt(eh, em, 0).unwrap_or(NaiveTime::MIN),
    )
}

/// Candidate slots for one date. Slots starting before `now` are flagged unavailable.
pub fn compute_slots(
    hours: &[WorkingHours],
    date: NaiveDate,
    now: DateTime<Utc>,
    tz: ClinicTimezone,
) -> Vec<Slot> {
    let (_, windows) = windows_for(hours, date);
    slots_in_windows(&windows, date, now, tz)
}

pub fn slots_in_windows(
    windows: &[(NaiveTime, NaiveTime)],
    date: NaiveDate,
    now: DateTime<Utc>,
    tz: ClinicTimezone,
) -> Vec<Slot> {
    let mut starts: Vec<u32> = Vec::new();

    for (start, end) in windows {
        let end_minute = minute_of_day(*end);
        // Off-grid starts round up to the next grid line.
        let mut minute = minute_of_day(*start).div_ceil(SLOT_MINUTES) * SLOT_MINUTES;
        while minute + SLOT_MINUTES <= end_minute {
            starts.push(minute);
            minute += SLOT_MINUTES;
        }
    }

    starts.sort_unstable();
    starts.dedup();

    starts
        .into_iter()
        .filter_map(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
        .filter_map(|time| {
            let starts_at = tz.at(date, time)?;
            Some(Slot {
                time: slot_label(time),
                starts_at,
                available: starts_at >= now,
            })
        })
        .collect()
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() / 60
}
