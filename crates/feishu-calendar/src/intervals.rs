//! Busy interval arithmetic: timestamp conversion, merging and gap finding.

use chrono::{DateTime, FixedOffset};

use crate::error::CalendarError;
use crate::types::{BusyInterval, BusyPeriod, FreeSlot};

/// Convert a raw busy period into window-clipped minutes since `midnight`.
///
/// Starts round down and ends round up to whole minutes, so a partially busy
/// minute counts as busy. Returns `Ok(None)` when the period lies outside the
/// window or is empty after clipping.
pub fn to_window_interval(
    period: &BusyPeriod,
    midnight: DateTime<FixedOffset>,
    window: (u32, u32),
) -> Result<Option<BusyInterval>, CalendarError> {
    let start_secs = seconds_since(&period.start_time, midnight)?;
    let end_secs = seconds_since(&period.end_time, midnight)?;

    if end_secs < start_secs {
        return Err(CalendarError::InvalidTimestamp(format!(
            "busy period ends before it starts: {} > {}",
            period.start_time, period.end_time
        )));
    }

    let start = start_secs.div_euclid(60);
    let end = end_secs.div_euclid(60) + i64::from(end_secs.rem_euclid(60) != 0);

    let (window_start, window_end) = (i64::from(window.0), i64::from(window.1));
    let clipped_start = start.max(window_start);
    let clipped_end = end.min(window_end);

    if clipped_start >= clipped_end {
        return Ok(None);
    }

    // Both bounds now sit inside the window, which fits in u32
    Ok(Some(BusyInterval::new(
        u32::try_from(clipped_start).unwrap_or(window.0),
        u32::try_from(clipped_end).unwrap_or(window.1),
    )))
}

/// Seconds from `midnight` to an RFC 3339 timestamp; may be negative or
/// exceed a day for periods on neighbouring dates.
fn seconds_since(timestamp: &str, midnight: DateTime<FixedOffset>) -> Result<i64, CalendarError> {
    let parsed = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| CalendarError::InvalidTimestamp(format!("'{}': {}", timestamp, e)))?;

    Ok((parsed - midnight).num_seconds())
}

/// Union overlapping or touching intervals.
///
/// The result is sorted by start and satisfies
/// `merged[i].end_minute < merged[i + 1].start_minute`.
pub fn merge_intervals(mut intervals: Vec<BusyInterval>) -> Vec<BusyInterval> {
    intervals.sort();

    let mut merged: Vec<BusyInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(current) if interval.start_minute <= current.end_minute => {
                current.end_minute = current.end_minute.max(interval.end_minute);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Gaps between merged busy intervals inside `[window_start, window_end)`
/// that are at least `min_duration` minutes long.
pub fn free_slots(
    merged: &[BusyInterval],
    window_start: u32,
    window_end: u32,
    min_duration: u32,
) -> Vec<FreeSlot> {
    let mut slots = Vec::new();
    let mut cursor = window_start;

    let mut push_gap = |from: u32, to: u32| {
        if to - from >= min_duration {
            slots.push(FreeSlot::from_minutes(from, to));
        }
    };

    for busy in merged {
        if busy.start_minute >= window_end {
            break;
        }
        if cursor < busy.start_minute {
            push_gap(cursor, busy.start_minute);
        }
        cursor = cursor.max(busy.end_minute);
    }

    if cursor < window_end {
        push_gap(cursor, window_end);
    }

    slots
}

/// Total minutes covered by merged intervals.
pub fn busy_minutes(merged: &[BusyInterval]) -> u32 {
    merged.iter().map(BusyInterval::len).sum()
}
