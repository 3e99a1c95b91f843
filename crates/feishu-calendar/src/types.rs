//! Free/busy types and API response shapes.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use feishu_core::SchedulingConfig;

use crate::error::CalendarError;

const DEFAULT_OFFSET_SECS: i32 = 8 * 3600;
const DEFAULT_START_HOUR: u32 = 9;
const DEFAULT_END_HOUR: u32 = 18;
const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Busy range in minutes since midnight of the query date, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BusyInterval {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl BusyInterval {
    pub fn new(start_minute: u32, end_minute: u32) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    pub fn len(&self) -> u32 {
        self.end_minute.saturating_sub(self.start_minute)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A free range inside the query window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    /// "HH:MM"
    pub start: String,
    /// "HH:MM"
    pub end: String,
    pub duration_minutes: u32,
}

impl FreeSlot {
    pub fn from_minutes(start_minute: u32, end_minute: u32) -> Self {
        Self {
            start: format_minutes(start_minute),
            end: format_minutes(end_minute),
            duration_minutes: end_minute.saturating_sub(start_minute),
        }
    }
}

fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Parameters for a common free time search.
#[derive(Debug, Clone)]
pub struct FreeSlotQuery {
    pub user_ids: Vec<String>,
    pub date: NaiveDate,
    /// Window start hour, 0-23
    pub start_hour: u32,
    /// Window end hour, 0-23, after `start_hour`
    pub end_hour: u32,
    pub min_duration_minutes: u32,
    /// Offset the window and busy times are read in
    pub offset: FixedOffset,
}

impl FreeSlotQuery {
    /// Query with the default 09:00-18:00 window, 30 minute slots, UTC+8.
    pub fn new(user_ids: Vec<String>, date: NaiveDate) -> Self {
        Self {
            user_ids,
            date,
            start_hour: DEFAULT_START_HOUR,
            end_hour: DEFAULT_END_HOUR,
            min_duration_minutes: DEFAULT_DURATION_MINUTES,
            offset: FixedOffset::east_opt(DEFAULT_OFFSET_SECS).unwrap_or_else(|| Utc.fix()),
        }
    }

    /// Query using the configured window, duration and offset.
    pub fn from_config(
        config: &SchedulingConfig,
        user_ids: Vec<String>,
        date: NaiveDate,
    ) -> Result<Self, CalendarError> {
        let offset = config
            .offset()
            .map_err(|e| CalendarError::InvalidQuery(e.to_string()))?;

        let query = Self {
            user_ids,
            date,
            start_hour: config.default_start_hour,
            end_hour: config.default_end_hour,
            min_duration_minutes: config.default_duration_minutes,
            offset,
        };
        query.validate()?;
        Ok(query)
    }

    pub fn with_window(mut self, start_hour: u32, end_hour: u32) -> Self {
        self.start_hour = start_hour;
        self.end_hour = end_hour;
        self
    }

    pub fn with_min_duration(mut self, minutes: u32) -> Self {
        self.min_duration_minutes = minutes;
        self
    }

    pub fn validate(&self) -> Result<(), CalendarError> {
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(CalendarError::InvalidQuery(format!(
                "hours must be between 0 and 23, got {}-{}",
                self.start_hour, self.end_hour
            )));
        }
        if self.start_hour >= self.end_hour {
            return Err(CalendarError::InvalidQuery(format!(
                "start hour {} must be before end hour {}",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }

    /// Window bounds in minutes since midnight.
    pub fn window_minutes(&self) -> (u32, u32) {
        (self.start_hour * 60, self.end_hour * 60)
    }

    pub fn midnight(&self) -> Result<DateTime<FixedOffset>, CalendarError> {
        self.at_hour(0)
    }

    pub fn time_min(&self) -> Result<DateTime<FixedOffset>, CalendarError> {
        self.at_hour(self.start_hour)
    }

    pub fn time_max(&self) -> Result<DateTime<FixedOffset>, CalendarError> {
        self.at_hour(self.end_hour)
    }

    fn at_hour(&self, hour: u32) -> Result<DateTime<FixedOffset>, CalendarError> {
        self.date
            .and_hms_opt(hour, 0, 0)
            .and_then(|naive| naive.and_local_timezone(self.offset).single())
            .ok_or_else(|| CalendarError::InvalidQuery(format!("hour {} is out of range", hour)))
    }
}

// API Response Types

/// One busy range as returned by `/calendar/v4/freebusy/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusyPeriod {
    pub start_time: String,
    pub end_time: String,
}

/// Standard `{code, msg, data}` reply wrapper.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FreeBusyData {
    #[serde(default)]
    pub freebusy_list: Vec<BusyPeriod>,
}
