use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::core::types::{BlockTime, HourCategory, Interval};
use crate::errors::{Error, Result};
use crate::extensions::chrono::WeekdayExt;
use crate::zoned::{self, WallClock};

/// One wall-clock block of availability within a day. `start < end`; blocks
/// never cross midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub start_time: BlockTime,
    pub end_time: BlockTime,
}

impl TimeBlock {
    pub fn new(start_time: BlockTime, end_time: BlockTime) -> Result<Self> {
        if start_time >= end_time {
            return Err(Error::validation(format!(
                "Time block start {start_time} must be earlier than end {end_time}"
            )));
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }
}

/// A single weekday's availability: an enabled flag plus ordered,
/// non-overlapping time blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayHours {
    pub enabled: bool,
    pub time_blocks: Vec<TimeBlock>,
}

static DEFAULT_DAY: Lazy<DayHours> = Lazy::new(|| DayHours {
    enabled: true,
    time_blocks: vec![TimeBlock {
        start_time: BlockTime::try_from_str("07:00").expect("default start"),
        end_time: BlockTime::try_from_str("23:00").expect("default end"),
    }],
});

impl Default for DayHours {
    /// Unconfigured days are open 07:00-23:00.
    fn default() -> Self {
        DEFAULT_DAY.clone()
    }
}

impl DayHours {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            time_blocks: Vec::new(),
        }
    }

    fn validate(&self, day_name: &str) -> Result<()> {
        for pair in self.time_blocks.windows(2) {
            if pair[1].start_time < pair[0].start_time {
                return Err(Error::validation(format!(
                    "Time blocks for {day_name} must be sorted by start time"
                )));
            }
            if pair[1].start_time < pair[0].end_time {
                return Err(Error::validation(format!(
                    "Time blocks for {day_name} overlap: {}-{} and {}-{}",
                    pair[0].start_time, pair[0].end_time, pair[1].start_time, pair[1].end_time
                )));
            }
        }
        for block in &self.time_blocks {
            if block.start_time >= block.end_time {
                return Err(Error::validation(format!(
                    "Time block {}-{} for {day_name} is inverted",
                    block.start_time, block.end_time
                )));
            }
        }
        Ok(())
    }
}

/// Seven-day availability map. The serialized shape uses lowercase day names,
/// matching the workspace settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekHours {
    pub sunday: DayHours,
    pub monday: DayHours,
    pub tuesday: DayHours,
    pub wednesday: DayHours,
    pub thursday: DayHours,
    pub friday: DayHours,
    pub saturday: DayHours,
}

const DAY_NAMES: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

impl WeekHours {
    /// Day lookup by Sunday-based weekday index.
    pub fn day(&self, weekday_index: u8) -> &DayHours {
        match weekday_index {
            0 => &self.sunday,
            1 => &self.monday,
            2 => &self.tuesday,
            3 => &self.wednesday,
            4 => &self.thursday,
            5 => &self.friday,
            _ => &self.saturday,
        }
    }

    pub fn day_mut(&mut self, weekday_index: u8) -> &mut DayHours {
        match weekday_index {
            0 => &mut self.sunday,
            1 => &mut self.monday,
            2 => &mut self.tuesday,
            3 => &mut self.wednesday,
            4 => &mut self.thursday,
            5 => &mut self.friday,
            _ => &mut self.saturday,
        }
    }

    fn validate(&self) -> Result<()> {
        for idx in 0..7u8 {
            self.day(idx).validate(DAY_NAMES[idx as usize])?;
        }
        Ok(())
    }
}

/// Per-category weekly availability for a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AvailabilitySet {
    pub personal_hours: WeekHours,
    pub work_hours: WeekHours,
    pub meeting_hours: WeekHours,
}

impl AvailabilitySet {
    pub fn hours_for(&self, category: HourCategory) -> &WeekHours {
        match category {
            HourCategory::Personal => &self.personal_hours,
            HourCategory::Work => &self.work_hours,
            HourCategory::Meeting => &self.meeting_hours,
        }
    }

    /// Fail-fast structural validation, run once before any placement.
    pub fn validate(&self) -> Result<()> {
        self.personal_hours.validate()?;
        self.work_hours.validate()?;
        self.meeting_hours.validate()
    }

    /// UTC windows for `date` in `category`, in block order. A disabled day
    /// yields no windows.
    pub fn day_windows(&self, date: NaiveDate, category: HourCategory, tz: Tz) -> Result<Vec<Interval>> {
        let weekday = date_weekday_index(date);
        let day = self.hours_for(category).day(weekday);
        if !day.enabled {
            return Ok(Vec::new());
        }

        let mut windows = Vec::with_capacity(day.time_blocks.len());
        for block in &day.time_blocks {
            let start = zoned::to_utc_instant(
                WallClock::on_date(date, block.start_time.hour(), block.start_time.minute()),
                tz,
            )?;
            let end = zoned::to_utc_instant(
                WallClock::on_date(date, block.end_time.hour(), block.end_time.minute()),
                tz,
            )?;
            if start < end {
                windows.push(Interval { start, end });
            }
        }
        Ok(windows)
    }
}

fn date_weekday_index(date: NaiveDate) -> u8 {
    date.weekday().sunday_index()
}

/// Workspace-level break insertion settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BreakSettings {
    pub break_enabled: bool,
    pub break_duration_minutes: i64,
    pub break_interval_minutes: i64,
}

impl Default for BreakSettings {
    fn default() -> Self {
        Self {
            break_enabled: false,
            break_duration_minutes: 15,
            break_interval_minutes: 90,
        }
    }
}
