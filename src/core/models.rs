use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::core::types::{
    BlockTime, EventColor, Frequency, HourCategory, Interval, Priority, TimePreference,
};
use crate::errors::{Error, Result};
use crate::zoned;

fn default_true() -> bool {
    true
}

fn default_interval() -> u32 {
    1
}

/// A recurring, non-deadline activity. Owned and edited outside the engine;
/// the engine only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub frequency: Frequency,
    /// "Every N units" of the frequency; must be at least 1.
    #[serde(default = "default_interval")]
    pub recurrence_interval: u32,
    /// First local date an occurrence may fall on (inclusive).
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub min_duration_minutes: Option<i64>,
    #[serde(default)]
    pub max_duration_minutes: Option<i64>,
    /// Exact preferred wall-clock start, e.g. "18:30".
    #[serde(default)]
    pub ideal_time: Option<BlockTime>,
    #[serde(default)]
    pub time_preference: Option<TimePreference>,
    #[serde(default)]
    pub calendar_hours: HourCategory,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub color: Option<EventColor>,
    #[serde(default = "default_true")]
    pub auto_schedule: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Explicit occurrence dates for `Frequency::Custom`.
    #[serde(default)]
    pub custom_dates: Vec<NaiveDate>,
}

impl Habit {
    pub fn validate(&self) -> Result<()> {
        if self.duration_minutes <= 0 {
            return Err(Error::validation(format!(
                "Habit '{}' has non-positive duration {} minutes",
                self.name, self.duration_minutes
            )));
        }
        if self.recurrence_interval == 0 {
            return Err(Error::validation(format!(
                "Habit '{}' has a zero recurrence interval",
                self.name
            )));
        }
        for bound in [self.min_duration_minutes, self.max_duration_minutes]
            .into_iter()
            .flatten()
        {
            if bound <= 0 {
                return Err(Error::validation(format!(
                    "Habit '{}' has a non-positive duration bound {bound}",
                    self.name
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_duration_minutes, self.max_duration_minutes) {
            if min > max {
                return Err(Error::validation(format!(
                    "Habit '{}' has min duration {min} above max duration {max}",
                    self.name
                )));
            }
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(Error::validation(format!(
                    "Habit '{}' ends before it starts",
                    self.name
                )));
            }
        }
        Ok(())
    }

    pub fn has_time_preference(&self) -> bool {
        self.ideal_time.is_some() || self.time_preference.is_some()
    }
}

/// A deadline-aware work item, optionally splittable across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Total effort in hours.
    pub total_duration: f64,
    /// Minutes already committed by past or in-progress events. Recomputed
    /// each full reschedule from the surviving events.
    #[serde(default)]
    pub scheduled_minutes: i64,
    #[serde(default = "default_true")]
    pub is_splittable: bool,
    #[serde(default)]
    pub min_split_duration_minutes: Option<i64>,
    #[serde(default)]
    pub max_split_duration_minutes: Option<i64>,
    #[serde(default)]
    pub calendar_hours: HourCategory,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Earliest instant any of this task's work may be placed.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Deadline. The engine prefers finishing before it and only schedules
    /// past it as a last resort.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

pub const DEFAULT_MIN_SPLIT_MINUTES: i64 = 30;
pub const DEFAULT_MAX_SPLIT_MINUTES: i64 = 120;

impl Task {
    pub fn total_minutes(&self) -> i64 {
        (self.total_duration * 60.0).round() as i64
    }

    pub fn remaining_minutes(&self) -> i64 {
        (self.total_minutes() - self.scheduled_minutes).max(0)
    }

    /// Chunk bounds for placement. A non-splittable task is a single chunk of
    /// its full remaining duration.
    pub fn chunk_bounds(&self) -> (i64, i64) {
        if !self.is_splittable {
            let remaining = self.remaining_minutes().max(1);
            return (remaining, remaining);
        }
        (
            self.min_split_duration_minutes
                .unwrap_or(DEFAULT_MIN_SPLIT_MINUTES),
            self.max_split_duration_minutes
                .unwrap_or(DEFAULT_MAX_SPLIT_MINUTES),
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_duration < 0.0 {
            return Err(Error::validation(format!(
                "Task '{}' has negative total duration",
                self.name
            )));
        }
        if self.scheduled_minutes < 0 {
            return Err(Error::validation(format!(
                "Task '{}' has negative scheduled minutes",
                self.name
            )));
        }
        if self.scheduled_minutes > self.total_minutes() {
            return Err(Error::validation(format!(
                "Task '{}' has more scheduled minutes ({}) than its total ({})",
                self.name,
                self.scheduled_minutes,
                self.total_minutes()
            )));
        }
        for bound in [
            self.min_split_duration_minutes,
            self.max_split_duration_minutes,
        ]
        .into_iter()
        .flatten()
        {
            if bound <= 0 {
                return Err(Error::validation(format!(
                    "Task '{}' has a non-positive split duration {bound}",
                    self.name
                )));
            }
        }
        if let (Some(min), Some(max)) = (
            self.min_split_duration_minutes,
            self.max_split_duration_minutes,
        ) {
            if min > max {
                return Err(Error::validation(format!(
                    "Task '{}' has min split {min} above max split {max}",
                    self.name
                )));
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(Error::validation(format!(
                    "Task '{}' has its deadline before its start date",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Link from a calendar event back to the habit occurrence or task chunk
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventSource {
    Habit {
        habit_id: String,
        /// Local calendar date of the occurrence in the workspace timezone.
        occurrence_date: NaiveDate,
    },
    Task {
        task_id: String,
        scheduled_minutes: i64,
    },
    /// Engine-inserted rest period. Carries no owner, but the marker lets a
    /// re-run recognize and replace stale break events.
    Break,
}

/// An event already on the calendar, with the metadata the engine needs to
/// decide whether it blocks, survives, or gets replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Manually positioned by the user; never moved or deleted by the engine.
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub source: Option<EventSource>,
}

impl CalendarEvent {
    pub fn interval(&self) -> Result<Interval> {
        Interval::new(self.start_at, self.end_at)
    }

    pub fn is_ongoing(&self, now: DateTime<Utc>) -> bool {
        self.start_at <= now && now < self.end_at
    }

    /// An event is all-day iff its span is an exact positive multiple of 24
    /// hours and both endpoints sit on local midnight in `tz`. All-day events
    /// never block scheduling; the adapters filter them out.
    pub fn is_all_day(&self, tz: Tz) -> bool {
        let span = self.end_at - self.start_at;
        if span <= Duration::zero() || span.num_seconds() % 86_400 != 0 {
            return false;
        }
        is_local_midnight(self.start_at, tz) && is_local_midnight(self.end_at, tz)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_at >= self.end_at {
            return Err(Error::validation(format!(
                "Event '{}' has start {} at or after end {}",
                self.title, self.start_at, self.end_at
            )));
        }
        Ok(())
    }
}

fn is_local_midnight(instant: DateTime<Utc>, tz: Tz) -> bool {
    let parts = zoned::to_zoned_parts(instant, tz);
    parts.hour == 0 && parts.minute == 0
}

/// An event the engine wants created. IDs are assigned by storage (live
/// mode) or synthesized (preview mode); `source` doubles as the link record
/// written alongside the insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub color: EventColor,
    #[serde(default)]
    pub source: Option<EventSource>,
}

impl NewEvent {
    pub fn minutes(&self) -> i64 {
        (self.end_at - self.start_at).num_minutes()
    }
}
