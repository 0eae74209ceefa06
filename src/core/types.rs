use std::fmt;

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumIter as EnumIterDerive, EnumString};

use crate::errors::{Error, Result};
use crate::extensions::enums::parse_enum;

/// Scheduling priority. Declaration order is the sort order: a lower index
/// sorts first, so ascending sorts put critical items at the front.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    Display,
    AsRefStr,
    EnumIterDerive,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn try_from(s: &str) -> Result<Self> {
        parse_enum("priority", s)
    }

    /// Ranking weight: critical 4 .. low 1.
    pub fn weight(self) -> i64 {
        match self {
            Priority::Critical => 4,
            Priority::High => 3,
            Priority::Normal => 2,
            Priority::Low => 1,
        }
    }
}

/// Recurrence frequency of a habit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumString,
    Display,
    AsRefStr,
    EnumIterDerive,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

impl Frequency {
    pub fn try_from(s: &str) -> Result<Self> {
        parse_enum("frequency", s)
    }
}

/// Coarse time-of-day preference for a habit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumString,
    Display,
    AsRefStr,
    EnumIterDerive,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TimePreference {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimePreference {
    pub fn try_from(s: &str) -> Result<Self> {
        parse_enum("time preference", s)
    }

    /// Local-hour range covered by the preference, end exclusive.
    pub fn hour_range(self) -> (u32, u32) {
        match self {
            TimePreference::Morning => (6, 12),
            TimePreference::Afternoon => (12, 17),
            TimePreference::Evening => (17, 21),
            TimePreference::Night => (21, 24),
        }
    }

    /// Representative start hour used when placing within a slot.
    pub fn anchor_hour(self) -> u32 {
        match self {
            TimePreference::Morning => 9,
            TimePreference::Afternoon => 14,
            TimePreference::Evening => 18,
            TimePreference::Night => 22,
        }
    }

    /// Center of the range in minutes from midnight, for distance scoring.
    pub fn center_minutes(self) -> i64 {
        let (start, end) = self.hour_range();
        ((start + end) as i64) * 60 / 2
    }
}

/// Which weekly availability map an item schedules against. A closed set;
/// the engine matches exhaustively rather than switching on open strings.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    AsRefStr,
    EnumIterDerive,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HourCategory {
    #[default]
    #[serde(alias = "personal_hours")]
    Personal,
    #[serde(alias = "work_hours")]
    Work,
    #[serde(alias = "meeting_hours")]
    Meeting,
}

impl HourCategory {
    pub fn try_from(s: &str) -> Result<Self> {
        parse_enum("hour category", s)
    }
}

/// Color hint attached to generated calendar events.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumString,
    Display,
    AsRefStr,
    EnumIterDerive,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EventColor {
    Blue,
    Cyan,
    Green,
    Gray,
}

impl EventColor {
    pub fn for_category(category: HourCategory) -> Self {
        match category {
            HourCategory::Work => EventColor::Blue,
            HourCategory::Meeting => EventColor::Cyan,
            HourCategory::Personal => EventColor::Green,
        }
    }
}

/// Wall-clock `HH:MM` value as it appears in availability settings and habit
/// ideal times. Parsed strictly; the zero-padded 24-hour string form is the
/// canonical serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockTime(pub NaiveTime);

impl BlockTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(BlockTime)
            .ok_or_else(|| {
                Error::validation(format!("Invalid wall-clock time {hour:02}:{minute:02}"))
            })
    }

    pub fn try_from_str(s: &str) -> Result<Self> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(BlockTime)
            .map_err(|_| {
                Error::validation(format!(
                    "Invalid time '{}'. Expected 24-hour 'HH:MM', e.g. '07:00'.",
                    s.trim()
                ))
            })
    }

    pub fn hour(self) -> u32 {
        self.0.hour()
    }

    pub fn minute(self) -> u32 {
        self.0.minute()
    }

    /// Minutes from local midnight.
    pub fn minutes(self) -> i64 {
        (self.0.hour() * 60 + self.0.minute()) as i64
    }
}

impl fmt::Display for BlockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for BlockTime {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<<S as Serializer>::Ok, <S as Serializer>::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockTime {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<BlockTime, <D as Deserializer<'de>>::Error> {
        let s = String::deserialize(deserializer)?;
        BlockTime::try_from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::validation(format!(
                "Interval start {start} must be earlier than end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%Y-%m-%d %H:%MZ"),
            self.end.format("%Y-%m-%d %H:%MZ")
        )
    }
}
