mod occurrence_tests;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::core::availability::{AvailabilitySet, DayHours, TimeBlock};
use crate::core::models::{CalendarEvent, Habit, Task};
use crate::core::types::{BlockTime, Frequency, HourCategory};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid instant")
}

/// Monday morning, well clear of DST transitions. Most orchestrator tests
/// run in UTC so asserted times read directly.
pub(super) fn monday_morning() -> DateTime<Utc> {
    instant(2025, 12, 8, 8, 0)
}

pub(super) fn make_habit(id: &str, name: &str) -> Habit {
    Habit {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        frequency: Frequency::Daily,
        recurrence_interval: 1,
        start_date: date(2025, 1, 1),
        end_date: None,
        duration_minutes: 30,
        min_duration_minutes: None,
        max_duration_minutes: None,
        ideal_time: None,
        time_preference: None,
        calendar_hours: HourCategory::Personal,
        priority: None,
        color: None,
        auto_schedule: true,
        is_active: true,
        custom_dates: Vec::new(),
    }
}

pub(super) fn make_task(id: &str, name: &str, hours: f64) -> Task {
    Task {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        total_duration: hours,
        scheduled_minutes: 0,
        is_splittable: true,
        min_split_duration_minutes: None,
        max_split_duration_minutes: None,
        calendar_hours: HourCategory::Personal,
        priority: None,
        start_date: None,
        end_date: None,
        created_at: None,
    }
}

pub(super) fn make_event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        title: format!("event {id}"),
        start_at: start,
        end_at: end,
        locked: false,
        source: None,
    }
}

/// Availability with a single daily block, every day, for every category.
pub(super) fn open_hours(start: &str, end: &str) -> AvailabilitySet {
    let day = DayHours {
        enabled: true,
        time_blocks: vec![TimeBlock {
            start_time: BlockTime::try_from_str(start).unwrap(),
            end_time: BlockTime::try_from_str(end).unwrap(),
        }],
    };
    let mut set = AvailabilitySet::default();
    for idx in 0..7u8 {
        *set.personal_hours.day_mut(idx) = day.clone();
        *set.work_hours.day_mut(idx) = day.clone();
        *set.meeting_hours.day_mut(idx) = day.clone();
    }
    set
}
