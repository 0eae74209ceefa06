#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use planwise::adapter::CalendarStore;
use planwise::core::availability::{AvailabilitySet, BreakSettings, DayHours, TimeBlock};
use planwise::core::models::{CalendarEvent, Habit, NewEvent, Task};
use planwise::core::types::{BlockTime, Frequency, HourCategory, Interval};
use planwise::errors::{Error, Result};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid instant")
}

/// Monday 2025-12-08, 08:00 UTC.
pub fn monday_morning() -> DateTime<Utc> {
    instant(2025, 12, 8, 8, 0)
}

pub fn make_habit(id: &str, name: &str) -> Habit {
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

pub fn make_task(id: &str, name: &str, hours: f64) -> Task {
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

pub fn open_hours(start: &str, end: &str) -> AvailabilitySet {
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

/// In-memory calendar storage backing the live-shell tests.
pub struct MemoryStore {
    pub availability: AvailabilitySet,
    pub breaks: BreakSettings,
    pub timezone: String,
    pub habits: Vec<Habit>,
    pub tasks: Vec<Task>,
    pub events: Vec<CalendarEvent>,
    next_id: u32,
    /// When set, insertions whose title contains this string fail with a
    /// storage error, for partial-failure tests.
    pub poison_title: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            availability: open_hours("07:00", "23:00"),
            breaks: BreakSettings::default(),
            timezone: "UTC".to_string(),
            habits: Vec::new(),
            tasks: Vec::new(),
            events: Vec::new(),
            next_id: 0,
            poison_title: None,
        }
    }

    /// (title, start, end) triples of stored events, sorted, for comparing
    /// final calendar states across runs.
    pub fn snapshot(&self) -> Vec<(String, DateTime<Utc>, DateTime<Utc>)> {
        let mut rows: Vec<_> = self
            .events
            .iter()
            .map(|e| (e.title.clone(), e.start_at, e.end_at))
            .collect();
        rows.sort();
        rows
    }
}

impl CalendarStore for MemoryStore {
    fn fetch_availability(&self) -> Result<AvailabilitySet> {
        Ok(self.availability.clone())
    }

    fn fetch_break_settings(&self) -> Result<BreakSettings> {
        Ok(self.breaks)
    }

    fn fetch_timezone(&self) -> Result<String> {
        Ok(self.timezone.clone())
    }

    fn fetch_habits(&self) -> Result<Vec<Habit>> {
        Ok(self.habits.clone())
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.clone())
    }

    fn fetch_events(&self, window: &Interval) -> Result<Vec<CalendarEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.start_at < window.end && e.end_at > window.start)
            .cloned()
            .collect())
    }

    fn insert_event(&mut self, event: &NewEvent) -> Result<String> {
        if let Some(poison) = &self.poison_title {
            if event.title.contains(poison.as_str()) {
                return Err(Error::storage(format!(
                    "insert rejected for \"{}\"",
                    event.title
                )));
            }
        }
        self.next_id += 1;
        let id = format!("evt-{}", self.next_id);
        self.events.push(CalendarEvent {
            id: id.clone(),
            title: event.title.clone(),
            start_at: event.start_at,
            end_at: event.end_at,
            locked: false,
            source: event.source.clone(),
        });
        Ok(id)
    }

    fn delete_event(&mut self, event_id: &str) -> Result<()> {
        let before = self.events.len();
        self.events.retain(|e| e.id != event_id);
        if self.events.len() == before {
            return Err(Error::storage(format!("no such event {event_id}")));
        }
        Ok(())
    }
}
