use crate::core::availability::{AvailabilitySet, BreakSettings};
use crate::core::models::{CalendarEvent, Habit, NewEvent, Task};
use crate::core::types::Interval;
use crate::errors::Result;

/// The calendar storage collaborator the live shell talks to.
///
/// Every method is an independent unit of work: mutation failures surface as
/// [`crate::errors::Error::Storage`] and the shell skips the affected item
/// rather than aborting the run. Timeout and retry policy belong to the
/// implementation, not to this crate.
///
/// Two concurrent full reschedules against the same workspace are not
/// coordinated here; callers must serialize them or the interleaved deletes
/// and inserts will race.
pub trait CalendarStore {
    /// Availability maps for the three hour categories, defaulted when the
    /// workspace has never configured them.
    fn fetch_availability(&self) -> Result<AvailabilitySet>;

    fn fetch_break_settings(&self) -> Result<BreakSettings>;

    /// IANA timezone of the workspace, e.g. "Asia/Bangkok".
    fn fetch_timezone(&self) -> Result<String>;

    /// Habit records, active or not; the engine filters.
    fn fetch_habits(&self) -> Result<Vec<Habit>>;

    fn fetch_tasks(&self) -> Result<Vec<Task>>;

    /// Events overlapping `window`, with lock state and source links
    /// populated.
    fn fetch_events(&self, window: &Interval) -> Result<Vec<CalendarEvent>>;

    /// Persist one generated event together with its source link record.
    /// Returns the storage-assigned event id.
    fn insert_event(&mut self, event: &NewEvent) -> Result<String>;

    fn delete_event(&mut self, event_id: &str) -> Result<()>;
}
