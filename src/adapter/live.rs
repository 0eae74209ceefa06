use chrono::{DateTime, Duration, Utc};

use crate::adapter::store::CalendarStore;
use crate::core::types::Interval;
use crate::errors::Result;
use crate::logging::{LogTarget, Logger};
use crate::scheduler::{
    self, ScheduleInput, ScheduleObserver, ScheduleOptions, ScheduleResult, StepRecord,
};
use crate::zoned;

/// What a live run did to storage, alongside the engine result.
#[derive(Debug)]
pub struct LiveRunReport {
    pub result: ScheduleResult,
    /// Storage ids of the events inserted this run, in insertion order.
    pub inserted_event_ids: Vec<String>,
    pub failed_insertions: usize,
    pub failed_deletions: usize,
}

/// Streams placement decisions into the session log file as they happen.
struct LoggerObserver {
    logger: Logger,
}

impl ScheduleObserver for LoggerObserver {
    fn on_step(&mut self, step: StepRecord) {
        self.logger
            .info(format!("[step {}] {}", step.index, step.description), LogTarget::FileOnly);
    }
}

/// The persisting shell: fetches the workspace snapshot from storage, runs
/// the pure engine, then applies the output event by event.
pub struct LiveScheduler {
    logger: Logger,
}

impl LiveScheduler {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// One full reschedule for a workspace. Stale generated events are
    /// deleted before the new ones are inserted, so repeated invocations
    /// converge instead of accumulating duplicates. Individual storage
    /// failures are logged and skipped; only configuration-level problems
    /// (unknown timezone, malformed availability, failed fetches) abort.
    pub fn run(
        &self,
        store: &mut dyn CalendarStore,
        now: DateTime<Utc>,
        window_days: u32,
    ) -> Result<LiveRunReport> {
        let timezone = store.fetch_timezone()?;
        let tz = zoned::resolve_timezone(&timezone)?;
        let availability = store.fetch_availability()?;
        let breaks = store.fetch_break_settings()?;
        let habits = store.fetch_habits()?;
        let tasks = store.fetch_tasks()?;

        // One extra day so events on the tail of the window's last local day
        // are visible; otherwise a re-run would neither dedup against nor
        // replace them.
        let window = Interval::new(now, now + Duration::days(window_days as i64 + 1))?;
        let events = store.fetch_events(&window)?;
        // All-day events never block scheduling.
        let events: Vec<_> = events.into_iter().filter(|e| !e.is_all_day(tz)).collect();

        self.logger.info(
            format!(
                "Scheduling workspace: {} habits, {} tasks, {} existing events",
                habits.len(),
                tasks.len(),
                events.len()
            ),
            LogTarget::FileOnly,
        );

        let input = ScheduleInput {
            habits,
            tasks,
            events,
            availability,
            timezone,
            now,
        };
        let options = ScheduleOptions {
            window_days,
            breaks,
        };

        let mut observer = LoggerObserver {
            logger: self.logger.clone(),
        };
        let result = scheduler::run_with_observer(&input, &options, &mut observer)?;

        let mut failed_deletions = 0;
        for event_id in &result.deleted_event_ids {
            if let Err(err) = store.delete_event(event_id) {
                self.logger.error(
                    format!("Failed to delete stale event {event_id}: {err}"),
                    LogTarget::ConsoleAndFile,
                );
                failed_deletions += 1;
            }
        }

        let mut inserted_event_ids = Vec::with_capacity(result.events.len());
        let mut failed_insertions = 0;
        for event in &result.events {
            match store.insert_event(event) {
                Ok(id) => inserted_event_ids.push(id),
                Err(err) => {
                    self.logger.error(
                        format!("Failed to insert event \"{}\": {err}", event.title),
                        LogTarget::ConsoleAndFile,
                    );
                    failed_insertions += 1;
                }
            }
        }

        self.logger.replay(&result.log);

        Ok(LiveRunReport {
            result,
            inserted_event_ids,
            failed_insertions,
            failed_deletions,
        })
    }
}
