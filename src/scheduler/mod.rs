pub mod breaks;
pub mod occurrence;
pub mod priority;
pub mod slots;
#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::core::availability::{AvailabilitySet, BreakSettings};
use crate::core::models::{CalendarEvent, EventSource, Habit, NewEvent, Task};
use crate::core::types::{EventColor, Interval, Priority};
use crate::errors::{Error, Result};
use crate::logging::{LogLevel, RunLog};
use crate::zoned;

use self::priority::{effective_priority, habit_order, is_urgent, task_order};
use self::slots::{
    best_slot_for_habit, characterize_slot, clip_to_future, free_slots_in_day, ideal_start_in_slot,
    optimal_duration, take_task_chunk, DurationBounds, Occupancy, SlotOwner,
};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// How many days past its occurrence date a bumped habit may drift when it
/// gets rescheduled.
const RESCHEDULE_SEARCH_DAYS: i64 = 7;

/// A habit placed so far off its wished time is dropped instead: the cutoff
/// is this multiple of the habit's reference duration.
const MAX_DEVIATION_FACTOR: i64 = 4;

// ============================================================================
// Input / options
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    pub window_days: u32,
    pub breaks: BreakSettings,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            breaks: BreakSettings::default(),
        }
    }
}

/// Immutable snapshot of everything one run needs. `now` is injected so runs
/// are reproducible in tests.
#[derive(Debug, Clone)]
pub struct ScheduleInput {
    pub habits: Vec<Habit>,
    pub tasks: Vec<Task>,
    /// Events overlapping the window, all-day events already filtered out.
    pub events: Vec<CalendarEvent>,
    pub availability: AvailabilitySet,
    pub timezone: String,
    pub now: DateTime<Utc>,
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitPlacement {
    pub habit_id: String,
    pub habit_name: String,
    pub occurrence_date: NaiveDate,
    pub event: NewEvent,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: String,
    pub task_name: String,
    pub events: Vec<NewEvent>,
    pub scheduled_minutes: i64,
    pub total_minutes: i64,
    pub remaining_minutes: i64,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub warning_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BumpedHabit {
    pub habit_id: String,
    pub habit_name: String,
    pub occurrence_date: NaiveDate,
    pub displaced_by: String,
    pub original_event: NewEvent,
    /// Where the occurrence landed after rescheduling, when anywhere.
    #[serde(default)]
    pub rescheduled_event: Option<NewEvent>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub total_events: usize,
    pub habits_scheduled: usize,
    pub tasks_scheduled: usize,
    pub bumped_habits: usize,
    pub breaks_scheduled: usize,
}

/// Everything a run produced. Always returned whole: individual items that
/// could not be placed surface as log entries and per-item warnings, never
/// as a failed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub events: Vec<NewEvent>,
    /// Existing event ids made obsolete by this run (stale generated events
    /// from earlier runs). The live shell deletes them.
    pub deleted_event_ids: Vec<String>,
    pub habit_placements: Vec<HabitPlacement>,
    pub task_outcomes: Vec<TaskOutcome>,
    pub bumped: Vec<BumpedHabit>,
    pub summary: ScheduleSummary,
    pub log: RunLog,
}

// ============================================================================
// Step observer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Info,
    Habit,
    Task,
    Bump,
    Reschedule,
    Break,
}

/// One decision the engine made, with enough context to replay the run
/// visually. `event_id` is the engine-internal id of the event the step
/// placed or (for bump steps) retracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub kind: StepKind,
    pub description: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event: Option<NewEvent>,
    #[serde(default)]
    pub free_slot_count: Option<usize>,
    #[serde(default)]
    pub remaining_minutes: Option<i64>,
}

/// Observer invoked once per placement decision. The live shell uses a no-op
/// (or logging) observer; the preview shell collects the steps.
pub trait ScheduleObserver {
    fn on_step(&mut self, step: StepRecord);
}

pub struct NoopObserver;

impl ScheduleObserver for NoopObserver {
    fn on_step(&mut self, _step: StepRecord) {}
}

// ============================================================================
// Scheduler
// ============================================================================

/// Run the two-pass scheduling protocol over an input snapshot.
pub fn run(input: &ScheduleInput, options: &ScheduleOptions) -> Result<ScheduleResult> {
    run_with_observer(input, options, &mut NoopObserver)
}

pub fn run_with_observer(
    input: &ScheduleInput,
    options: &ScheduleOptions,
    observer: &mut dyn ScheduleObserver,
) -> Result<ScheduleResult> {
    Scheduler::new(input, options, observer)?.run()
}

/// A habit event placed this run, kept around for potential bumping.
struct PlacedHabit {
    habit_index: usize,
    /// Nominal occurrence date from the recurrence rule.
    occurrence_date: NaiveDate,
    /// Local date the event actually landed on (the dedup key).
    landed_date: NaiveDate,
    has_preference: bool,
}

struct Scheduler<'a> {
    input: &'a ScheduleInput,
    options: &'a ScheduleOptions,
    observer: &'a mut dyn ScheduleObserver,
    tz: Tz,
    now: DateTime<Utc>,
    window_start_date: NaiveDate,

    occupancy: Occupancy,
    log: RunLog,
    step_index: usize,
    next_event_seq: u32,

    /// This run's new events, keyed by engine-assigned id so bumping can
    /// retract them. Order is placement order.
    events: Vec<(String, NewEvent)>,
    habit_placements: Vec<(String, HabitPlacement)>,
    placed_habits: HashMap<String, PlacedHabit>,
    bumped: Vec<BumpedHabit>,
    deleted_event_ids: Vec<String>,
    /// Per-task minutes already committed by surviving events.
    committed_minutes: HashMap<String, i64>,
    /// Habit occurrences that already have a surviving calendar event.
    scheduled_occurrences: HashSet<(String, NaiveDate)>,
    /// Tasks whose placed chunks were evicted by a more urgent task; they
    /// get exactly one more pass, without bumping rights.
    requeued_tasks: Vec<usize>,
}

impl<'a> Scheduler<'a> {
    fn new(
        input: &'a ScheduleInput,
        options: &'a ScheduleOptions,
        observer: &'a mut dyn ScheduleObserver,
    ) -> Result<Self> {
        let tz = zoned::resolve_timezone(&input.timezone)?;

        // Fail-fast validation, before any placement.
        input.availability.validate()?;
        for habit in &input.habits {
            habit.validate()?;
        }
        for task in &input.tasks {
            task.validate()?;
        }
        for event in &input.events {
            event.validate()?;
        }

        Ok(Self {
            input,
            options,
            observer,
            tz,
            now: input.now,
            window_start_date: zoned::local_date_of(input.now, tz),
            occupancy: Occupancy::new(),
            log: RunLog::new(),
            step_index: 0,
            next_event_seq: 0,
            events: Vec::new(),
            habit_placements: Vec::new(),
            placed_habits: HashMap::new(),
            bumped: Vec::new(),
            deleted_event_ids: Vec::new(),
            committed_minutes: HashMap::new(),
            scheduled_occurrences: HashSet::new(),
            requeued_tasks: Vec::new(),
        })
    }

    fn run(mut self) -> Result<ScheduleResult> {
        self.build_blocking_set();
        self.emit_info_step(format!(
            "Scheduling {} habits and {} tasks over {} days",
            self.input.habits.len(),
            self.input.tasks.len(),
            self.options.window_days
        ));

        self.habit_pass()?;
        let mut outcomes = self.task_pass()?;
        self.reschedule_bumped()?;

        let mut seq = self.next_event_seq;
        let break_events = breaks::insert_breaks(
            &self.options.breaks,
            &mut self.occupancy,
            self.now,
            &mut || {
                seq += 1;
                format!("new-{seq:04}")
            },
            &mut self.log,
        );
        for event in &break_events {
            self.emit_step(
                StepKind::Break,
                format!(
                    "Inserted break {} - {}",
                    event.start_at.format("%H:%M"),
                    event.end_at.format("%H:%M")
                ),
                None,
                Some(event.clone()),
                None,
                None,
            );
        }

        // Keep the per-task outcome order aligned with the input, not the
        // processing order.
        outcomes.sort_by_key(|o| {
            self.input
                .tasks
                .iter()
                .position(|t| t.id == o.task_id)
                .unwrap_or(usize::MAX)
        });

        let summary = ScheduleSummary {
            total_events: self.events.len() + break_events.len(),
            habits_scheduled: self.habit_placements.len(),
            tasks_scheduled: outcomes.iter().filter(|o| !o.events.is_empty()).count(),
            bumped_habits: self.bumped.len(),
            breaks_scheduled: break_events.len(),
        };

        self.log.info(format!(
            "Run complete: {} events ({} habit, {} task, {} break), {} bumped",
            summary.total_events,
            summary.habits_scheduled,
            summary.tasks_scheduled,
            summary.breaks_scheduled,
            summary.bumped_habits
        ));
        self.emit_info_step(format!(
            "Done: {} habits, {} tasks placed",
            summary.habits_scheduled, summary.tasks_scheduled
        ));

        let mut events: Vec<NewEvent> = self.events.into_iter().map(|(_, e)| e).collect();
        events.extend(break_events);

        Ok(ScheduleResult {
            events,
            deleted_event_ids: self.deleted_event_ids,
            habit_placements: self.habit_placements.into_iter().map(|(_, p)| p).collect(),
            task_outcomes: outcomes,
            bumped: self.bumped,
            summary,
            log: self.log,
        })
    }

    // ------------------------------------------------------------------
    // Step 1: blocking set
    // ------------------------------------------------------------------

    /// Locked and already-started events block. Future, non-locked events
    /// generated by an earlier run are stale: they are replaced by this run
    /// and queued for deletion. Future, non-locked events the user created
    /// by hand stay blocking.
    fn build_blocking_set(&mut self) {
        // Start from the collaborator-maintained committed minutes; stale
        // events about to be deleted give theirs back.
        for task in &self.input.tasks {
            self.committed_minutes
                .insert(task.id.clone(), task.scheduled_minutes);
        }

        for event in &self.input.events {
            let started = event.start_at <= self.now;
            let stale_generated = !event.locked && !started && event.source.is_some();

            if stale_generated {
                if let Some(EventSource::Task {
                    task_id,
                    scheduled_minutes,
                }) = &event.source
                {
                    if let Some(minutes) = self.committed_minutes.get_mut(task_id) {
                        *minutes = (*minutes - scheduled_minutes).max(0);
                    }
                }
                self.deleted_event_ids.push(event.id.clone());
                continue;
            }

            if let Some(EventSource::Habit {
                habit_id,
                occurrence_date,
            }) = &event.source
            {
                self.scheduled_occurrences
                    .insert((habit_id.clone(), *occurrence_date));
            }

            // Fully past events cannot conflict with future placements.
            if event.end_at <= self.now {
                continue;
            }

            let Ok(interval) = event.interval() else {
                continue;
            };
            let owner = if event.locked {
                SlotOwner::Locked
            } else {
                match &event.source {
                    Some(EventSource::Habit { habit_id, .. }) => SlotOwner::HabitEvent {
                        habit_id: habit_id.clone(),
                    },
                    Some(EventSource::Task { task_id, .. }) => SlotOwner::TaskEvent {
                        task_id: task_id.clone(),
                    },
                    Some(EventSource::Break) | None => SlotOwner::Locked,
                }
            };
            self.occupancy
                .block(event.id.clone(), interval, owner, Priority::Normal);
        }

        if !self.deleted_event_ids.is_empty() {
            self.log.info(format!(
                "Replacing {} previously generated events",
                self.deleted_event_ids.len()
            ));
        }
    }

    // ------------------------------------------------------------------
    // Step 2: habit pass
    // ------------------------------------------------------------------

    fn habit_pass(&mut self) -> Result<()> {
        let window_end_date =
            self.window_start_date + Duration::days(self.options.window_days as i64);

        for habit_index in habit_order(&self.input.habits, self.now) {
            let habit = &self.input.habits[habit_index];
            if !habit.is_active || !habit.auto_schedule {
                continue;
            }

            let dates =
                occurrence::occurrences_in_range(habit, self.window_start_date, window_end_date)?;
            for date in dates {
                if self
                    .scheduled_occurrences
                    .contains(&(habit.id.clone(), date))
                {
                    self.log.info(format!(
                        "Habit \"{}\" already has an event on {date}; skipping",
                        habit.name
                    ));
                    continue;
                }
                let _ = self.place_habit_occurrence(habit_index, date, StepKind::Habit)?;
            }
        }
        Ok(())
    }

    /// Try to put one habit occurrence on `date`. Returns the engine id of
    /// the placed event, or None when the occurrence was dropped (which is
    /// an expected outcome, not an error).
    fn place_habit_occurrence(
        &mut self,
        habit_index: usize,
        date: NaiveDate,
        kind: StepKind,
    ) -> Result<Option<String>> {
        let habit = &self.input.habits[habit_index];
        if self
            .scheduled_occurrences
            .contains(&(habit.id.clone(), date))
        {
            return Ok(None);
        }
        let bounds = DurationBounds::effective(
            habit.duration_minutes,
            habit.min_duration_minutes,
            habit.max_duration_minutes,
        );
        let search_min = bounds.min.max(1);

        let day_slots = free_slots_in_day(
            &self.input.availability,
            habit.calendar_hours,
            date,
            &self.occupancy,
            search_min,
            self.tz,
        )?;
        let future = clip_to_future(&day_slots, self.now);
        if future.is_empty() {
            // Quiet skip for days already behind the clock; a dropped
            // occurrence on a future day is worth a line.
            if date > self.window_start_date {
                self.drop_occurrence(habit, date);
            }
            return Ok(None);
        }

        let Some(slot) = best_slot_for_habit(
            &bounds,
            habit.ideal_time,
            habit.time_preference,
            &future,
            self.tz,
        ) else {
            self.drop_occurrence(habit, date);
            return Ok(None);
        };

        let fit = characterize_slot(
            habit.ideal_time,
            habit.time_preference,
            bounds.preferred,
            &slot,
            self.tz,
        );
        let duration = optimal_duration(&bounds, slot.available_minutes(), &fit);
        if duration == 0 {
            self.log.info(format!(
                "Cannot fit habit \"{}\" on {date} (below its minimum duration)",
                habit.name
            ));
            return Ok(None);
        }

        let start = ideal_start_in_slot(
            habit.ideal_time,
            habit.time_preference,
            &slot,
            duration,
            self.now,
            self.tz,
        );
        let end = start + Duration::minutes(duration);

        if habit.has_time_preference() {
            let deviation = self.deviation_minutes(start, habit);
            let reference = habit.max_duration_minutes.unwrap_or(habit.duration_minutes);
            if deviation > reference * MAX_DEVIATION_FACTOR {
                self.log.info(format!(
                    "Dropping habit \"{}\" on {date}: nearest capacity is {deviation} minutes from its preferred time",
                    habit.name
                ));
                return Ok(None);
            }
        }

        let interval = Interval { start, end };
        if self.occupancy.has_conflict(&interval) {
            self.log.warn(format!(
                "Conflict placing habit \"{}\" on {date}; occurrence dropped",
                habit.name
            ));
            return Ok(None);
        }

        // The link carries the date the event actually landed on, which can
        // differ from the nominal occurrence when capacity pushed it.
        let landed_date = zoned::local_date_of(start, self.tz);
        let engine_id = self.alloc_event_id();
        let event = NewEvent {
            title: habit.name.clone(),
            start_at: start,
            end_at: end,
            color: habit
                .color
                .unwrap_or_else(|| EventColor::for_category(habit.calendar_hours)),
            source: Some(EventSource::Habit {
                habit_id: habit.id.clone(),
                occurrence_date: landed_date,
            }),
        };

        self.occupancy.block(
            engine_id.clone(),
            interval,
            SlotOwner::HabitEvent {
                habit_id: habit.id.clone(),
            },
            habit.priority.unwrap_or(Priority::Normal),
        );
        self.scheduled_occurrences
            .insert((habit.id.clone(), landed_date));
        self.placed_habits.insert(
            engine_id.clone(),
            PlacedHabit {
                habit_index,
                occurrence_date: date,
                landed_date,
                has_preference: habit.has_time_preference(),
            },
        );
        self.events.push((engine_id.clone(), event.clone()));
        self.habit_placements.push((
            engine_id.clone(),
            HabitPlacement {
                habit_id: habit.id.clone(),
                habit_name: habit.name.clone(),
                occurrence_date: date,
                event: event.clone(),
                duration_minutes: duration,
            },
        ));

        self.log.info(format!(
            "Scheduled habit \"{}\" on {landed_date} at {} for {duration} minutes",
            habit.name,
            start.format("%H:%M UTC")
        ));
        self.emit_step(
            kind,
            format!(
                "Habit \"{}\" on {landed_date} at {} ({duration}m)",
                habit.name,
                start.format("%H:%M UTC")
            ),
            Some(engine_id.clone()),
            Some(event),
            Some(future.len()),
            None,
        );

        Ok(Some(engine_id))
    }

    /// One occurrence found no capacity: a recovered `NoAvailableSlot`, an
    /// info log line, never a failed run.
    fn drop_occurrence(&mut self, habit: &Habit, date: NaiveDate) {
        let err = Error::no_slot("habit", habit.name.as_str());
        self.log.info(format!("{err} Occurrence {date} dropped."));
    }

    fn deviation_minutes(&self, start: DateTime<Utc>, habit: &Habit) -> i64 {
        let parts = zoned::to_zoned_parts(start, self.tz);
        let start_minutes = (parts.hour * 60 + parts.minute) as i64;
        if let Some(ideal) = habit.ideal_time {
            let diff = (start_minutes - ideal.minutes()).abs();
            diff.min(24 * 60 - diff)
        } else if let Some(pref) = habit.time_preference {
            (start_minutes - pref.center_minutes()).abs()
        } else {
            0
        }
    }

    // ------------------------------------------------------------------
    // Step 3: task pass (with step 4, bumping, inlined per day)
    // ------------------------------------------------------------------

    fn task_pass(&mut self) -> Result<Vec<TaskOutcome>> {
        let mut outcomes = Vec::new();
        let order = task_order(&self.input.tasks, self.now);
        let mut queue: Vec<(usize, bool)> = order.into_iter().map(|i| (i, true)).collect();

        let mut position = 0;
        while position < queue.len() {
            let (task_index, may_bump) = queue[position];
            position += 1;

            let outcome = self.schedule_task(task_index, may_bump)?;
            // A task evicted by a later, more urgent one gets requeued; its
            // earlier outcome is replaced at the end.
            outcomes.retain(|o: &TaskOutcome| o.task_id != outcome.task_id);
            outcomes.push(outcome);

            let requeued = std::mem::take(&mut self.requeued_tasks);
            for idx in requeued {
                if !queue[position..].iter().any(|(i, _)| *i == idx) {
                    queue.push((idx, false));
                }
            }
        }

        Ok(outcomes)
    }

    fn schedule_task(&mut self, task_index: usize, may_bump: bool) -> Result<TaskOutcome> {
        let task = &self.input.tasks[task_index];
        let total_minutes = task.total_minutes();
        let committed = *self
            .committed_minutes
            .get(&task.id)
            .unwrap_or(&task.scheduled_minutes);

        // Sessions this run already placed for the task and not evicted
        // since; a requeued task keeps them and only fills the difference.
        let surviving: Vec<NewEvent> = self
            .events
            .iter()
            .filter(|(_, e)| {
                matches!(&e.source, Some(EventSource::Task { task_id, .. }) if task_id == &task.id)
            })
            .map(|(_, e)| e.clone())
            .collect();
        let surviving_minutes: i64 = surviving.iter().map(|e| e.minutes()).sum();
        let mut remaining = (total_minutes - committed - surviving_minutes).max(0);

        let mut outcome = TaskOutcome {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            events: surviving,
            scheduled_minutes: committed + surviving_minutes,
            total_minutes,
            remaining_minutes: remaining,
            warning: None,
            warning_level: None,
        };

        if remaining <= 0 {
            self.log
                .info(format!("Task \"{}\" is already fully scheduled", task.name));
            return Ok(outcome);
        }

        let task_priority = effective_priority(task.priority, task.end_date, self.now);
        let urgent = is_urgent(task.priority, task.end_date, self.now);
        let (min_chunk, max_chunk) = if task.is_splittable {
            task.chunk_bounds()
        } else {
            (remaining, remaining)
        };
        let total_parts = if task.is_splittable {
            (total_minutes + max_chunk - 1) / max_chunk
        } else {
            1
        };

        let search_floor = match task.start_date {
            Some(start) => start.max(self.now),
            None => self.now,
        };
        let first_date = zoned::local_date_of(search_floor, self.tz);
        let mut scheduled_after_deadline = false;

        for day_offset in 0..self.options.window_days as i64 {
            if remaining <= 0 {
                break;
            }
            let date = self.window_start_date + Duration::days(day_offset);
            if date < first_date {
                continue;
            }

            let mut day_slots = free_slots_in_day(
                &self.input.availability,
                task.calendar_hours,
                date,
                &self.occupancy,
                min_chunk,
                self.tz,
            )?;

            if day_slots.is_empty() && urgent && may_bump {
                if let Some(deadline) = task.end_date {
                    if self.bump_for(task_index, task_priority, deadline) {
                        day_slots = free_slots_in_day(
                            &self.input.availability,
                            task.calendar_hours,
                            date,
                            &self.occupancy,
                            min_chunk,
                            self.tz,
                        )?;
                    }
                }
            }

            let mut future = clip_to_future(&day_slots, search_floor.max(self.now));

            while remaining > 0 {
                let slot_count = future.len();
                let Some(chunk) =
                    take_task_chunk(&mut future, remaining, min_chunk, max_chunk, &self.occupancy)
                else {
                    break;
                };

                if let Some(deadline) = task.end_date {
                    if chunk.end > deadline {
                        scheduled_after_deadline = true;
                    }
                }

                let part_number = outcome.events.len() as i64 + 1;
                let title = if total_parts > 1 {
                    format!("{} ({part_number}/{total_parts})", task.name)
                } else {
                    task.name.clone()
                };

                let engine_id = self.alloc_event_id();
                let event = NewEvent {
                    title,
                    start_at: chunk.start,
                    end_at: chunk.end,
                    color: EventColor::for_category(task.calendar_hours),
                    source: Some(EventSource::Task {
                        task_id: task.id.clone(),
                        scheduled_minutes: chunk.minutes,
                    }),
                };

                self.occupancy.block(
                    engine_id.clone(),
                    Interval {
                        start: chunk.start,
                        end: chunk.end,
                    },
                    SlotOwner::TaskEvent {
                        task_id: task.id.clone(),
                    },
                    task_priority,
                );
                self.events.push((engine_id.clone(), event.clone()));
                outcome.events.push(event.clone());
                remaining -= chunk.minutes;

                self.log.info(format!(
                    "Scheduled {}m of task \"{}\" on {date} at {}",
                    chunk.minutes,
                    task.name,
                    chunk.start.format("%H:%M UTC")
                ));
                self.emit_step(
                    StepKind::Task,
                    format!(
                        "Task \"{}\" {}m on {date} at {}",
                        task.name,
                        chunk.minutes,
                        chunk.start.format("%H:%M UTC")
                    ),
                    Some(engine_id),
                    Some(event),
                    Some(slot_count),
                    Some(remaining),
                );
            }
        }

        let placed_minutes: i64 = outcome.events.iter().map(|e| e.minutes()).sum();
        let scheduled_now = placed_minutes - surviving_minutes;
        outcome.scheduled_minutes = committed + placed_minutes;
        outcome.remaining_minutes = (total_minutes - outcome.scheduled_minutes).max(0);

        if scheduled_now == 0 && remaining > 0 && surviving_minutes == 0 {
            outcome.warning = Some(Error::no_slot("task", task.name.as_str()).to_string());
            outcome.warning_level = Some(LogLevel::Error);
            self.log.warn(format!(
                "Task \"{}\" could not be scheduled at all",
                task.name
            ));
        } else if outcome.remaining_minutes > 0 {
            let percent = (outcome.scheduled_minutes * 100) / total_minutes.max(1);
            outcome.warning = Some(format!(
                "Partially scheduled: {} minutes remaining ({percent}% placed)",
                outcome.remaining_minutes
            ));
            outcome.warning_level = Some(LogLevel::Warn);
            self.log.warn(format!(
                "Task \"{}\" only partially scheduled; {} minutes remain",
                task.name, outcome.remaining_minutes
            ));
        } else if scheduled_after_deadline {
            outcome.warning = Some("Scheduled past its deadline".to_string());
            outcome.warning_level = Some(LogLevel::Warn);
            self.log
                .warn(format!("Task \"{}\" scheduled past its deadline", task.name));
        }

        Ok(outcome)
    }

    /// Evict lower-priority occupants before `deadline` to free capacity for
    /// an urgent task. Habit victims are queued for rescheduling; task
    /// victims give their minutes back and rejoin the queue. Single depth:
    /// nothing a bump displaces may bump in turn.
    fn bump_for(
        &mut self,
        bumper_index: usize,
        bumper_priority: Priority,
        deadline: DateTime<Utc>,
    ) -> bool {
        let bumper = &self.input.tasks[bumper_index];
        let mut victims = self
            .occupancy
            .bumpable_events(bumper_priority, deadline, self.now);

        // Habits pinned to a time are displaced last.
        victims.sort_by_key(|v| match &v.owner {
            SlotOwner::HabitEvent { .. } => self
                .placed_habits
                .get(&v.event_id)
                .map(|p| p.has_preference)
                .unwrap_or(false),
            _ => false,
        });

        let mut evicted_any = false;
        for victim in victims {
            match &victim.owner {
                SlotOwner::HabitEvent { .. } => {
                    let Some(placed) = self.placed_habits.remove(&victim.event_id) else {
                        // Pre-existing habit event (in progress or locked);
                        // bumpable_events never returns those, but stay safe.
                        continue;
                    };
                    let habit = &self.input.habits[placed.habit_index];
                    let original_event = self.retract_event(&victim.event_id);
                    self.scheduled_occurrences
                        .remove(&(habit.id.clone(), placed.landed_date));
                    self.habit_placements
                        .retain(|(id, _)| id != &victim.event_id);

                    self.log.warn(format!(
                        "Bumped habit \"{}\" on {} for urgent task \"{}\"",
                        habit.name, placed.occurrence_date, bumper.name
                    ));
                    self.emit_step(
                        StepKind::Bump,
                        format!(
                            "Bumped habit \"{}\" for urgent task \"{}\"",
                            habit.name, bumper.name
                        ),
                        Some(victim.event_id.clone()),
                        original_event.clone(),
                        None,
                        None,
                    );
                    if let Some(event) = original_event {
                        self.bumped.push(BumpedHabit {
                            habit_id: habit.id.clone(),
                            habit_name: habit.name.clone(),
                            occurrence_date: placed.occurrence_date,
                            displaced_by: bumper.id.clone(),
                            original_event: event,
                            rescheduled_event: None,
                        });
                    }
                    evicted_any = true;
                }
                SlotOwner::TaskEvent { task_id } => {
                    let Some(victim_index) =
                        self.input.tasks.iter().position(|t| &t.id == task_id)
                    else {
                        continue;
                    };
                    let victim_task = &self.input.tasks[victim_index];
                    // Only tasks strictly less constrained lose their spot.
                    let later_deadline = match victim_task.end_date {
                        None => true,
                        Some(d) => d > deadline,
                    };
                    if !later_deadline {
                        continue;
                    }

                    if let Some(event) = self.retract_event(&victim.event_id) {
                        self.log.warn(format!(
                            "Bumped a session of task \"{}\" for urgent task \"{}\"",
                            victim_task.name, bumper.name
                        ));
                        self.emit_step(
                            StepKind::Bump,
                            format!(
                                "Bumped task \"{}\" session for urgent task \"{}\"",
                                victim_task.name, bumper.name
                            ),
                            Some(victim.event_id.clone()),
                            Some(event),
                            None,
                            None,
                        );
                        if !self.requeued_tasks.contains(&victim_index) {
                            self.requeued_tasks.push(victim_index);
                        }
                        evicted_any = true;
                    }
                }
                SlotOwner::Locked => {}
            }
        }

        evicted_any
    }

    /// Remove one of this run's events from the occupancy and the output.
    fn retract_event(&mut self, engine_id: &str) -> Option<NewEvent> {
        self.occupancy.remove(engine_id);
        let position = self.events.iter().position(|(id, _)| id == engine_id)?;
        Some(self.events.remove(position).1)
    }

    // ------------------------------------------------------------------
    // Bumped-habit rescheduling (single depth, no further evictions)
    // ------------------------------------------------------------------

    fn reschedule_bumped(&mut self) -> Result<()> {
        for bump_index in 0..self.bumped.len() {
            let (habit_index, occurrence_date, habit_name) = {
                let bumped = &self.bumped[bump_index];
                let Some(habit_index) = self
                    .input
                    .habits
                    .iter()
                    .position(|h| h.id == bumped.habit_id)
                else {
                    continue;
                };
                (habit_index, bumped.occurrence_date, bumped.habit_name.clone())
            };

            let mut placed = None;
            for day_offset in 0..=RESCHEDULE_SEARCH_DAYS {
                let date = occurrence_date + Duration::days(day_offset);
                if let Some(engine_id) =
                    self.place_habit_occurrence(habit_index, date, StepKind::Reschedule)?
                {
                    placed = Some(engine_id);
                    break;
                }
            }

            match placed {
                Some(engine_id) => {
                    let event = self
                        .events
                        .iter()
                        .find(|(id, _)| id == &engine_id)
                        .map(|(_, e)| e.clone());
                    self.bumped[bump_index].rescheduled_event = event;
                }
                None => {
                    self.log.warn(format!(
                        "Could not reschedule bumped habit \"{habit_name}\" within {RESCHEDULE_SEARCH_DAYS} days"
                    ));
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------

    fn alloc_event_id(&mut self) -> String {
        self.next_event_seq += 1;
        format!("new-{:04}", self.next_event_seq)
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_step(
        &mut self,
        kind: StepKind,
        description: String,
        event_id: Option<String>,
        event: Option<NewEvent>,
        free_slot_count: Option<usize>,
        remaining_minutes: Option<i64>,
    ) {
        let step = StepRecord {
            index: self.step_index,
            kind,
            description,
            event_id,
            event,
            free_slot_count,
            remaining_minutes,
        };
        self.step_index += 1;
        self.observer.on_step(step);
    }

    fn emit_info_step(&mut self, description: String) {
        self.emit_step(StepKind::Info, description, None, None, None, None);
    }
}
