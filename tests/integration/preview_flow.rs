mod common;

use anyhow::Result;
use chrono::Duration;

use common::{date, instant, make_habit, make_task, monday_morning, open_hours, MemoryStore};
use planwise::adapter::{preview, LiveScheduler};
use planwise::core::availability::BreakSettings;
use planwise::core::models::CalendarEvent;
use planwise::logging::Logger;
use planwise::scheduler::{ScheduleInput, ScheduleOptions, StepKind};

fn sample_input() -> ScheduleInput {
    let mut habit = make_habit("h1", "Evening run");
    habit.ideal_time = Some(planwise::core::types::BlockTime::try_from_str("18:30").unwrap());
    let mut urgent = make_task("t1", "Incident review", 1.0);
    urgent.end_date = Some(monday_morning() + Duration::hours(12));

    ScheduleInput {
        habits: vec![habit, make_habit("h2", "Journal")],
        tasks: vec![urgent, make_task("t2", "Slides", 2.0)],
        events: Vec::new(),
        availability: open_hours("07:00", "23:00"),
        timezone: "UTC".to_string(),
        now: monday_morning(),
    }
}

fn options(window_days: u32) -> ScheduleOptions {
    ScheduleOptions {
        window_days,
        breaks: BreakSettings::default(),
    }
}

#[test]
fn preview_matches_what_live_mode_would_commit() -> Result<()> {
    let input = sample_input();
    let preview_result = preview(&input, &options(3))?;

    // Drive the live shell from a store seeded with the same data.
    let mut store = MemoryStore::new();
    store.habits = input.habits.clone();
    store.tasks = input.tasks.clone();
    let logger = Logger::new();
    logger.set_file_logging_enabled(false);
    let live_report = LiveScheduler::new(logger).run(&mut store, input.now, 3)?;

    assert_eq!(preview_result.result.events, live_report.result.events);
    Ok(())
}

#[test]
fn steps_are_ordered_and_cover_every_placement() -> Result<()> {
    let preview_result = preview(&sample_input(), &options(3))?;

    let indices: Vec<usize> = preview_result.steps.iter().map(|s| s.index).collect();
    let mut sorted = indices.clone();
    sorted.sort();
    assert_eq!(indices, sorted, "steps must arrive in order");

    // Each final event corresponds to a placement step.
    let placements = preview_result
        .steps
        .iter()
        .filter(|s| s.event.is_some())
        .count();
    assert!(placements >= preview_result.result.events.len());

    // Narration-only entries stay out of the animation track.
    assert!(preview_result
        .animation_steps()
        .all(|s| s.kind != StepKind::Info));
    Ok(())
}

#[test]
fn replay_accumulates_and_retracts_events() -> Result<()> {
    // Saturate one hour per day so the urgent task must bump the habit.
    let mut habit = make_habit("h1", "Deep work");
    habit.duration_minutes = 60;
    let mut urgent = make_task("t1", "Incident review", 1.0);
    urgent.end_date = Some(monday_morning() + Duration::hours(15));

    let input = ScheduleInput {
        habits: vec![habit],
        tasks: vec![urgent],
        events: Vec::new(),
        availability: open_hours("09:00", "10:00"),
        timezone: "UTC".to_string(),
        now: monday_morning(),
    };

    let preview_result = preview(&input, &options(1))?;
    assert_eq!(preview_result.result.summary.bumped_habits, 1);

    let bump_step = preview_result
        .steps
        .iter()
        .find(|s| s.kind == StepKind::Bump)
        .expect("bump step recorded");

    // Just before the bump the habit event is visible; just after, its slot
    // belongs to nobody until the task's placement step.
    let before = preview_result.events_at_step(bump_step.index - 1);
    let after = preview_result.events_at_step(bump_step.index);
    assert_eq!(before.len(), after.len() + 1);

    // At the end of the trace the full final set is visible.
    let last_index = preview_result.steps.last().unwrap().index;
    let final_events = preview_result.events_at_step(last_index);
    assert_eq!(final_events.len(), preview_result.result.events.len());
    Ok(())
}

#[test]
fn all_day_events_do_not_block_preview_placements() -> Result<()> {
    let mut habit = make_habit("h1", "Evening run");
    habit.ideal_time = Some(planwise::core::types::BlockTime::try_from_str("18:30").unwrap());

    // An all-day event covers the entire occurrence date.
    let all_day = CalendarEvent {
        id: "ad-1".to_string(),
        title: "Conference".to_string(),
        start_at: instant(2025, 12, 8, 0, 0),
        end_at: instant(2025, 12, 9, 0, 0),
        locked: true,
        source: None,
    };

    let input = ScheduleInput {
        habits: vec![habit],
        tasks: Vec::new(),
        events: vec![all_day],
        availability: open_hours("07:00", "23:00"),
        timezone: "UTC".to_string(),
        now: monday_morning(),
    };

    let preview_result = preview(&input, &options(1))?;

    let monday_run = preview_result
        .result
        .habit_placements
        .iter()
        .find(|p| p.occurrence_date == date(2025, 12, 8))
        .expect("habit scheduled despite the all-day event");
    assert_eq!(monday_run.event.start_at, instant(2025, 12, 8, 18, 30));
    Ok(())
}

#[test]
fn preview_touches_no_storage_and_is_repeatable() -> Result<()> {
    let input = sample_input();
    let first = preview(&input, &options(3))?;
    let second = preview(&input, &options(3))?;

    assert_eq!(first.result.events, second.result.events);
    assert_eq!(first.steps.len(), second.steps.len());
    Ok(())
}
