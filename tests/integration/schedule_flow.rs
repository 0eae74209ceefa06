mod common;

use anyhow::Result;
use chrono::Duration;

use common::{instant, make_habit, make_task, monday_morning, open_hours, MemoryStore};
use planwise::adapter::LiveScheduler;
use planwise::core::types::BlockTime;
use planwise::logging::Logger;

fn quiet_logger() -> Logger {
    let logger = Logger::new();
    logger.set_file_logging_enabled(false);
    logger
}

#[test]
fn live_run_persists_events_and_links() -> Result<()> {
    let mut store = MemoryStore::new();
    let mut habit = make_habit("h1", "Evening run");
    habit.ideal_time = Some(BlockTime::try_from_str("18:30")?);
    store.habits.push(habit);
    store.tasks.push(make_task("t1", "Report", 2.0));

    let shell = LiveScheduler::new(quiet_logger());
    let report = shell.run(&mut store, monday_morning(), 3)?;

    assert_eq!(report.failed_insertions, 0);
    assert_eq!(report.failed_deletions, 0);
    assert_eq!(report.inserted_event_ids.len(), report.result.events.len());
    assert_eq!(store.events.len(), report.result.events.len());

    // Every stored event carries its source link.
    assert!(store.events.iter().all(|e| e.source.is_some()));
    // The habit landed at its ideal time on day one.
    assert!(store
        .events
        .iter()
        .any(|e| e.start_at == instant(2025, 12, 8, 18, 30)));

    Ok(())
}

#[test]
fn rerun_converges_instead_of_accumulating() -> Result<()> {
    let mut store = MemoryStore::new();
    store.habits.push(make_habit("h1", "Stretch"));
    store.tasks.push(make_task("t1", "Report", 2.0));

    let shell = LiveScheduler::new(quiet_logger());
    let now = monday_morning();

    shell.run(&mut store, now, 3)?;
    let first = store.snapshot();

    // Nothing changed in between: a second full reschedule must land on the
    // same calendar, not a doubled one.
    shell.run(&mut store, now, 3)?;
    let second = store.snapshot();

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn single_insert_failure_does_not_abort_the_run() -> Result<()> {
    let mut store = MemoryStore::new();
    store.habits.push(make_habit("h1", "Stretch"));
    store.tasks.push(make_task("t1", "Cursed", 1.0));
    store.poison_title = Some("Cursed".to_string());

    let shell = LiveScheduler::new(quiet_logger());
    let report = shell.run(&mut store, monday_morning(), 2)?;

    assert!(report.failed_insertions >= 1);
    // The habit events still made it in.
    assert!(!store.events.is_empty());
    assert!(store.events.iter().all(|e| !e.title.contains("Cursed")));
    Ok(())
}

#[test]
fn locked_events_survive_a_reschedule() -> Result<()> {
    let mut store = MemoryStore::new();
    store.tasks.push(make_task("t1", "Filler", 1.0));
    store.availability = open_hours("09:00", "12:00");

    // A manually positioned, locked meeting in the middle of the morning.
    let locked_start = instant(2025, 12, 8, 10, 0);
    store.events.push(planwise::core::models::CalendarEvent {
        id: "locked-1".to_string(),
        title: "Board meeting".to_string(),
        start_at: locked_start,
        end_at: locked_start + Duration::hours(1),
        locked: true,
        source: None,
    });

    let shell = LiveScheduler::new(quiet_logger());
    let report = shell.run(&mut store, monday_morning(), 2)?;

    // The locked event is untouched and nothing overlaps it.
    assert!(store.events.iter().any(|e| e.id == "locked-1"));
    for event in &report.result.events {
        assert!(
            event.end_at <= locked_start || event.start_at >= locked_start + Duration::hours(1)
        );
    }
    Ok(())
}

#[test]
fn unknown_workspace_timezone_aborts_before_any_mutation() {
    let mut store = MemoryStore::new();
    store.timezone = "Atlantis/Central".to_string();
    store.tasks.push(make_task("t1", "Report", 1.0));

    let shell = LiveScheduler::new(quiet_logger());
    let err = shell
        .run(&mut store, monday_morning(), 2)
        .expect_err("invalid timezone must be fatal");
    assert!(err.to_string().contains("Atlantis/Central"));
    assert!(store.events.is_empty());
}
