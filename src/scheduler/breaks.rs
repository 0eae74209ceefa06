use chrono::{DateTime, Duration, Utc};

use crate::core::availability::BreakSettings;
use crate::core::models::{EventSource, NewEvent};
use crate::core::types::{EventColor, Interval, Priority};
use crate::logging::RunLog;
use crate::scheduler::slots::{Occupancy, SlotOwner};

/// A gap this long between sessions counts as an organic pause and resets
/// the continuous-work accumulator.
const ORGANIC_GAP_MINUTES: i64 = 30;

/// Insert break events after stretches of continuous work that exceed the
/// configured interval. Walks the occupied calendar in start order; each
/// placed break joins the occupancy so later breaks respect it.
pub fn insert_breaks(
    settings: &BreakSettings,
    occupancy: &mut Occupancy,
    now: DateTime<Utc>,
    alloc_event_id: &mut impl FnMut() -> String,
    log: &mut RunLog,
) -> Vec<NewEvent> {
    if !settings.break_enabled {
        return Vec::new();
    }

    let mut work_slots: Vec<Interval> = occupancy
        .iter()
        .filter(|s| {
            matches!(
                s.owner,
                SlotOwner::HabitEvent { .. } | SlotOwner::TaskEvent { .. }
            )
        })
        .map(|s| s.interval)
        .collect();
    work_slots.sort_by_key(|i| (i.start, i.end));

    if work_slots.is_empty() {
        log.info("No scheduled sessions; skipping break insertion");
        return Vec::new();
    }

    let mut breaks = Vec::new();
    let mut continuous_minutes = 0i64;
    let mut last_end: Option<DateTime<Utc>> = None;

    for slot in work_slots {
        if slot.end <= now {
            continue;
        }

        if let Some(prev_end) = last_end {
            if (slot.start - prev_end).num_minutes() >= ORGANIC_GAP_MINUTES {
                continuous_minutes = 0;
            }
        }

        continuous_minutes += slot.minutes();

        if continuous_minutes >= settings.break_interval_minutes {
            let break_start = slot.end;
            let break_end = break_start + Duration::minutes(settings.break_duration_minutes);
            let interval = Interval {
                start: break_start,
                end: break_end,
            };

            if occupancy.has_conflict(&interval) {
                // Something else follows immediately; that is a pause in its
                // own right.
                log.info(format!(
                    "Skipped break at {} due to an adjacent event",
                    break_start.format("%Y-%m-%d %H:%M UTC")
                ));
            } else {
                let event_id = alloc_event_id();
                occupancy.block(
                    event_id,
                    interval,
                    SlotOwner::Locked,
                    Priority::Normal,
                );
                log.info(format!(
                    "Inserted a {}-minute break after {} minutes of continuous work at {}",
                    settings.break_duration_minutes,
                    continuous_minutes,
                    break_start.format("%Y-%m-%d %H:%M UTC")
                ));
                breaks.push(NewEvent {
                    title: "Break".to_string(),
                    start_at: break_start,
                    end_at: break_end,
                    color: EventColor::Gray,
                    source: Some(EventSource::Break),
                });
            }
            continuous_minutes = 0;
        }

        last_end = Some(slot.end);
    }

    breaks
}
