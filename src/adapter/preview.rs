use serde::{Deserialize, Serialize};

use crate::core::models::NewEvent;
use crate::errors::Result;
use crate::scheduler::{
    self, ScheduleInput, ScheduleObserver, ScheduleOptions, ScheduleResult, StepKind, StepRecord,
};
use crate::zoned;

/// A pure simulation of a scheduling run: the same final event set the live
/// shell would commit, plus the ordered decision trace that drives an
/// animated replay. No storage is touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResult {
    pub result: ScheduleResult,
    pub steps: Vec<StepRecord>,
}

impl PreviewResult {
    /// The decision steps worth animating (placements, bumps, reschedules,
    /// breaks), skipping narration-only entries.
    pub fn animation_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.kind != StepKind::Info)
    }

    /// The events visible after playing the trace up to and including
    /// `step_index`: placements accumulate, bump steps retract their victim.
    pub fn events_at_step(&self, step_index: usize) -> Vec<&NewEvent> {
        let mut visible: Vec<(&str, &NewEvent)> = Vec::new();
        for step in self.steps.iter().take_while(|s| s.index <= step_index) {
            match step.kind {
                StepKind::Bump => {
                    if let Some(id) = &step.event_id {
                        visible.retain(|(placed_id, _)| placed_id != id);
                    }
                }
                StepKind::Habit | StepKind::Task | StepKind::Reschedule | StepKind::Break => {
                    if let Some(event) = &step.event {
                        visible.push((step.event_id.as_deref().unwrap_or(""), event));
                    }
                }
                StepKind::Info => {}
            }
        }
        visible.into_iter().map(|(_, e)| e).collect()
    }
}

struct CollectingObserver {
    steps: Vec<StepRecord>,
}

impl ScheduleObserver for CollectingObserver {
    fn on_step(&mut self, step: StepRecord) {
        self.steps.push(step);
    }
}

/// Run the engine purely in memory. Given equal inputs this produces exactly
/// the event set a live run would persist; only the decision trace is extra.
pub fn preview(input: &ScheduleInput, options: &ScheduleOptions) -> Result<PreviewResult> {
    let tz = zoned::resolve_timezone(&input.timezone)?;

    // Apply the same all-day exclusion the live shell applies, so callers
    // can hand over raw event lists.
    let mut input = input.clone();
    input.events.retain(|e| !e.is_all_day(tz));

    let mut observer = CollectingObserver { steps: Vec::new() };
    let result = scheduler::run_with_observer(&input, options, &mut observer)?;

    Ok(PreviewResult {
        result,
        steps: observer.steps,
    })
}
