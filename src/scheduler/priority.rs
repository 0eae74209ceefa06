use chrono::{DateTime, Utc};

use crate::core::models::{Habit, Task};
use crate::core::types::Priority;

/// Deadline window inside which a task may evict lower-priority occupants.
pub const URGENCY_THRESHOLD_HOURS: i64 = 48;

/// A task's actual scheduling priority: the explicit value when present,
/// otherwise inferred from deadline proximity. Overdue counts as critical.
pub fn effective_priority(
    explicit: Option<Priority>,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Priority {
    if let Some(priority) = explicit {
        return priority;
    }
    let Some(deadline) = deadline else {
        return Priority::Low;
    };

    let minutes_left = (deadline - now).num_minutes();
    if minutes_left <= 24 * 60 {
        Priority::Critical
    } else if minutes_left <= 72 * 60 {
        Priority::High
    } else if minutes_left <= 7 * 24 * 60 {
        Priority::Normal
    } else {
        Priority::Low
    }
}

/// Numeric ranking used to order the habit pass: a base per priority tier
/// plus a bonus that grows as the deadline closes in.
pub fn priority_score(
    explicit: Option<Priority>,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let base = effective_priority(explicit, deadline, now).weight() * 1000;
    let bonus = match deadline {
        None => 0,
        Some(deadline) => {
            let minutes_left = (deadline - now).num_minutes();
            if minutes_left < 0 {
                5000
            } else if minutes_left <= 24 * 60 {
                2000
            } else if minutes_left <= 48 * 60 {
                1000
            } else if minutes_left <= 72 * 60 {
                500
            } else if minutes_left <= 168 * 60 {
                200
            } else {
                0
            }
        }
    };
    base + bonus
}

/// Whether a task is close enough to its deadline to justify bumping.
pub fn is_urgent(
    explicit: Option<Priority>,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if effective_priority(explicit, deadline, now) == Priority::Critical {
        return true;
    }
    matches!(
        deadline,
        Some(d) if (d - now).num_minutes() <= URGENCY_THRESHOLD_HOURS * 60
    )
}

/// Task-pass processing order: effective priority, then ascending deadline
/// (absent deadlines last), then ascending remaining duration, then original
/// input position. Returns indices into `tasks`; the explicit final key keeps
/// the order deterministic across runs.
pub fn task_order(tasks: &[Task], now: DateTime<Utc>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..tasks.len()).collect();
    indices.sort_by_key(|&i| {
        let task = &tasks[i];
        (
            effective_priority(task.priority, task.end_date, now),
            deadline_key(task.end_date),
            task.remaining_minutes(),
            i,
        )
    });
    indices
}

/// Habit-pass processing order: habits pinned to an exact time first, then
/// habits with a coarse preference, then by descending priority score, then
/// input position. Pinned habits go first so flexible ones fill around them.
pub fn habit_order(habits: &[Habit], now: DateTime<Utc>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..habits.len()).collect();
    indices.sort_by_key(|&i| {
        let habit = &habits[i];
        (
            habit.ideal_time.is_none(),
            habit.time_preference.is_none(),
            -priority_score(habit.priority, None, now),
            i,
        )
    });
    indices
}

fn deadline_key(deadline: Option<DateTime<Utc>>) -> (bool, i64) {
    match deadline {
        Some(d) => (false, d.timestamp()),
        None => (true, 0),
    }
}
