use chrono::{Duration, NaiveDate};

use crate::core::models::Habit;
use crate::core::types::Frequency;
use crate::errors::Result;
use crate::extensions::chrono::{add_months_clamped, add_years_clamped};

/// Expand a habit's recurrence rule into the concrete local dates that fall
/// inside `[window_start, window_end]` (both inclusive).
///
/// Dates before the habit's `start_date` or after its `end_date` are never
/// produced. The result is sorted and free of duplicates.
pub fn occurrences_in_range(
    habit: &Habit,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    habit.validate()?;

    let lower = window_start.max(habit.start_date);
    let upper = match habit.end_date {
        Some(end) => window_end.min(end),
        None => window_end,
    };
    if upper < lower {
        return Ok(Vec::new());
    }

    let interval = habit.recurrence_interval;
    let mut dates = Vec::new();
    match habit.frequency {
        Frequency::Daily => step_days(habit.start_date, interval as i64, lower, upper, &mut dates),
        Frequency::Weekly => step_days(
            habit.start_date,
            interval as i64 * 7,
            lower,
            upper,
            &mut dates,
        ),
        Frequency::Monthly => {
            let mut step = 0u32;
            loop {
                let date = add_months_clamped(habit.start_date, step);
                if date > upper {
                    break;
                }
                if date >= lower {
                    dates.push(date);
                }
                step += interval;
            }
        }
        Frequency::Yearly => {
            let mut step = 0u32;
            loop {
                let date = add_years_clamped(habit.start_date, step);
                if date > upper {
                    break;
                }
                if date >= lower {
                    dates.push(date);
                }
                step += interval;
            }
        }
        Frequency::Custom => {
            dates = habit
                .custom_dates
                .iter()
                .copied()
                .filter(|d| *d >= lower && *d <= upper)
                .collect();
            dates.sort();
            dates.dedup();
        }
    }

    Ok(dates)
}

/// Fixed-step expansion shared by daily and weekly rules. Jumps straight to
/// the first occurrence at or after `lower` instead of walking from the
/// habit's start date.
fn step_days(
    origin: NaiveDate,
    step: i64,
    lower: NaiveDate,
    upper: NaiveDate,
    out: &mut Vec<NaiveDate>,
) {
    let offset = (lower - origin).num_days();
    let first_step = if offset <= 0 {
        0
    } else {
        (offset + step - 1) / step
    };

    let mut date = origin + Duration::days(first_step * step);
    while date <= upper {
        out.push(date);
        date = date + Duration::days(step);
    }
}
