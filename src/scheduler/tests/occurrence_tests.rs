use super::{date, make_habit};
use crate::core::types::Frequency;
use crate::scheduler::occurrence::occurrences_in_range;

#[test]
fn daily_habit_hits_every_day_in_window() {
    let habit = make_habit("h1", "Stretch");
    let dates = occurrences_in_range(&habit, date(2025, 12, 8), date(2025, 12, 12)).unwrap();
    assert_eq!(
        dates,
        vec![
            date(2025, 12, 8),
            date(2025, 12, 9),
            date(2025, 12, 10),
            date(2025, 12, 11),
            date(2025, 12, 12),
        ]
    );
}

#[test]
fn daily_interval_keeps_phase_from_start_date() {
    let mut habit = make_habit("h1", "Gym");
    habit.recurrence_interval = 3;
    habit.start_date = date(2025, 12, 1);
    // Steps land on Dec 1, 4, 7, 10, 13...
    let dates = occurrences_in_range(&habit, date(2025, 12, 5), date(2025, 12, 14)).unwrap();
    assert_eq!(
        dates,
        vec![date(2025, 12, 7), date(2025, 12, 10), date(2025, 12, 13)]
    );
}

#[test]
fn weekly_habit_keeps_weekday() {
    let mut habit = make_habit("h1", "Review");
    habit.frequency = Frequency::Weekly;
    habit.start_date = date(2025, 12, 3); // a Wednesday
    let dates = occurrences_in_range(&habit, date(2025, 12, 8), date(2025, 12, 31)).unwrap();
    assert_eq!(
        dates,
        vec![date(2025, 12, 10), date(2025, 12, 17), date(2025, 12, 24), date(2025, 12, 31)]
    );
}

#[test]
fn biweekly_habit_skips_alternate_weeks() {
    let mut habit = make_habit("h1", "Call home");
    habit.frequency = Frequency::Weekly;
    habit.recurrence_interval = 2;
    habit.start_date = date(2025, 12, 1); // a Monday
    let dates = occurrences_in_range(&habit, date(2025, 12, 1), date(2025, 12, 31)).unwrap();
    assert_eq!(
        dates,
        vec![date(2025, 12, 1), date(2025, 12, 15), date(2025, 12, 29)]
    );
}

#[test]
fn monthly_habit_clamps_to_short_months() {
    let mut habit = make_habit("h1", "Rent");
    habit.frequency = Frequency::Monthly;
    habit.start_date = date(2025, 1, 31);
    let dates = occurrences_in_range(&habit, date(2025, 1, 1), date(2025, 4, 30)).unwrap();
    assert_eq!(
        dates,
        vec![
            date(2025, 1, 31),
            date(2025, 2, 28),
            date(2025, 3, 31),
            date(2025, 4, 30),
        ]
    );
}

#[test]
fn yearly_habit_repeats_month_and_day() {
    let mut habit = make_habit("h1", "Renewal");
    habit.frequency = Frequency::Yearly;
    habit.start_date = date(2024, 2, 29);
    let dates = occurrences_in_range(&habit, date(2024, 1, 1), date(2026, 12, 31)).unwrap();
    // Leap day clamps to Feb 28 in common years.
    assert_eq!(
        dates,
        vec![date(2024, 2, 29), date(2025, 2, 28), date(2026, 2, 28)]
    );
}

#[test]
fn custom_habit_passes_through_sorted_unique_dates() {
    let mut habit = make_habit("h1", "Errands");
    habit.frequency = Frequency::Custom;
    habit.custom_dates = vec![
        date(2025, 12, 20),
        date(2025, 12, 10),
        date(2025, 12, 10),
        date(2026, 1, 5), // outside window
    ];
    let dates = occurrences_in_range(&habit, date(2025, 12, 1), date(2025, 12, 31)).unwrap();
    assert_eq!(dates, vec![date(2025, 12, 10), date(2025, 12, 20)]);
}

#[test]
fn occurrences_respect_start_and_end_dates() {
    let mut habit = make_habit("h1", "Course");
    habit.start_date = date(2025, 12, 10);
    habit.end_date = Some(date(2025, 12, 12));
    let dates = occurrences_in_range(&habit, date(2025, 12, 1), date(2025, 12, 31)).unwrap();
    assert_eq!(
        dates,
        vec![date(2025, 12, 10), date(2025, 12, 11), date(2025, 12, 12)]
    );
}

#[test]
fn window_entirely_before_start_date_is_empty() {
    let mut habit = make_habit("h1", "Future");
    habit.start_date = date(2026, 6, 1);
    let dates = occurrences_in_range(&habit, date(2025, 12, 1), date(2025, 12, 31)).unwrap();
    assert!(dates.is_empty());
}

#[test]
fn zero_interval_is_rejected() {
    let mut habit = make_habit("h1", "Broken");
    habit.recurrence_interval = 0;
    assert!(occurrences_in_range(&habit, date(2025, 12, 1), date(2025, 12, 31)).is_err());
}
