use chrono::{Datelike, NaiveDate, Weekday};

/// Sunday-based weekday index (Sun = 0 .. Sat = 6), the ordering used by the
/// weekly availability maps.
pub trait WeekdayExt {
    fn sunday_index(self) -> u8;
}

impl WeekdayExt for Weekday {
    fn sunday_index(self) -> u8 {
        self.num_days_from_sunday() as u8
    }
}

/// Last day of the given month, accounting for leap years.
pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Same day-of-month `months` months after `date`, clamped to the end of a
/// shorter target month (Jan 31 + 1 month = Feb 28).
pub fn add_months_clamped(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.month0() + months;
    let year = date.year() + (zero_based / 12) as i32;
    let month = zero_based % 12 + 1;
    let day = date.day().min(last_day_of_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or(date)
}

/// Same month/day `years` years after `date`; Feb 29 clamps to Feb 28 in
/// non-leap target years.
pub fn add_years_clamped(date: NaiveDate, years: u32) -> NaiveDate {
    let year = date.year() + years as i32;
    let day = date.day().min(last_day_of_month(year, date.month()));
    NaiveDate::from_ymd_opt(year, date.month(), day)
        .unwrap_or(date)
}
