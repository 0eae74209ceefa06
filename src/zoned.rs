//! Wall-clock <-> UTC conversion for a named IANA timezone.
//!
//! Every conversion goes through the zone database, never through the host
//! process's local timezone; server processes commonly run in UTC and must
//! produce identical results regardless.

use chrono::offset::LocalResult;
use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

use crate::errors::{Error, Result};
use crate::extensions::chrono::WeekdayExt;

/// Minute-precision wall-clock fields in some (externally known) timezone.
/// The engine schedules on a 15-minute grid, so seconds never matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl WallClock {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
        }
    }

    pub fn on_date(date: NaiveDate, hour: u32, minute: u32) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            hour,
            minute,
        }
    }
}

/// Resolve a workspace timezone string against the IANA database.
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| Error::invalid_timezone(name))
}

/// Interpret wall-clock fields in `tz` and return the UTC instant.
///
/// DST handling: an ambiguous local time (clocks rolled back) resolves to the
/// earlier instant; a non-existent local time (clocks sprung forward) rolls
/// forward in 30-minute steps, bounded, until the zone can represent it.
pub fn to_utc_instant(parts: WallClock, tz: Tz) -> Result<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(parts.year, parts.month, parts.day).ok_or_else(|| {
        Error::validation(format!(
            "Invalid calendar date {:04}-{:02}-{:02}",
            parts.year, parts.month, parts.day
        ))
    })?;
    let time = NaiveTime::from_hms_opt(parts.hour, parts.minute, 0).ok_or_else(|| {
        Error::validation(format!(
            "Invalid wall-clock time {:02}:{:02}",
            parts.hour, parts.minute
        ))
    })?;
    local_to_utc(date.and_time(time), tz)
}

fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>> {
    let mut candidate = naive;
    // Bounded correction: the widest real spring-forward gap is well under
    // the 4 hours this loop can cover.
    for _ in 0..8 {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return Ok(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earlier, _) => return Ok(earlier.with_timezone(&Utc)),
            LocalResult::None => candidate = candidate + Duration::minutes(30),
        }
    }
    Err(Error::validation(format!(
        "Wall-clock time {naive} cannot be represented in {tz}"
    )))
}

/// Wall-clock fields of `instant` as seen in `tz`.
pub fn to_zoned_parts(instant: DateTime<Utc>, tz: Tz) -> WallClock {
    let local = instant.with_timezone(&tz);
    WallClock {
        year: local.year(),
        month: local.month(),
        day: local.day(),
        hour: local.hour(),
        minute: local.minute(),
    }
}

/// Weekday of `instant` in `tz`, Sunday-based (Sun = 0 .. Sat = 6).
pub fn weekday_of(instant: DateTime<Utc>, tz: Tz) -> u8 {
    instant.with_timezone(&tz).weekday().sunday_index()
}

/// Calendar date of `instant` in `tz`. This, not the UTC date, is the date
/// used for habit dedup keys.
pub fn local_date_of(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// The instant at which `instant`'s local calendar day begins in `tz`.
pub fn start_of_zoned_day(instant: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>> {
    let date = local_date_of(instant, tz);
    // Midnight itself can fall into a DST gap (it has, in America/Sao_Paulo);
    // local_to_utc rolls forward to the first representable time.
    local_to_utc(date.and_time(NaiveTime::MIN), tz)
}

/// Step `n` local calendar days from `instant`, preserving the wall-clock
/// time of day. Days across a DST transition are 23 or 25 hours long.
pub fn add_zoned_days(instant: DateTime<Utc>, tz: Tz, n: i64) -> Result<DateTime<Utc>> {
    let local = instant.with_timezone(&tz);
    let shifted_date = local
        .date_naive()
        .checked_add_signed(Duration::days(n))
        .ok_or_else(|| Error::validation(format!("Date overflow stepping {n} days")))?;
    local_to_utc(shifted_date.and_time(local.time()), tz)
}
