use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

use crate::core::availability::AvailabilitySet;
use crate::core::types::{BlockTime, HourCategory, Interval, Priority, TimePreference};
use crate::errors::Result;
use crate::zoned::{self, WallClock};

/// Everything lands on a 15-minute grid.
pub const GRID_MINUTES: i64 = 15;

// ============================================================================
// Grid rounding
// ============================================================================

/// Nearest grid boundary; seconds are discarded before rounding.
pub fn round_to_grid(instant: DateTime<Utc>) -> DateTime<Utc> {
    let minute = instant.minute() as i64;
    let rounded = (minute * 2 + GRID_MINUTES) / (GRID_MINUTES * 2) * GRID_MINUTES;
    floor_to_hour(instant) + Duration::minutes(rounded)
}

/// Next grid boundary at or after the instant; seconds are discarded.
pub fn ceil_to_grid(instant: DateTime<Utc>) -> DateTime<Utc> {
    let minute = instant.minute() as i64;
    let rounded = (minute + GRID_MINUTES - 1) / GRID_MINUTES * GRID_MINUTES;
    floor_to_hour(instant) + Duration::minutes(rounded)
}

fn floor_to_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        - Duration::minutes(instant.minute() as i64)
        - Duration::seconds(instant.second() as i64)
        - Duration::nanoseconds(instant.nanosecond() as i64)
}

// ============================================================================
// Occupancy
// ============================================================================

/// Who holds a blocked interval. Locked covers both user-locked events and
/// anything else the engine must never touch (in-progress, unlinked).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOwner {
    Locked,
    HabitEvent { habit_id: String },
    TaskEvent { task_id: String },
}

#[derive(Debug, Clone)]
pub struct OccupiedSlot {
    pub event_id: String,
    pub interval: Interval,
    pub owner: SlotOwner,
    pub priority: Priority,
}

/// The set of intervals that cannot be double-booked, updated as the run
/// places events. Insertion order is preserved so runs stay deterministic.
#[derive(Debug, Default)]
pub struct Occupancy {
    slots: Vec<OccupiedSlot>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(
        &mut self,
        event_id: impl Into<String>,
        interval: Interval,
        owner: SlotOwner,
        priority: Priority,
    ) {
        self.slots.push(OccupiedSlot {
            event_id: event_id.into(),
            interval,
            owner,
            priority,
        });
    }

    pub fn remove(&mut self, event_id: &str) {
        self.slots.retain(|s| s.event_id != event_id);
    }

    pub fn has_conflict(&self, interval: &Interval) -> bool {
        self.slots.iter().any(|s| s.interval.overlaps(interval))
    }

    /// Blocked intervals overlapping `window`, ordered by start.
    pub fn conflicts_in(&self, window: &Interval) -> Vec<&OccupiedSlot> {
        let mut conflicts: Vec<&OccupiedSlot> = self
            .slots
            .iter()
            .filter(|s| s.interval.overlaps(window))
            .collect();
        conflicts.sort_by_key(|s| (s.interval.start, s.interval.end));
        conflicts
    }

    /// Events a task of `bumper` priority may evict: habit- or task-owned,
    /// starting before `before`, strictly lower priority, and not currently
    /// in progress. Locked slots are never candidates. The caller applies
    /// any owner-specific rules (task victims also need a later deadline).
    pub fn bumpable_events(
        &self,
        bumper: Priority,
        before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<OccupiedSlot> {
        self.slots
            .iter()
            .filter(|s| {
                !matches!(s.owner, SlotOwner::Locked)
                    && s.interval.start < before
                    && !s.interval.contains_instant(now)
                    && bumper < s.priority
            })
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OccupiedSlot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ============================================================================
// Free slots
// ============================================================================

/// A gap of free capacity inside one availability window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FreeSlot {
    pub fn available_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Free capacity for one local day in one category: the day's availability
/// windows minus every blocked interval, keeping gaps of at least
/// `min_minutes`.
pub fn free_slots_in_day(
    availability: &AvailabilitySet,
    category: HourCategory,
    date: NaiveDate,
    occupancy: &Occupancy,
    min_minutes: i64,
    tz: Tz,
) -> Result<Vec<FreeSlot>> {
    let windows = availability.day_windows(date, category, tz)?;
    let mut slots = Vec::new();

    for window in windows {
        let conflicts = occupancy.conflicts_in(&window);

        let mut cursor = window.start;
        for conflict in &conflicts {
            if conflict.interval.start > cursor {
                push_gap(&mut slots, cursor, conflict.interval.start, min_minutes);
            }
            cursor = cursor.max(conflict.interval.end);
        }
        if cursor < window.end {
            push_gap(&mut slots, cursor, window.end, min_minutes);
        }
    }

    Ok(slots)
}

fn push_gap(
    slots: &mut Vec<FreeSlot>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    min_minutes: i64,
) {
    let slot = FreeSlot { start, end };
    if slot.available_minutes() >= min_minutes.max(1) {
        slots.push(slot);
    }
}

/// Drop slots that lie in the past and clip partially-past slots to the
/// present, nudged onto the grid with a small lead so placements are never
/// already behind the clock by the time they land. Sorted by start.
pub fn clip_to_future(slots: &[FreeSlot], now: DateTime<Utc>) -> Vec<FreeSlot> {
    let horizon = round_to_grid(now + Duration::minutes(GRID_MINUTES - 1));

    let mut result: Vec<FreeSlot> = slots
        .iter()
        .filter(|slot| slot.end > horizon)
        .map(|slot| {
            if slot.start < horizon {
                FreeSlot {
                    start: horizon,
                    end: slot.end,
                }
            } else {
                *slot
            }
        })
        .filter(|slot| slot.available_minutes() > 0)
        .collect();

    result.sort_by_key(|slot| slot.start);
    result
}

// ============================================================================
// Duration negotiation
// ============================================================================

/// Effective duration bounds for a habit. Missing bounds derive from the
/// preferred duration: min is half of it (never under 15), max is one and a
/// half times it (never over 180).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationBounds {
    pub preferred: i64,
    pub min: i64,
    pub max: i64,
}

impl DurationBounds {
    pub fn effective(preferred: i64, min: Option<i64>, max: Option<i64>) -> Self {
        let min = min.unwrap_or_else(|| (preferred / 2).max(15));
        let max = max.unwrap_or_else(|| (((preferred * 3) + 1) / 2).min(180));
        Self {
            preferred,
            min,
            max,
        }
    }
}

/// How a slot relates to a habit's timing wishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotFit {
    pub matches_ideal_time: bool,
    pub matches_preference: bool,
}

/// Negotiated duration for a habit in a slot. A slot that contains the ideal
/// time earns the maximum duration; otherwise the preferred duration is used,
/// shrunk to whatever the slot holds as long as it stays at or above the
/// minimum. Returns 0 when even the minimum does not fit.
pub fn optimal_duration(bounds: &DurationBounds, available: i64, fit: &SlotFit) -> i64 {
    if available < bounds.min {
        return 0;
    }
    if fit.matches_ideal_time {
        bounds.max.min(available)
    } else {
        bounds.preferred.min(available)
    }
}

// ============================================================================
// Habit slot choice
// ============================================================================

fn local_minutes(instant: DateTime<Utc>, tz: Tz) -> i64 {
    let parts = zoned::to_zoned_parts(instant, tz);
    (parts.hour * 60 + parts.minute) as i64
}

fn local_hour(instant: DateTime<Utc>, tz: Tz) -> i64 {
    zoned::to_zoned_parts(instant, tz).hour as i64
}

/// Wall-clock circular distance in minutes, so 23:30 is 60 away from 00:30.
fn circular_distance(a: i64, b: i64) -> i64 {
    let diff = (a - b).abs();
    diff.min(24 * 60 - diff)
}

/// The UTC instant of `time` on the local date that `slot` starts on.
fn instant_at(slot: &FreeSlot, time: BlockTime, tz: Tz) -> Option<DateTime<Utc>> {
    let date = zoned::local_date_of(slot.start, tz);
    let parts = WallClock::on_date(date, time.hour(), time.minute());
    zoned::to_utc_instant(parts, tz).ok()
}

/// Whether the ideal wall-clock time plus the requested duration fits wholly
/// inside the slot.
pub fn ideal_fits_in_slot(ideal: BlockTime, duration: i64, slot: &FreeSlot, tz: Tz) -> bool {
    match instant_at(slot, ideal, tz) {
        Some(target) => {
            target >= slot.start && target + Duration::minutes(duration) <= slot.end
        }
        None => false,
    }
}

/// Whether the slot's local start hour falls inside the preference's range.
pub fn slot_matches_preference(preference: TimePreference, slot: &FreeSlot, tz: Tz) -> bool {
    let (range_start, range_end) = preference.hour_range();
    let hour = local_hour(slot.start, tz);
    hour >= range_start as i64 && hour < range_end as i64
}

pub fn characterize_slot(
    ideal: Option<BlockTime>,
    preference: Option<TimePreference>,
    duration: i64,
    slot: &FreeSlot,
    tz: Tz,
) -> SlotFit {
    SlotFit {
        matches_ideal_time: ideal
            .map(|t| ideal_fits_in_slot(t, duration, slot, tz))
            .unwrap_or(false),
        matches_preference: preference
            .map(|p| slot_matches_preference(p, slot, tz))
            .unwrap_or(false),
    }
}

/// Score for a habit with no timing wishes: reward slots that hold the full
/// preferred duration and pull toward the middle of the day, so unpinned
/// habits spread out instead of stacking at the start of availability.
fn score_unpinned_slot(bounds: &DurationBounds, slot: &FreeSlot, tz: Tz) -> f64 {
    let fits_preferred = if slot.available_minutes() >= bounds.preferred {
        200.0
    } else {
        0.0
    };
    let noon_distance = (local_hour(slot.start, tz) - 12).abs() as f64;
    fits_preferred - noon_distance * 0.5
}

/// Rank candidate slots for a habit with an ideal time or preference,
/// closest wall-clock match first. Falls back gradually: slots containing
/// the ideal time, then slots within three hours of it, then everything.
pub fn rank_slots_by_preference(
    slots: &[FreeSlot],
    ideal: Option<BlockTime>,
    preference: Option<TimePreference>,
    duration: i64,
    tz: Tz,
) -> Vec<FreeSlot> {
    if ideal.is_none() && preference.is_none() {
        return slots.to_vec();
    }

    let distance = |slot: &FreeSlot| -> i64 {
        let start_minutes = local_minutes(slot.start, tz);
        if let Some(t) = ideal {
            circular_distance(start_minutes, t.minutes())
        } else if let Some(p) = preference {
            (start_minutes - p.center_minutes()).abs()
        } else {
            0
        }
    };

    let sorted_by_distance = |mut v: Vec<FreeSlot>| -> Vec<FreeSlot> {
        v.sort_by_key(distance);
        v
    };

    if let Some(t) = ideal {
        let containing: Vec<FreeSlot> = slots
            .iter()
            .copied()
            .filter(|s| ideal_fits_in_slot(t, duration, s, tz))
            .collect();
        if !containing.is_empty() {
            return sorted_by_distance(containing);
        }

        let ideal_hour = t.minutes() / 60;
        let near: Vec<FreeSlot> = slots
            .iter()
            .copied()
            .filter(|s| {
                let diff = (local_hour(s.start, tz) - ideal_hour).abs();
                diff.min(24 - diff) <= 3
            })
            .collect();
        if !near.is_empty() {
            return sorted_by_distance(near);
        }
    } else if let Some(p) = preference {
        let in_range: Vec<FreeSlot> = slots
            .iter()
            .copied()
            .filter(|s| slot_matches_preference(p, s, tz))
            .collect();
        if !in_range.is_empty() {
            return sorted_by_distance(in_range);
        }
    }

    sorted_by_distance(slots.to_vec())
}

/// Pick the slot a habit occurrence should use. Pinned habits take the
/// closest viable match to their wall-clock wish; unpinned habits take the
/// best-scoring viable slot. Ties resolve to the earlier slot.
pub fn best_slot_for_habit(
    bounds: &DurationBounds,
    ideal: Option<BlockTime>,
    preference: Option<TimePreference>,
    slots: &[FreeSlot],
    tz: Tz,
) -> Option<FreeSlot> {
    if ideal.is_some() || preference.is_some() {
        let ranked = rank_slots_by_preference(slots, ideal, preference, bounds.preferred, tz);
        return ranked
            .into_iter()
            .find(|s| s.available_minutes() >= bounds.min);
    }

    let mut best: Option<(f64, FreeSlot)> = None;
    for slot in slots {
        if slot.available_minutes() < bounds.min {
            continue;
        }
        let score = score_unpinned_slot(bounds, slot, tz);
        match &best {
            Some((best_score, _)) if score <= *best_score => {}
            _ => best = Some((score, *slot)),
        }
    }
    best.map(|(_, slot)| slot)
}

/// Start instant for a habit inside its chosen slot: the exact ideal time
/// when it fits, else the preference's anchor hour, else noon; always clamped
/// into the slot, never before `now`, and snapped up to the grid.
pub fn ideal_start_in_slot(
    ideal: Option<BlockTime>,
    preference: Option<TimePreference>,
    slot: &FreeSlot,
    duration: i64,
    now: DateTime<Utc>,
    tz: Tz,
) -> DateTime<Utc> {
    let latest_start = slot.end - Duration::minutes(duration);

    let mut candidate = None;
    if let Some(t) = ideal {
        if ideal_fits_in_slot(t, duration, slot, tz) {
            candidate = instant_at(slot, t, tz);
        }
    }
    if candidate.is_none() {
        let aim_hour = preference.map(|p| p.anchor_hour()).unwrap_or(12);
        let aim = BlockTime::new(aim_hour, 0)
            .ok()
            .and_then(|t| instant_at(slot, t, tz))
            .unwrap_or(slot.start);
        candidate = Some(aim.clamp(slot.start, latest_start.max(slot.start)));
    }

    let start = candidate.unwrap_or(slot.start).max(now);
    ceil_to_grid(start)
}

// ============================================================================
// Task chunk placement
// ============================================================================

/// One placed chunk of task work.
#[derive(Debug, Clone, Copy)]
pub struct TaskChunk {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub minutes: i64,
}

/// Earliest-fit chunk placement for tasks. Takes the first slot that holds a
/// minimum chunk, sizes the chunk between the split bounds (the final
/// fragment may run short), consumes the slot, and returns the leftover tail
/// to the pool when it can still hold another minimum chunk.
pub fn take_task_chunk(
    slots: &mut Vec<FreeSlot>,
    remaining: i64,
    min_chunk: i64,
    max_chunk: i64,
    occupancy: &Occupancy,
) -> Option<TaskChunk> {
    while let Some(pos) = slots
        .iter()
        .position(|s| s.available_minutes() >= min_chunk)
    {
        let slot = slots.remove(pos);
        let start = ceil_to_grid(slot.start);
        let available = (slot.end - start).num_minutes();

        let desired = if remaining <= min_chunk {
            remaining
        } else {
            min_chunk.max(remaining.min(max_chunk))
        };
        let minutes = desired.min(available);

        if minutes <= 0 || (minutes < min_chunk && minutes < remaining) {
            continue;
        }

        let end = start + Duration::minutes(minutes);
        let chunk_interval = Interval { start, end };
        if occupancy.has_conflict(&chunk_interval) {
            continue;
        }

        // Return the unused tail of the slot to the pool.
        let tail = FreeSlot {
            start: end,
            end: slot.end,
        };
        if tail.available_minutes() >= min_chunk {
            let insert_at = slots
                .iter()
                .position(|s| s.start > tail.start)
                .unwrap_or(slots.len());
            slots.insert(insert_at, tail);
        }

        return Some(TaskChunk {
            start,
            end,
            minutes,
        });
    }
    None
}
