use crate::error::Result;
use crate::models::{Shift, ShiftDefinition, TimeOfDay, MINUTES_PER_DAY};
use crate::schedule::window::cyclic_contains;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Ordered, cyclic shift schedule plus the locally configured own shift.
///
/// Shift order is the definition order. Gaps and overlaps between shifts are
/// accepted as they are; overlapping shifts resolve to the later definition.
#[derive(Debug, Clone)]
pub struct ShiftSchedule {
    shifts: Vec<Shift>,
    own_shift: String,
    /// Reference time for calculations (defaults to now, but can be overridden for testing)
    reference_time: Option<DateTime<Utc>>,
}

/// Plain-data summary of where the schedule currently stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftStatus {
    pub current: Option<Shift>,
    pub next: Option<Shift>,
    pub own: Option<Shift>,
    pub minutes_until_next: Option<u16>,
}

impl ShiftSchedule {
    pub fn new(shifts: Vec<Shift>, own_shift: impl Into<String>) -> Self {
        Self {
            shifts,
            own_shift: own_shift.into(),
            reference_time: None,
        }
    }

    /// Build from the `HH:MM` definitions of the configuration file
    pub fn from_definitions(definitions: &[ShiftDefinition], own_shift: &str) -> Result<Self> {
        let shifts = definitions
            .iter()
            .map(ShiftDefinition::to_shift)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            shifts = shifts.len(),
            overnight = shifts.iter().filter(|s| s.wraps_midnight()).count(),
            own_shift,
            "Loaded shift schedule"
        );
        Ok(Self::new(shifts, own_shift))
    }

    /// Pin the clock (useful for testing)
    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    pub fn own_shift_name(&self) -> &str {
        &self.own_shift
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Index of the shift active at the given minute of the day.
    ///
    /// All shifts are scanned and the last match wins.
    pub fn active_index_at_minute(&self, minute: TimeOfDay) -> Option<usize> {
        let mut active = None;
        for (i, shift) in self.shifts.iter().enumerate() {
            if cyclic_contains(shift.start, shift.end, minute) {
                active = Some(i);
            }
        }
        active
    }

    pub fn active_shift_at_minute(&self, minute: TimeOfDay) -> Option<&Shift> {
        self.active_index_at_minute(minute).map(|i| &self.shifts[i])
    }

    /// Shift active at an arbitrary instant, judged by its UTC minute of day
    pub fn active_shift_at(&self, instant: &DateTime<Utc>) -> Option<&Shift> {
        self.active_shift_at_minute(TimeOfDay::of_instant(instant))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.active_index_at_minute(TimeOfDay::of_instant(&self.now()))
    }

    pub fn current_shift(&self) -> Option<&Shift> {
        self.current_index().map(|i| &self.shifts[i])
    }

    /// Minutes from now until `shifts[index mod len]` starts.
    ///
    /// Never negative: a start earlier in the day than now refers to tomorrow's start.
    /// Returns `None` for an empty schedule.
    pub fn minutes_until(&self, index: usize) -> Option<u16> {
        if self.shifts.is_empty() {
            return None;
        }
        let target = &self.shifts[index % self.shifts.len()];
        let now = TimeOfDay::of_instant(&self.now());

        let mut delta = target.start.minutes() as i32 - now.minutes() as i32;
        if delta < 0 {
            delta += MINUTES_PER_DAY as i32;
        }
        Some(delta as u16)
    }

    /// Shift following `index` in definition order, wrapping around
    pub fn next_shift(&self, index: usize) -> Option<&Shift> {
        if self.shifts.is_empty() {
            return None;
        }
        Some(&self.shifts[(index + 1) % self.shifts.len()])
    }

    /// Index of the configured own shift; `None` means "not configured yet"
    pub fn resolve_own_shift_index(&self) -> Option<usize> {
        self.shifts.iter().position(|shift| shift.name == self.own_shift)
    }

    pub fn own_shift(&self) -> Option<&Shift> {
        self.resolve_own_shift_index().map(|i| &self.shifts[i])
    }

    /// Resolve a user-typed shift name: the full name or its last word, last match wins
    pub fn find_by_name_or_alias(&self, name: &str) -> Option<&Shift> {
        self.shifts
            .iter()
            .rev()
            .find(|shift| shift.name == name || shift.alias() == name)
    }

    /// Guess the shift of someone living at the given UTC offset (in minutes).
    ///
    /// The local midday is projected to UTC and looked up; this is a default for new
    /// users, not an authoritative answer.
    pub fn probable_shift_for_local_offset(&self, utc_offset_minutes: i32) -> Option<&Shift> {
        let midday = midday_in_utc(utc_offset_minutes);
        debug!(
            utc_offset_minutes,
            midday_in_utc = %midday,
            "Guessing own shift from local offset"
        );
        self.active_shift_at_minute(midday)
    }

    /// Current, next and own shift in one go
    pub fn status(&self) -> ShiftStatus {
        let current_index = self.current_index();
        ShiftStatus {
            current: current_index.map(|i| self.shifts[i].clone()),
            next: current_index.and_then(|i| self.next_shift(i).cloned()),
            own: self.own_shift().cloned(),
            minutes_until_next: current_index.and_then(|i| self.minutes_until(i + 1)),
        }
    }
}

fn midday_in_utc(utc_offset_minutes: i32) -> TimeOfDay {
    let day = MINUTES_PER_DAY as i64;
    let offset = utc_offset_minutes as i64;
    if offset > 0 {
        TimeOfDay::wrapping((36 * 60 - offset) % day)
    } else {
        TimeOfDay::wrapping((12 * 60 + offset.abs()) % day)
    }
}
