//! Weekly working-hours patterns.
//!
//! A [`WeeklyAvailabilityPattern`] maps each weekday to an ordered list of
//! non-overlapping [`TimeSlot`]s. Some stored clinician records still use a
//! flat column scheme (`start_tuesday_1`, `end_tuesday_1`, ...);
//! [`WeeklyAvailabilityPattern::from_legacy_columns`] converts those once,
//! at the boundary.

use std::collections::BTreeMap;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SchedulingError};
use crate::interval::{TimeOfDayRange, TimeSlot};

/// Bookable windows per weekday.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawWeeklyAvailability", into = "RawWeeklyAvailability")]
pub struct WeeklyAvailabilityPattern {
    days: [Vec<TimeSlot>; 7],
}

#[derive(Serialize, Deserialize)]
struct RawWeeklyAvailability(Vec<(Weekday, Vec<TimeSlot>)>);

impl TryFrom<RawWeeklyAvailability> for WeeklyAvailabilityPattern {
    type Error = SchedulingError;

    fn try_from(raw: RawWeeklyAvailability) -> Result<Self> {
        let mut pattern = WeeklyAvailabilityPattern::default();
        for (day, slots) in raw.0 {
            for slot in slots {
                pattern.add_slot(day, slot)?;
            }
        }
        Ok(pattern)
    }
}

impl From<WeeklyAvailabilityPattern> for RawWeeklyAvailability {
    fn from(pattern: WeeklyAvailabilityPattern) -> Self {
        RawWeeklyAvailability(
            ALL_DAYS
                .iter()
                .filter(|day| !pattern.slots(**day).is_empty())
                .map(|day| (*day, pattern.slots(*day).to_vec()))
                .collect(),
        )
    }
}

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl WeeklyAvailabilityPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// The same window on every listed day.
    pub fn uniform(days: impl IntoIterator<Item = Weekday>, slot: TimeSlot) -> Self {
        let mut pattern = Self::default();
        for day in days {
            // A single slot per day cannot overlap anything.
            pattern.days[index(day)] = vec![slot];
        }
        pattern
    }

    /// Add a slot, keeping the day's list sorted.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::InvalidAvailability`] if the slot overlaps
    /// an existing slot on the same day.
    pub fn add_slot(&mut self, day: Weekday, slot: TimeSlot) -> Result<()> {
        let slots = &mut self.days[index(day)];
        if let Some(existing) = slots.iter().find(|s| s.overlaps(&slot)) {
            return Err(SchedulingError::InvalidAvailability(format!(
                "{day}: {}-{} overlaps {}-{}",
                slot.start(),
                slot.end(),
                existing.start(),
                existing.end()
            )));
        }
        let at = slots.partition_point(|s| s.start() < slot.start());
        slots.insert(at, slot);
        Ok(())
    }

    pub fn with_slot(mut self, day: Weekday, slot: TimeSlot) -> Result<Self> {
        self.add_slot(day, slot)?;
        Ok(self)
    }

    /// The ordered slots for `day`.
    pub fn slots(&self, day: Weekday) -> &[TimeSlot] {
        &self.days[index(day)]
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    /// Convert the legacy flat column layout.
    ///
    /// Recognized keys are `start_<weekday>_<n>` and `end_<weekday>_<n>`
    /// with `HH:MM` or `HH:MM:SS` string values. Null or empty values mark
    /// an unused slot; all other keys are ignored.
    pub fn from_legacy_columns(record: &Map<String, Value>) -> Result<Self> {
        let mut starts: BTreeMap<(u32, u32), NaiveTime> = BTreeMap::new();
        let mut ends: BTreeMap<(u32, u32), NaiveTime> = BTreeMap::new();

        for (key, value) in record {
            let Some((is_start, day, n)) = parse_legacy_key(key) else {
                continue;
            };
            let Some(time) = parse_legacy_time(key, value)? else {
                continue;
            };
            let slot_key = (day.num_days_from_monday(), n);
            if is_start {
                starts.insert(slot_key, time);
            } else {
                ends.insert(slot_key, time);
            }
        }

        let mut pattern = Self::default();
        for (slot_key, start) in &starts {
            let day = ALL_DAYS[slot_key.0 as usize];
            let end = ends.remove(slot_key).ok_or_else(|| {
                SchedulingError::InvalidAvailability(format!(
                    "slot {} on {day} has a start but no end",
                    slot_key.1
                ))
            })?;
            let slot = TimeOfDayRange::new(*start, end)
                .map_err(|e| SchedulingError::InvalidAvailability(e.to_string()))?;
            pattern.add_slot(day, slot)?;
        }
        if let Some(((day, n), _)) = ends.into_iter().next() {
            return Err(SchedulingError::InvalidAvailability(format!(
                "slot {n} on {} has an end but no start",
                ALL_DAYS[day as usize]
            )));
        }
        Ok(pattern)
    }
}

fn index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

fn parse_legacy_key(key: &str) -> Option<(bool, Weekday, u32)> {
    let mut parts = key.split('_');
    let is_start = match parts.next()? {
        "start" => true,
        "end" => false,
        _ => return None,
    };
    let day = parts.next()?.parse::<Weekday>().ok()?;
    let n = parts.next()?.parse::<u32>().ok()?;
    parts.next().is_none().then_some((is_start, day, n))
}

fn parse_legacy_time(key: &str, value: &Value) -> Result<Option<NaiveTime>> {
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim(),
        other => {
            return Err(SchedulingError::InvalidAvailability(format!(
                "{key}: expected a time string, got {other}"
            )))
        }
    };
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map(Some)
        .map_err(|_| SchedulingError::InvalidAvailability(format!("{key}: '{text}' is not a time")))
}

/// Where bookable windows come from for a given local day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessHours {
    /// The same window every day.
    Daily(TimeOfDayRange),
    /// Per-weekday windows; days without slots are closed.
    Weekly(WeeklyAvailabilityPattern),
}

impl BusinessHours {
    /// The ordered windows open on `day`.
    pub fn windows(&self, day: Weekday) -> &[TimeOfDayRange] {
        match self {
            BusinessHours::Daily(range) => std::slice::from_ref(range),
            BusinessHours::Weekly(pattern) => pattern.slots(day),
        }
    }
}

impl From<TimeOfDayRange> for BusinessHours {
    fn from(range: TimeOfDayRange) -> Self {
        BusinessHours::Daily(range)
    }
}

impl From<WeeklyAvailabilityPattern> for BusinessHours {
    fn from(pattern: WeeklyAvailabilityPattern) -> Self {
        BusinessHours::Weekly(pattern)
    }
}
