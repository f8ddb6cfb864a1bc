//! Half-open time intervals over UTC instants.
//!
//! An [`Interval`] is `[start, end)` with `start < end` enforced at
//! construction. Once a value exists, every downstream computation may rely
//! on a strictly positive duration. Deserialization goes through the same
//! smart constructor, so malformed JSON cannot produce an invalid interval.

use std::fmt;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};

/// An unambiguous UTC point in time.
///
/// Serializes as an RFC 3339 string (`2026-03-15T14:00:00Z`).
pub type Instant = DateTime<Utc>;

/// A half-open `[start, end)` span of instants with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: Instant,
    end: Instant,
}

#[derive(Deserialize)]
struct RawInterval {
    start: Instant,
    end: Instant,
}

impl TryFrom<RawInterval> for Interval {
    type Error = SchedulingError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        Interval::new(raw.start, raw.end)
    }
}

impl Interval {
    /// Build an interval, rejecting zero or negative durations.
    pub fn new(start: Instant, end: Instant) -> Result<Self> {
        if end <= start {
            return Err(SchedulingError::InvalidInterval(format!(
                "end {} must be after start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Build an interval from a start and a positive duration.
    pub fn starting_at(start: Instant, duration: Duration) -> Result<Self> {
        let end = start.checked_add_signed(duration).ok_or_else(|| {
            SchedulingError::InvalidInterval(format!(
                "{} plus {duration} is out of range",
                start.to_rfc3339()
            ))
        })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `instant` lies inside `[start, end)`.
    pub fn contains_instant(&self, instant: Instant) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whether `self` fully covers `other` (shared edges included).
    pub fn covers(&self, other: &Interval) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// Whether the two intervals share at least one instant.
    ///
    /// Touching intervals (`a.end == b.start`) do not intersect.
    pub fn intersects(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The common part of two intervals, if any.
    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Interval { start, end })
    }

    /// The empty space between two non-intersecting intervals.
    ///
    /// Returns `None` when they intersect; a zero duration when they touch.
    pub fn gap_to(&self, other: &Interval) -> Option<Duration> {
        if self.intersects(other) {
            return None;
        }
        if self.end <= other.start {
            Some(other.start - self.end)
        } else {
            Some(self.start - other.end)
        }
    }

    /// The same interval with a different end.
    pub fn with_end(&self, end: Instant) -> Result<Interval> {
        Interval::new(self.start, end)
    }

    /// The same interval moved by `offset`.
    pub fn shifted(&self, offset: Duration) -> Interval {
        Interval {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Sort and coalesce overlapping or touching intervals.
///
/// Duplicate and overlapping entries collapse into one exclusion region.
pub fn merge_intervals(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                if interval.end > last.end {
                    last.end = interval.end;
                }
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// A wall-clock window within a single local day, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTimeOfDayRange")]
pub struct TimeOfDayRange {
    start: NaiveTime,
    end: NaiveTime,
}

/// One bookable window in a weekly availability pattern.
pub type TimeSlot = TimeOfDayRange;

#[derive(Deserialize)]
struct RawTimeOfDayRange {
    start: NaiveTime,
    end: NaiveTime,
}

impl TryFrom<RawTimeOfDayRange> for TimeOfDayRange {
    type Error = SchedulingError;

    fn try_from(raw: RawTimeOfDayRange) -> Result<Self> {
        TimeOfDayRange::new(raw.start, raw.end)
    }
}

impl TimeOfDayRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(SchedulingError::InvalidTimeOfDay(format!(
                "end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Build from `(hour, minute)` pairs.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Result<Self> {
        let parse = |(h, m): (u32, u32)| {
            NaiveTime::from_hms_opt(h, m, 0).ok_or_else(|| {
                SchedulingError::InvalidTimeOfDay(format!("{h:02}:{m:02} is not a valid time"))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeOfDayRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}
