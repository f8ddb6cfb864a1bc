//! Expand recurring appointments into concrete occurrence intervals.
//!
//! Patterns are turned into RFC 5545 rules and expanded with the `rrule`
//! crate in the appointment's display zone, so every occurrence keeps the
//! series' local wall-clock start across DST changes. A wall-clock start
//! repeated by a fall-back transition maps to its earlier instant, and one
//! skipped by spring-forward is shifted by the length of the gap, matching
//! [`to_instant`](crate::timezone::to_instant). Each occurrence lasts
//! exactly as long as the original appointment.
//!
//! Expansion is always bounded by a horizon, even for `EndCondition::Never`,
//! and additionally by an occurrence cap. Hitting the cap truncates the
//! result rather than failing.

use std::num::NonZeroU32;

use chrono::{Datelike, Duration, Timelike, Utc, Weekday};
use rrule::{Frequency as RuleFrequency, NWeekday, RRule, RRuleSet, Tz as RuleTz};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::appointment::Appointment;
use crate::error::{Result, SchedulingError};
use crate::interval::{Instant, Interval};
use crate::timezone::{to_instant, to_local, WallClock, ZoneId};

/// Occurrence cap used by [`expand`].
pub const DEFAULT_MAX_OCCURRENCES: u16 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EndCondition {
    Never,
    /// Last allowed start, inclusive.
    OnDate(Instant),
    AfterOccurrences(NonZeroU32),
}

/// A set of weekdays, iterated Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    const ORDER: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        Self::ORDER.into_iter().filter(|day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = WeekdaySet::default();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let days = Vec::<Weekday>::deserialize(deserializer)?;
        Ok(days.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: NonZeroU32,
    /// For weekly patterns; the appointment's own weekday when absent.
    #[serde(default)]
    pub days_of_week: Option<WeekdaySet>,
    /// For monthly patterns, 1..=31. Months without that day are skipped.
    #[serde(default)]
    pub day_of_month: Option<u8>,
    #[serde(default = "default_end")]
    pub end: EndCondition,
}

fn default_interval() -> NonZeroU32 {
    NonZeroU32::MIN
}

fn default_end() -> EndCondition {
    EndCondition::Never
}

impl RecurrencePattern {
    pub fn weekly(days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            frequency: Frequency::Weekly,
            interval: NonZeroU32::MIN,
            days_of_week: Some(days.into_iter().collect()),
            day_of_month: None,
            end: EndCondition::Never,
        }
    }

    pub fn daily() -> Self {
        Self {
            frequency: Frequency::Daily,
            interval: NonZeroU32::MIN,
            days_of_week: None,
            day_of_month: None,
            end: EndCondition::Never,
        }
    }

    pub fn monthly_on(day: u8) -> Self {
        Self {
            frequency: Frequency::Monthly,
            interval: NonZeroU32::MIN,
            days_of_week: None,
            day_of_month: Some(day),
            end: EndCondition::Never,
        }
    }

    pub fn every(mut self, interval: NonZeroU32) -> Self {
        self.interval = interval;
        self
    }

    pub fn ending(mut self, end: EndCondition) -> Self {
        self.end = end;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(SchedulingError::InvalidRecurrence(format!(
                    "day_of_month must be 1..=31, got {day}"
                )));
            }
        }
        if self.days_of_week.is_some_and(|days| days.is_empty()) {
            return Err(SchedulingError::InvalidRecurrence(
                "days_of_week is present but empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the rule set anchored at the wall-clock time of `first`.
    ///
    /// The anchor is handed to `rrule` as a resolved instant in `zone`, never
    /// as local text, so a start inside a DST fold is accepted. It is the
    /// earliest whole-second reading of that wall-clock time, which is what
    /// `rrule` generates for every later day too.
    fn to_rule_set(&self, first: Instant, zone: ZoneId) -> Result<RRuleSet> {
        let interval = u16::try_from(self.interval.get()).map_err(|_| {
            SchedulingError::InvalidRecurrence(format!(
                "interval must be at most {}, got {}",
                u16::MAX,
                self.interval
            ))
        })?;
        let tz = RuleTz::Tz(zone.tz());

        let mut rule = RRule::new(self.frequency.into()).interval(interval);

        let days = match (self.frequency, self.days_of_week) {
            (_, Some(days)) => Some(days),
            (Frequency::Weekly, None) => {
                Some([to_local(first, zone).date.weekday()].into_iter().collect())
            }
            _ => None,
        };
        if let Some(days) = days {
            rule = rule.by_weekday(days.iter().map(NWeekday::Every).collect());
        }

        if self.frequency == Frequency::Monthly {
            if let Some(day) = self.day_of_month {
                rule = rule.by_month_day(vec![day as i8]);
            }
        }

        match self.end {
            EndCondition::Never => {}
            EndCondition::OnDate(until) => rule = rule.until(until.with_timezone(&RuleTz::UTC)),
            EndCondition::AfterOccurrences(count) => rule = rule.count(count.get()),
        }

        rule.build(anchor(first, zone).with_timezone(&tz))
            .map_err(|e| SchedulingError::InvalidRecurrence(e.to_string()))
    }
}

fn anchor(first: Instant, zone: ZoneId) -> Instant {
    let local = to_local(first, zone);
    let time = local.time.with_nanosecond(0).unwrap_or(local.time);
    to_instant(WallClock::new(local.date, time), zone)
}

impl From<Frequency> for RuleFrequency {
    fn from(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Daily => RuleFrequency::Daily,
            Frequency::Weekly => RuleFrequency::Weekly,
            Frequency::Monthly => RuleFrequency::Monthly,
        }
    }
}

/// Occurrences found within a horizon.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expansion {
    pub occurrences: Vec<Interval>,
    /// The occurrence cap was reached before the horizon ended.
    pub truncated: bool,
}

impl Expansion {
    /// The occurrences, or [`SchedulingError::HorizonExceeded`] if the
    /// expansion was truncated.
    pub fn complete(self) -> Result<Vec<Interval>> {
        if self.truncated {
            return Err(SchedulingError::HorizonExceeded(format!(
                "stopped after {} occurrences",
                self.occurrences.len()
            )));
        }
        Ok(self.occurrences)
    }
}

/// All occurrence intervals of `appt` whose starts fall inside `horizon`.
///
/// Truncates silently at [`DEFAULT_MAX_OCCURRENCES`].
pub fn expand(
    appt: &Appointment,
    pattern: &RecurrencePattern,
    horizon: &Interval,
) -> Result<Vec<Interval>> {
    expand_with_limit(appt, pattern, horizon, DEFAULT_MAX_OCCURRENCES)
        .map(|expansion| expansion.occurrences)
}

/// Like [`expand`], reporting whether the occurrence cap was hit.
pub fn expand_with_limit(
    appt: &Appointment,
    pattern: &RecurrencePattern,
    horizon: &Interval,
    max_occurrences: u16,
) -> Result<Expansion> {
    pattern.validate()?;

    let first = appt.interval.start();
    let duration = appt.interval.duration();

    if first >= horizon.end() {
        return Ok(Expansion::default());
    }
    if let EndCondition::OnDate(until) = pattern.end {
        if until < first {
            return Ok(Expansion::default());
        }
    }

    let zone = appt.display_zone;
    let set = pattern.to_rule_set(first, zone)?;
    let first_day = to_local(first, zone).date;

    // Widen the lower bound by a second so inclusive and exclusive bound
    // semantics give the same set after the filter below.
    let lower = (horizon.start() - Duration::seconds(1)).with_timezone(&RuleTz::UTC);
    let upper = horizon.end().with_timezone(&RuleTz::UTC);
    let result = set.after(lower).before(upper).all(max_occurrences);

    let occurrences = result
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc))
        // The series' own start keeps its stored instant, even when it is
        // the later of two fold readings or carries sub-second precision.
        .map(|start| {
            if to_local(start, zone).date == first_day {
                first
            } else {
                start
            }
        })
        .filter(|start| horizon.contains_instant(*start))
        .map(|start| Interval::starting_at(start, duration))
        .collect::<Result<Vec<_>>>()?;

    if result.limited {
        debug!(
            cap = max_occurrences,
            horizon = %horizon,
            "occurrence expansion truncated"
        );
    }

    Ok(Expansion {
        occurrences,
        truncated: result.limited,
    })
}

/// Occurrences of any appointment inside `horizon`: the pattern's
/// occurrences when it recurs, otherwise the single interval if it starts
/// inside the horizon.
pub fn expand_appointment(
    appt: &Appointment,
    horizon: &Interval,
    max_occurrences: u16,
) -> Result<Expansion> {
    match &appt.recurrence {
        Some(pattern) => expand_with_limit(appt, pattern, horizon, max_occurrences),
        None => {
            let occurrences = if horizon.contains_instant(appt.interval.start()) {
                vec![appt.interval]
            } else {
                Vec::new()
            };
            Ok(Expansion {
                occurrences,
                truncated: false,
            })
        }
    }
}
