//! Propose non-colliding replacement slots.
//!
//! The search walks forward from the desired start in fixed steps, only
//! inside business hours of each local day, and yields every candidate that
//! does not share time with a busy interval. Busy entries may overlap or
//! repeat; they are merged into exclusion regions up front.
//!
//! The result is a lazy iterator. It is `Clone`, so a consumer can restart
//! the sequence from any point, and it always ends: either after
//! `max_results` candidates or when the look-ahead horizon runs out.

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::debug;

use crate::availability::BusinessHours;
use crate::interval::{merge_intervals, Instant, Interval, TimeOfDayRange};
use crate::timezone::{start_of_day, to_instant, to_local, WallClock, ZoneId};

/// Tunables for slot search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotFinderConfig {
    /// Scan granularity.
    pub step: Duration,
    /// How far past the desired start to look.
    pub horizon: Duration,
}

impl Default for SlotFinderConfig {
    fn default() -> Self {
        Self {
            step: Duration::minutes(15),
            horizon: Duration::days(14),
        }
    }
}

/// Slot searcher with a fixed configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotFinder {
    config: SlotFinderConfig,
}

impl SlotFinder {
    pub fn new(config: SlotFinderConfig) -> Self {
        Self { config }
    }

    /// Candidates of length `duration` from `desired.start` onwards.
    ///
    /// A non-positive `duration` or a step shorter than one minute yields
    /// nothing.
    pub fn find(
        &self,
        desired: &Interval,
        duration: Duration,
        busy: &[Interval],
        zone: ZoneId,
        business_hours: impl Into<BusinessHours>,
        max_results: usize,
    ) -> SlotCandidates {
        let exhausted = duration <= Duration::zero() || self.config.step < Duration::minutes(1);
        SlotCandidates {
            cursor: desired.start(),
            limit: desired
                .start()
                .checked_add_signed(self.config.horizon)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            duration,
            step: self.config.step,
            busy: merge_intervals(busy),
            busy_index: 0,
            zone,
            hours: business_hours.into(),
            remaining: if exhausted { 0 } else { max_results },
        }
    }
}

/// Find up to `max_results` slots with the default 15-minute step and
/// 14-day horizon.
pub fn find(
    desired: &Interval,
    duration: Duration,
    busy: &[Interval],
    zone: ZoneId,
    business_hours: TimeOfDayRange,
    max_results: usize,
) -> SlotCandidates {
    SlotFinder::default().find(desired, duration, busy, zone, business_hours, max_results)
}

/// Lazy, chronologically ordered slot candidates.
#[derive(Debug, Clone)]
pub struct SlotCandidates {
    cursor: Instant,
    limit: Instant,
    duration: Duration,
    step: Duration,
    /// Sorted, merged, non-touching.
    busy: Vec<Interval>,
    /// First busy region that may still end after the cursor.
    busy_index: usize,
    zone: ZoneId,
    hours: BusinessHours,
    remaining: usize,
}

impl SlotCandidates {
    /// Earliest start `>= cursor` that fits a window of the cursor's local
    /// day, or `None` when the day has no room left.
    fn fit_in_day(&self) -> Option<Instant> {
        let local = to_local(self.cursor, self.zone);
        self.hours
            .windows(local.date.weekday())
            .iter()
            .find_map(|window| {
                let opens = to_instant(WallClock::new(local.date, window.start()), self.zone);
                let closes = to_instant(WallClock::new(local.date, window.end()), self.zone);
                let start = self.cursor.max(opens);
                start
                    .checked_add_signed(self.duration)
                    .is_some_and(|end| end <= closes)
                    .then_some(start)
            })
    }

    /// The first merged busy region intersecting `candidate`.
    fn blocking(&mut self, candidate: &Interval) -> Option<Interval> {
        while self
            .busy
            .get(self.busy_index)
            .is_some_and(|b| b.end() <= candidate.start())
        {
            self.busy_index += 1;
        }
        self.busy
            .get(self.busy_index)
            .filter(|b| b.intersects(candidate))
            .copied()
    }

    fn next_local_day(&self) -> Instant {
        let date = to_local(self.cursor, self.zone).date;
        match date.succ_opt() {
            Some(next) => start_of_day(next, self.zone).max(self.advance(self.cursor, 1)),
            None => self.limit,
        }
    }

    /// `from` moved `steps` grid steps forward, or the limit if that
    /// leaves the representable range.
    fn advance(&self, from: Instant, steps: i64) -> Instant {
        i32::try_from(steps)
            .ok()
            .and_then(|steps| self.step.checked_mul(steps))
            .and_then(|skip| from.checked_add_signed(skip))
            .unwrap_or(self.limit)
    }
}

impl Iterator for SlotCandidates {
    type Item = Interval;

    fn next(&mut self) -> Option<Interval> {
        while self.remaining > 0 && self.cursor < self.limit {
            let Some(start) = self.fit_in_day() else {
                self.cursor = self.next_local_day();
                continue;
            };
            if start >= self.limit {
                break;
            }
            let Ok(candidate) = Interval::starting_at(start, self.duration) else {
                break;
            };

            match self.blocking(&candidate) {
                Some(busy) => {
                    // Stay on the step grid anchored at `start`. The step
                    // is at least a minute, so the division is safe.
                    let wait = (busy.end() - start).num_seconds();
                    let step = self.step.num_seconds();
                    self.cursor = self.advance(start, ((wait + step - 1) / step).max(1));
                }
                None => {
                    self.cursor = self.advance(start, 1);
                    self.remaining -= 1;
                    return Some(candidate);
                }
            }
        }

        if self.remaining > 0 {
            debug!(limit = %self.limit, "slot search reached its horizon");
            self.remaining = 0;
        }
        None
    }
}
