//! Classify how two intervals relate.
//!
//! Interval math is done on UTC instants only; zones matter for display,
//! never for correctness. Intervals are half-open, so an appointment ending
//! at 10:00 and one starting at 10:00 touch without overlapping.

use std::collections::BTreeSet;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::interval::Interval;

/// How two non-disjoint intervals relate, from the first argument's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictRelation {
    /// Partial intersection.
    Overlap,
    /// The first interval lies inside the second.
    Contained,
    /// The first interval covers the second.
    Contains,
    /// Disjoint, separated by less than the adjacency gap.
    Adjacent,
    /// One ends exactly when the other starts.
    BackToBack,
}

/// The payload-free name of a resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Reschedule,
    Shorten,
    Split,
    Cancel,
    Override,
    Ignore,
}

impl ConflictRelation {
    /// Strategies an operator may pick for this relation.
    pub fn allowed_strategies(self) -> BTreeSet<StrategyKind> {
        use StrategyKind::*;
        let kinds: &[StrategyKind] = match self {
            ConflictRelation::Overlap => &[Reschedule, Shorten, Split, Cancel, Override],
            ConflictRelation::Contained => &[Reschedule, Cancel, Override],
            ConflictRelation::Contains => &[Reschedule, Split, Cancel, Override],
            ConflictRelation::Adjacent => &[Ignore, Reschedule],
            ConflictRelation::BackToBack => &[Ignore, Override],
        };
        kinds.iter().copied().collect()
    }

    /// Whether the two intervals actually share time.
    ///
    /// `Adjacent` and `BackToBack` are warnings; the rest block booking.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            ConflictRelation::Overlap | ConflictRelation::Contained | ConflictRelation::Contains
        )
    }

    /// The relation seen from the other argument's side.
    pub fn swapped(self) -> Self {
        match self {
            ConflictRelation::Contains => ConflictRelation::Contained,
            ConflictRelation::Contained => ConflictRelation::Contains,
            other => other,
        }
    }
}

impl fmt::Display for ConflictRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictRelation::Overlap => "overlap",
            ConflictRelation::Contained => "contained",
            ConflictRelation::Contains => "contains",
            ConflictRelation::Adjacent => "adjacent",
            ConflictRelation::BackToBack => "back_to_back",
        };
        f.write_str(name)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Reschedule => "reschedule",
            StrategyKind::Shorten => "shorten",
            StrategyKind::Split => "split",
            StrategyKind::Cancel => "cancel",
            StrategyKind::Override => "override",
            StrategyKind::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

/// Tunables for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Disjoint intervals closer than this are `Adjacent`.
    pub adjacent_gap: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            adjacent_gap: Duration::minutes(15),
        }
    }
}

/// A relation plus the overlap magnitude, when the intervals share time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub relation: ConflictRelation,
    pub overlap_minutes: Option<u32>,
}

/// Interval classifier with a fixed configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Determine the relation of `a` to `b`, or `None` when they are
    /// disjoint and farther apart than the adjacency gap.
    pub fn classify(&self, a: &Interval, b: &Interval) -> Option<ConflictRelation> {
        if a.end() == b.start() || b.end() == a.start() {
            return Some(ConflictRelation::BackToBack);
        }

        if let Some(gap) = a.gap_to(b) {
            return (gap < self.config.adjacent_gap).then_some(ConflictRelation::Adjacent);
        }

        // Identical intervals cover each other; report the symmetric
        // relation so argument order never changes the answer.
        if a == b {
            Some(ConflictRelation::Overlap)
        } else if a.covers(b) {
            Some(ConflictRelation::Contains)
        } else if b.covers(a) {
            Some(ConflictRelation::Contained)
        } else {
            Some(ConflictRelation::Overlap)
        }
    }

    /// Relation plus overlap magnitude in one pass.
    pub fn classify_detailed(&self, a: &Interval, b: &Interval) -> Option<Classification> {
        self.classify(a, b).map(|relation| Classification {
            relation,
            overlap_minutes: overlap_minutes(a, b),
        })
    }

    /// Whether the two intervals block each other.
    pub fn collides(&self, a: &Interval, b: &Interval) -> bool {
        self.classify(a, b).is_some_and(ConflictRelation::is_blocking)
    }
}

/// Classify with the default 15-minute adjacency gap.
pub fn classify(a: &Interval, b: &Interval) -> Option<ConflictRelation> {
    Classifier::default().classify(a, b)
}

/// Whole minutes of shared time, rounded down. `None` when the intervals
/// do not intersect.
pub fn overlap_minutes(a: &Interval, b: &Interval) -> Option<u32> {
    a.intersection(b).map(|common| {
        let minutes = common.duration().num_minutes();
        u32::try_from(minutes).unwrap_or(u32::MAX)
    })
}
