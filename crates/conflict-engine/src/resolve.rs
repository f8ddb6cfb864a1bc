//! Apply an operator-chosen strategy to a conflict.
//!
//! [`resolve`] is a pure function of `(conflict, strategy)`: it never looks
//! at earlier resolutions and never mutates its inputs. Each branch either
//! returns the finalized appointment value(s) for the store or a
//! [`ResolutionError`] the caller should surface as a re-prompt.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::appointment::{Appointment, AppointmentStatus};
use crate::classify::{Classifier, ConflictRelation, StrategyKind};
use crate::conflict::Conflict;
use crate::error::ResolutionError;
use crate::interval::{Instant, Interval};

/// Used when an operator cancels without giving a reason.
pub const DEFAULT_CANCEL_REASON: &str = "Cancelled due to a scheduling conflict";

/// One of the fixed transformations that settles a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ResolutionStrategy {
    Reschedule { new_interval: Interval },
    Shorten { new_end: Instant },
    Split { before: Interval, after: Interval },
    Cancel { reason: String },
    Override,
    Ignore,
}

impl ResolutionStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ResolutionStrategy::Reschedule { .. } => StrategyKind::Reschedule,
            ResolutionStrategy::Shorten { .. } => StrategyKind::Shorten,
            ResolutionStrategy::Split { .. } => StrategyKind::Split,
            ResolutionStrategy::Cancel { .. } => StrategyKind::Cancel,
            ResolutionStrategy::Override => StrategyKind::Override,
            ResolutionStrategy::Ignore => StrategyKind::Ignore,
        }
    }

    /// The `Split` that carves `conflict.other` out of the subject.
    ///
    /// # Errors
    ///
    /// [`ResolutionError::InvalidSplit`] when the subject does not extend
    /// past the other appointment on both sides (e.g. they share a start).
    pub fn split_around(conflict: &Conflict) -> Result<Self, ResolutionError> {
        let subject = &conflict.subject.interval;
        let other = &conflict.other.interval;
        let before = Interval::new(subject.start(), other.start());
        let after = Interval::new(other.end(), subject.end());
        match (before, after) {
            (Ok(before), Ok(after)) => Ok(ResolutionStrategy::Split { before, after }),
            _ => Err(ResolutionError::InvalidSplit(format!(
                "{subject} does not extend past {other} on both sides"
            ))),
        }
    }
}

/// Produce the appointment(s) implementing `strategy` for `conflict`.
///
/// `Split` returns two values; the second has `id: None` and needs a fresh
/// identity from the store. Every other strategy returns exactly one.
pub fn resolve(
    conflict: &Conflict,
    strategy: ResolutionStrategy,
) -> Result<Vec<Appointment>, ResolutionError> {
    let kind = strategy.kind();
    if !conflict.relation.allowed_strategies().contains(&kind) {
        return Err(ResolutionError::StrategyNotAllowedForRelation {
            strategy: kind.to_string(),
            relation: conflict.relation.to_string(),
        });
    }

    let subject = &conflict.subject;
    let other = &conflict.other;

    let resolved = match strategy {
        ResolutionStrategy::Reschedule { new_interval } => {
            // Only sharing time blocks; landing next to `other` is fine.
            if Classifier::default().collides(&new_interval, &other.interval) {
                return Err(ResolutionError::StillConflicting(format!(
                    "{new_interval} still collides with {}",
                    other.interval
                )));
            }
            vec![subject.with_interval(new_interval)]
        }
        ResolutionStrategy::Shorten { new_end } => {
            if new_end > other.interval.start() {
                return Err(ResolutionError::InvalidShorten(format!(
                    "new end {} is after the other appointment starts at {}",
                    new_end.to_rfc3339(),
                    other.interval.start().to_rfc3339()
                )));
            }
            let interval = subject.interval.with_end(new_end).map_err(|_| {
                ResolutionError::InvalidShorten(format!(
                    "new end {} leaves no time after the start {}",
                    new_end.to_rfc3339(),
                    subject.interval.start().to_rfc3339()
                ))
            })?;
            vec![subject.with_interval(interval)]
        }
        ResolutionStrategy::Split { before, after } => {
            if conflict.relation != ConflictRelation::Contains {
                return Err(ResolutionError::InvalidSplit(format!(
                    "split needs the subject to contain the other appointment, relation is {}",
                    conflict.relation
                )));
            }
            let fits = before.end() == other.interval.start()
                && after.start() == other.interval.end()
                && before.start() >= subject.interval.start()
                && after.end() <= subject.interval.end();
            if !fits {
                return Err(ResolutionError::InvalidSplit(format!(
                    "{before} and {after} must sit on either side of {} within {}",
                    other.interval, subject.interval
                )));
            }
            debug_assert!(
                !before.intersects(&other.interval) && !after.intersects(&other.interval)
            );
            vec![
                subject.with_interval(before),
                subject.unpersisted_clone(after),
            ]
        }
        ResolutionStrategy::Cancel { reason } => {
            let reason = match reason.trim() {
                "" => DEFAULT_CANCEL_REASON,
                trimmed => trimmed,
            };
            let mut cancelled = subject.with_note(reason);
            cancelled.status = AppointmentStatus::Cancelled;
            vec![cancelled]
        }
        ResolutionStrategy::Override | ResolutionStrategy::Ignore => vec![subject.clone()],
    };

    info!(
        subject = ?subject.id,
        other = ?other.id,
        relation = %conflict.relation,
        strategy = %kind,
        results = resolved.len(),
        "conflict resolved"
    );
    Ok(resolved)
}
