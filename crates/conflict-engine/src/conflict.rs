//! Detect conflicts between a candidate appointment and a clinician's
//! existing appointments.
//!
//! Only active (`Scheduled`) appointments of the same clinician are
//! considered, and the candidate never conflicts with its own stored
//! record. When either side recurs, both sides are expanded over a bounded
//! horizon and every occurrence pair is classified on its own.

use std::collections::BTreeSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::appointment::Appointment;
use crate::classify::{Classifier, ClassifierConfig, ConflictRelation, StrategyKind};
use crate::error::{Result, SchedulingError};
use crate::interval::Interval;
use crate::recurrence::{expand_appointment, DEFAULT_MAX_OCCURRENCES};

/// A detected, unresolved relationship between two appointments.
///
/// `subject` is the appointment being created or edited (one occurrence of
/// it, if it recurs); `relation` reads from the subject's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub subject: Appointment,
    pub other: Appointment,
    pub relation: ConflictRelation,
    pub overlap_minutes: Option<u32>,
    pub allowed_strategies: BTreeSet<StrategyKind>,
}

impl Conflict {
    /// Classify `subject` against `other`; `None` when they do not relate.
    pub fn between(
        classifier: &Classifier,
        subject: &Appointment,
        other: &Appointment,
    ) -> Option<Conflict> {
        let detail = classifier.classify_detailed(&subject.interval, &other.interval)?;
        Some(Conflict {
            subject: subject.clone(),
            other: other.clone(),
            relation: detail.relation,
            overlap_minutes: detail.overlap_minutes,
            allowed_strategies: detail.relation.allowed_strategies(),
        })
    }

    pub fn allows(&self, kind: StrategyKind) -> bool {
        self.allowed_strategies.contains(&kind)
    }

    pub fn is_blocking(&self) -> bool {
        self.relation.is_blocking()
    }
}

/// Options for [`detect_conflicts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionOptions {
    pub classifier: ClassifierConfig,
    /// Window for recurring expansion. Defaults to `recurrence_horizon`
    /// from the candidate's start.
    pub horizon: Option<Interval>,
    pub recurrence_horizon: Duration,
    pub max_occurrences: u16,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            horizon: None,
            recurrence_horizon: Duration::days(90),
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
        }
    }
}

/// All conflicts of `candidate` against `existing`, ordered by subject
/// start, then other start.
///
/// # Errors
///
/// Fails only when a recurrence pattern cannot be expanded.
pub fn detect_conflicts(
    candidate: &Appointment,
    existing: &[Appointment],
    options: &DetectionOptions,
) -> Result<Vec<Conflict>> {
    let classifier = Classifier::new(options.classifier);
    let relevant: Vec<&Appointment> = existing
        .iter()
        .filter(|other| {
            other.is_active()
                && other.clinician_id == candidate.clinician_id
                && !other.same_record(candidate)
        })
        .collect();

    let mut conflicts = Vec::new();
    let needs_expansion =
        candidate.is_recurring() || relevant.iter().any(|other| other.is_recurring());

    if !needs_expansion {
        conflicts.extend(
            relevant
                .iter()
                .filter_map(|other| Conflict::between(&classifier, candidate, other)),
        );
    } else {
        let window = match options.horizon {
            Some(window) => window,
            None => Interval::starting_at(candidate.interval.start(), options.recurrence_horizon)?,
        };
        let longest = relevant
            .iter()
            .map(|other| other.interval.duration())
            .chain(std::iter::once(candidate.interval.duration()))
            .max()
            .unwrap_or_else(Duration::zero);
        // Occurrences starting shortly before the window can still reach it.
        let reach = longest.checked_add(&options.classifier.adjacent_gap);
        let padded_start = reach
            .and_then(|reach| window.start().checked_sub_signed(reach))
            .ok_or_else(|| {
                SchedulingError::InvalidInterval(format!("padding {window} is out of range"))
            })?;
        let padded = Interval::new(padded_start, window.end())?;

        let subjects = occurrences_of(candidate, &padded, options.max_occurrences)?;
        for other in &relevant {
            let others = occurrences_of(other, &padded, options.max_occurrences)?;
            for subject in &subjects {
                for other_occurrence in &others {
                    if let Some(conflict) =
                        Conflict::between(&classifier, subject, other_occurrence)
                    {
                        conflicts.push(conflict);
                    }
                }
            }
        }
    }

    conflicts.sort_by_key(|c| (c.subject.interval.start(), c.other.interval.start()));
    debug!(
        candidate = ?candidate.id,
        checked = relevant.len(),
        found = conflicts.len(),
        "conflict detection complete"
    );
    Ok(conflicts)
}

fn occurrences_of(appt: &Appointment, horizon: &Interval, cap: u16) -> Result<Vec<Appointment>> {
    let expansion = expand_appointment(appt, horizon, cap)?;
    if expansion.truncated {
        debug!(appointment = ?appt.id, cap, "occurrences truncated during detection");
    }
    Ok(expansion
        .occurrences
        .into_iter()
        .map(|interval| appt.occurrence(interval))
        .collect())
}

/// Every conflicting pair within one appointment set.
///
/// Sorts by start and compares each appointment only with those starting
/// before it ends plus the adjacency gap. Recurrence patterns are not
/// expanded here; pass concrete occurrences. Appointments of different
/// clinicians never conflict. Each pair is reported once, with the earlier
/// appointment as subject.
pub fn find_conflicts(appointments: &[Appointment], config: &ClassifierConfig) -> Vec<Conflict> {
    let classifier = Classifier::new(*config);
    let mut active: Vec<&Appointment> = appointments.iter().filter(|a| a.is_active()).collect();
    active.sort_by_key(|a| (a.interval.start(), a.interval.end()));

    let mut conflicts = Vec::new();
    for (i, subject) in active.iter().enumerate() {
        let reach = subject.interval.end() + config.adjacent_gap;
        for other in active[i + 1..]
            .iter()
            .take_while(|other| other.interval.start() <= reach)
        {
            if other.clinician_id != subject.clinician_id || other.same_record(subject) {
                continue;
            }
            if let Some(conflict) = Conflict::between(&classifier, subject, other) {
                conflicts.push(conflict);
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timezone::ZoneId;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn appt(id: u128, sh: u32, sm: u32, eh: u32, em: u32) -> Appointment {
        Appointment::scheduled(
            Some(Uuid::from_u128(id)),
            Uuid::from_u128(100 + id),
            Uuid::from_u128(7),
            Interval::new(
                Utc.with_ymd_and_hms(2026, 3, 2, sh, sm, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 3, 2, eh, em, 0).unwrap(),
            )
            .unwrap(),
            ZoneId::UTC,
        )
    }

    #[test]
    fn test_conflict_between_sets_allowed_strategies() {
        let classifier = Classifier::default();
        let (a, b) = (appt(1, 10, 0, 11, 0), appt(2, 10, 30, 11, 30));
        let conflict = Conflict::between(&classifier, &a, &b).unwrap();
        assert_eq!(conflict.relation, ConflictRelation::Overlap);
        assert_eq!(conflict.overlap_minutes, Some(30));
        assert!(conflict.allows(StrategyKind::Shorten));
        assert!(!conflict.allows(StrategyKind::Ignore));
    }

    #[test]
    fn test_sweep_reports_each_pair_once() {
        let set = vec![
            appt(3, 14, 0, 15, 0),
            appt(1, 9, 0, 10, 0),
            appt(2, 9, 30, 10, 30),
            appt(4, 15, 0, 16, 0),
        ];
        let conflicts = find_conflicts(&set, &ClassifierConfig::default());
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].subject.id, Some(Uuid::from_u128(1)));
        assert_eq!(conflicts[0].relation, ConflictRelation::Overlap);
        assert_eq!(conflicts[1].subject.id, Some(Uuid::from_u128(3)));
        assert_eq!(conflicts[1].relation, ConflictRelation::BackToBack);
    }

    #[test]
    fn test_sweep_ignores_other_clinicians_and_cancelled() {
        let mut other_clinician = appt(2, 9, 30, 10, 30);
        other_clinician.clinician_id = Uuid::from_u128(8);
        let mut cancelled = appt(3, 9, 15, 9, 45);
        cancelled.status = crate::appointment::AppointmentStatus::Cancelled;
        let set = vec![appt(1, 9, 0, 10, 0), other_clinician, cancelled];
        assert!(find_conflicts(&set, &ClassifierConfig::default()).is_empty());
    }

    #[test]
    fn test_sweep_reaches_past_long_appointment() {
        // A long block must still be compared with a later, short one that
        // starts after an intervening appointment.
        let set = vec![
            appt(1, 9, 0, 13, 0),
            appt(2, 9, 30, 10, 0),
            appt(3, 12, 0, 12, 30),
        ];
        let conflicts = find_conflicts(&set, &ClassifierConfig::default());
        let pairs: Vec<_> = conflicts
            .iter()
            .map(|c| (c.subject.id.unwrap().as_u128(), c.other.id.unwrap().as_u128()))
            .collect();
        assert!(pairs.contains(&(1, 2)));
        assert!(pairs.contains(&(1, 3)));
    }
}
