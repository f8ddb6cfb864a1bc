//! Appointment records as supplied by (and handed back to) the store.
//!
//! The engine treats an [`Appointment`] as an immutable value: every
//! operation that changes one returns a new value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interval::Interval;
use crate::recurrence::RecurrencePattern;
use crate::timezone::ZoneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
    NoShow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    Intake,
    #[default]
    Session,
    Consultation,
    Telehealth,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// `None` until the store has persisted the record.
    pub id: Option<Uuid>,
    pub client_id: Uuid,
    pub clinician_id: Uuid,
    pub interval: Interval,
    pub display_zone: ZoneId,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub kind: AppointmentKind,
    #[serde(default)]
    pub recurrence: Option<RecurrencePattern>,
    #[serde(default)]
    pub recurring_group_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Appointment {
    /// A scheduled, non-recurring session.
    pub fn scheduled(
        id: Option<Uuid>,
        client_id: Uuid,
        clinician_id: Uuid,
        interval: Interval,
        display_zone: ZoneId,
    ) -> Self {
        Self {
            id,
            client_id,
            clinician_id,
            interval,
            display_zone,
            status: AppointmentStatus::Scheduled,
            kind: AppointmentKind::default(),
            recurrence: None,
            recurring_group_id: None,
            notes: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Whether both values refer to the same persisted record.
    pub fn same_record(&self, other: &Appointment) -> bool {
        matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
    }

    /// A copy with a different interval.
    pub fn with_interval(&self, interval: Interval) -> Self {
        Self {
            interval,
            ..self.clone()
        }
    }

    /// One concrete instance of this appointment.
    ///
    /// The pattern is dropped; the group id is kept so the occurrence can
    /// still be traced back to its series.
    pub fn occurrence(&self, interval: Interval) -> Self {
        Self {
            interval,
            recurrence: None,
            ..self.clone()
        }
    }

    /// An unpersisted copy (fresh identity to be minted by the store).
    pub fn unpersisted_clone(&self, interval: Interval) -> Self {
        Self {
            id: None,
            interval,
            ..self.clone()
        }
    }

    /// A copy with `line` appended to the notes on its own line.
    pub fn with_note(&self, line: &str) -> Self {
        let notes = match self.notes.as_deref().map(str::trim_end) {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{line}"),
            _ => line.to_string(),
        };
        Self {
            notes: Some(notes),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Appointment {
        Appointment::scheduled(
            Some(Uuid::from_u128(1)),
            Uuid::from_u128(10),
            Uuid::from_u128(20),
            Interval::new(
                Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 3, 2, 16, 0, 0).unwrap(),
            )
            .unwrap(),
            ZoneId::parse("America/Chicago").unwrap(),
        )
    }

    #[test]
    fn test_with_note_on_empty_notes() {
        let appt = sample().with_note("double-booked");
        assert_eq!(appt.notes.as_deref(), Some("double-booked"));
    }

    #[test]
    fn test_with_note_appends() {
        let mut appt = sample();
        appt.notes = Some("bring intake forms".to_string());
        let appt = appt.with_note("double-booked");
        assert_eq!(
            appt.notes.as_deref(),
            Some("bring intake forms\ndouble-booked")
        );
    }

    #[test]
    fn test_same_record_requires_ids() {
        let a = sample();
        let mut b = sample();
        assert!(a.same_record(&b));
        b.id = None;
        assert!(!a.same_record(&b));
        assert!(!b.same_record(&b));
    }

    #[test]
    fn test_deserialize_legacy_zone_list_and_defaults() {
        let json = r#"{
            "id": null,
            "client_id": "00000000-0000-0000-0000-00000000000a",
            "clinician_id": "00000000-0000-0000-0000-000000000014",
            "interval": {"start": "2026-03-02T15:00:00Z", "end": "2026-03-02T16:00:00Z"},
            "display_zone": ["America/Chicago"],
            "status": "scheduled"
        }"#;
        let appt: Appointment = serde_json::from_str(json).unwrap();
        assert_eq!(appt.display_zone.name(), "America/Chicago");
        assert_eq!(appt.kind, AppointmentKind::Session);
        assert!(appt.recurrence.is_none());
    }
}
