//! # conflict-engine
//!
//! Deterministic appointment conflict handling for clinician calendars.
//!
//! All interval math runs on UTC instants. Time zones only decide what a
//! local wall-clock time means (recurrence, business hours) and how
//! instants are shown. Nothing here touches storage or the network; every
//! operation is a pure function of its inputs.
//!
//! ## Modules
//!
//! - [`interval`]: half-open UTC intervals and wall-clock time-of-day ranges
//! - [`timezone`]: zone validation, wall-clock/instant conversion across DST
//! - [`classify`]: how two intervals relate and which strategies apply
//! - [`recurrence`]: recurring appointment expansion over a bounded horizon
//! - [`availability`]: weekly working-hours patterns
//! - [`slots`]: lazy search for non-colliding replacement slots
//! - [`conflict`]: conflict detection for a candidate or a whole set
//! - [`resolve`]: apply an operator-chosen strategy to a conflict
//! - [`flow`]: the resolution dialog as a state machine
//! - [`config`]: engine-wide tunables
//! - [`error`]: error types

pub mod appointment;
pub mod availability;
pub mod classify;
pub mod config;
pub mod conflict;
pub mod error;
pub mod flow;
pub mod interval;
pub mod recurrence;
pub mod resolve;
pub mod slots;
pub mod timezone;

pub use appointment::{Appointment, AppointmentKind, AppointmentStatus};
pub use availability::{BusinessHours, WeeklyAvailabilityPattern};
pub use classify::{
    classify, overlap_minutes, Classification, Classifier, ClassifierConfig, ConflictRelation,
    StrategyKind,
};
pub use config::EngineConfig;
pub use conflict::{detect_conflicts, find_conflicts, Conflict, DetectionOptions};
pub use error::{ResolutionError, SchedulingError};
pub use flow::{FlowError, FlowEvent, FlowState, ResolutionFlow};
pub use interval::{merge_intervals, Instant, Interval, TimeOfDayRange, TimeSlot};
pub use recurrence::{
    expand, expand_appointment, expand_with_limit, EndCondition, Expansion, Frequency,
    RecurrencePattern, WeekdaySet,
};
pub use resolve::{resolve, ResolutionStrategy, DEFAULT_CANCEL_REASON};
pub use slots::{SlotCandidates, SlotFinder, SlotFinderConfig};
pub use timezone::{
    describe, display_name, parse_instant, to_instant, to_local, validate, LocalView,
    RawTimeZone, WallClock, ZoneId,
};
