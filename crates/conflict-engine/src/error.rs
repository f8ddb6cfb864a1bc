//! Error types for conflict-engine operations.

use thiserror::Error;

/// Errors raised while constructing or expanding scheduling values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Invalid timezone: {0}")]
    InvalidTimeZone(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Invalid time of day range: {0}")]
    InvalidTimeOfDay(String),

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),

    #[error("Invalid availability: {0}")]
    InvalidAvailability(String),

    #[error("Horizon exceeded: {0}")]
    HorizonExceeded(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised by the conflict resolver.
///
/// Every variant is recoverable: the caller re-prompts the operator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Still conflicting: {0}")]
    StillConflicting(String),

    #[error("Invalid shorten: {0}")]
    InvalidShorten(String),

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Strategy {strategy} is not allowed for relation {relation}")]
    StrategyNotAllowedForRelation { strategy: String, relation: String },
}

pub type Result<T> = std::result::Result<T, SchedulingError>;
