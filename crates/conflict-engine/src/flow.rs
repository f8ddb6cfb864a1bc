//! The operator-facing resolution dialog as an explicit state machine.
//!
//! The flow is: pick a conflict, pick a strategy, pick a time (reschedule
//! only), confirm. It holds no scheduling logic of its own; confirming
//! delegates to [`resolve`]. A rejected event leaves the state unchanged.

use thiserror::Error;

use crate::appointment::Appointment;
use crate::classify::StrategyKind;
use crate::conflict::Conflict;
use crate::error::ResolutionError;
use crate::interval::Interval;
use crate::resolve::{resolve, ResolutionStrategy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    SelectingConflict,
    SelectingStrategy { conflict: usize },
    ChoosingTime { conflict: usize },
    Confirming { conflict: usize, strategy: ResolutionStrategy },
    Resolved { conflict: usize, appointments: Vec<Appointment> },
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    SelectConflict(usize),
    /// Pick a strategy. Payload-free kinds (`Override`, `Ignore`) and
    /// complete strategies go straight to confirmation; a bare
    /// `Reschedule` goes to time selection.
    ChooseStrategy(ResolutionStrategy),
    ChooseReschedule,
    ChooseTime(Interval),
    Confirm,
    Back,
    Abort,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("No conflict at index {0}")]
    NoSuchConflict(usize),

    #[error("Strategy {0} is not offered for this conflict")]
    StrategyNotOffered(StrategyKind),

    #[error("Event {event} is not valid in state {state}")]
    InvalidTransition { state: String, event: String },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// One resolution dialog over a fixed list of conflicts.
#[derive(Debug, Clone)]
pub struct ResolutionFlow {
    conflicts: Vec<Conflict>,
    state: FlowState,
}

impl ResolutionFlow {
    pub fn new(conflicts: Vec<Conflict>) -> Self {
        Self {
            conflicts,
            state: FlowState::SelectingConflict,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// The conflict currently being handled, if one is selected.
    pub fn current(&self) -> Option<&Conflict> {
        let index = match &self.state {
            FlowState::SelectingStrategy { conflict }
            | FlowState::ChoosingTime { conflict }
            | FlowState::Confirming { conflict, .. }
            | FlowState::Resolved { conflict, .. } => *conflict,
            FlowState::SelectingConflict | FlowState::Aborted => return None,
        };
        self.conflicts.get(index)
    }

    /// Apply an event, returning the new state.
    pub fn handle(&mut self, event: FlowEvent) -> Result<&FlowState, FlowError> {
        let next = self.transition(&event)?;
        self.state = next;
        Ok(&self.state)
    }

    fn transition(&self, event: &FlowEvent) -> Result<FlowState, FlowError> {
        use FlowEvent as E;
        use FlowState as S;

        match (&self.state, event) {
            (_, E::Abort) if !matches!(self.state, S::Resolved { .. }) => Ok(S::Aborted),

            (S::SelectingConflict, E::SelectConflict(index)) => {
                if *index >= self.conflicts.len() {
                    return Err(FlowError::NoSuchConflict(*index));
                }
                Ok(S::SelectingStrategy { conflict: *index })
            }

            (S::SelectingStrategy { conflict }, E::ChooseReschedule) => {
                self.ensure_offered(*conflict, StrategyKind::Reschedule)?;
                Ok(S::ChoosingTime {
                    conflict: *conflict,
                })
            }
            (S::SelectingStrategy { conflict }, E::ChooseStrategy(strategy)) => {
                self.ensure_offered(*conflict, strategy.kind())?;
                Ok(S::Confirming {
                    conflict: *conflict,
                    strategy: strategy.clone(),
                })
            }
            (S::SelectingStrategy { .. }, E::Back) => Ok(S::SelectingConflict),

            (S::ChoosingTime { conflict }, E::ChooseTime(interval)) => Ok(S::Confirming {
                conflict: *conflict,
                strategy: ResolutionStrategy::Reschedule {
                    new_interval: *interval,
                },
            }),
            (S::ChoosingTime { conflict }, E::Back) => Ok(S::SelectingStrategy {
                conflict: *conflict,
            }),

            (S::Confirming { conflict, strategy }, E::Confirm) => {
                let appointments = resolve(&self.conflicts[*conflict], strategy.clone())?;
                Ok(S::Resolved {
                    conflict: *conflict,
                    appointments,
                })
            }
            (S::Confirming { conflict, strategy }, E::Back) => {
                Ok(if strategy.kind() == StrategyKind::Reschedule {
                    S::ChoosingTime {
                        conflict: *conflict,
                    }
                } else {
                    S::SelectingStrategy {
                        conflict: *conflict,
                    }
                })
            }

            (state, event) => Err(FlowError::InvalidTransition {
                state: format!("{state:?}"),
                event: format!("{event:?}"),
            }),
        }
    }

    fn ensure_offered(&self, index: usize, kind: StrategyKind) -> Result<(), FlowError> {
        let conflict = self
            .conflicts
            .get(index)
            .ok_or(FlowError::NoSuchConflict(index))?;
        if conflict.allows(kind) {
            Ok(())
        } else {
            Err(FlowError::StrategyNotOffered(kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::timezone::ZoneId;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn iv(sh: u32, sm: u32, eh: u32, em: u32) -> Interval {
        Interval::new(
            Utc.with_ymd_and_hms(2026, 3, 2, sh, sm, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, eh, em, 0).unwrap(),
        )
        .unwrap()
    }

    fn overlap_flow() -> ResolutionFlow {
        let make = |id: u128, interval| {
            Appointment::scheduled(
                Some(Uuid::from_u128(id)),
                Uuid::from_u128(id),
                Uuid::from_u128(3),
                interval,
                ZoneId::UTC,
            )
        };
        let conflict = Conflict::between(
            &Classifier::default(),
            &make(1, iv(10, 0, 11, 0)),
            &make(2, iv(10, 30, 11, 30)),
        )
        .unwrap();
        ResolutionFlow::new(vec![conflict])
    }

    #[test]
    fn test_reschedule_path() {
        let mut flow = overlap_flow();
        flow.handle(FlowEvent::SelectConflict(0)).unwrap();
        flow.handle(FlowEvent::ChooseReschedule).unwrap();
        flow.handle(FlowEvent::ChooseTime(iv(12, 0, 13, 0))).unwrap();
        let state = flow.handle(FlowEvent::Confirm).unwrap();
        match state {
            FlowState::Resolved { appointments, .. } => {
                assert_eq!(appointments[0].interval, iv(12, 0, 13, 0));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_failed_confirm_keeps_state() {
        let mut flow = overlap_flow();
        flow.handle(FlowEvent::SelectConflict(0)).unwrap();
        flow.handle(FlowEvent::ChooseReschedule).unwrap();
        flow.handle(FlowEvent::ChooseTime(iv(11, 0, 12, 0))).unwrap();
        let err = flow.handle(FlowEvent::Confirm).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Resolution(ResolutionError::StillConflicting(_))
        ));
        assert!(matches!(flow.state(), FlowState::Confirming { .. }));
        flow.handle(FlowEvent::Back).unwrap();
        assert_eq!(flow.state(), &FlowState::ChoosingTime { conflict: 0 });
    }

    #[test]
    fn test_strategy_not_offered() {
        let mut flow = overlap_flow();
        flow.handle(FlowEvent::SelectConflict(0)).unwrap();
        let err = flow
            .handle(FlowEvent::ChooseStrategy(ResolutionStrategy::Ignore))
            .unwrap_err();
        assert_eq!(err, FlowError::StrategyNotOffered(StrategyKind::Ignore));
        assert_eq!(flow.state(), &FlowState::SelectingStrategy { conflict: 0 });
    }

    #[test]
    fn test_unknown_conflict_index() {
        let mut flow = overlap_flow();
        assert_eq!(
            flow.handle(FlowEvent::SelectConflict(4)).unwrap_err(),
            FlowError::NoSuchConflict(4)
        );
    }

    #[test]
    fn test_invalid_event_rejected() {
        let mut flow = overlap_flow();
        assert!(matches!(
            flow.handle(FlowEvent::Confirm),
            Err(FlowError::InvalidTransition { .. })
        ));
        assert_eq!(flow.state(), &FlowState::SelectingConflict);
    }

    #[test]
    fn test_abort_and_resolved_is_final() {
        let mut flow = overlap_flow();
        flow.handle(FlowEvent::SelectConflict(0)).unwrap();
        flow.handle(FlowEvent::Abort).unwrap();
        assert_eq!(flow.state(), &FlowState::Aborted);

        let mut flow = overlap_flow();
        flow.handle(FlowEvent::SelectConflict(0)).unwrap();
        flow.handle(FlowEvent::ChooseStrategy(ResolutionStrategy::Override))
            .unwrap();
        flow.handle(FlowEvent::Confirm).unwrap();
        assert!(flow.handle(FlowEvent::Abort).is_err());
        assert!(flow.current().is_some());
    }
}
