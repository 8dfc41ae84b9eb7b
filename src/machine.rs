//! Phase state machine
//!
//! Sequences the seven workflow phases. A phase advances only after it
//! has recorded at least one session event; the machine never skips a
//! phase and never regresses except through an explicit user-initiated
//! revise. History is append-only, so revision adds events rather than
//! rewriting them.

use thiserror::Error;

use crate::domain::{PhaseId, SessionEvent};

/// Errors from invalid machine transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("Phase {0} has not recorded a session event yet")]
    PhaseIncomplete(PhaseId),

    #[error("Cannot revise forward: {target} does not precede {current}")]
    NotEarlier { target: PhaseId, current: PhaseId },

    #[error("Run is already complete")]
    AlreadyComplete,

    #[error("Run is not complete; nothing to reopen")]
    NotComplete,
}

/// Current position in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    /// Executing the given phase
    Phase(PhaseId),
    /// All phases have recorded events
    Complete,
}

impl std::fmt::Display for PhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Phase(p) => write!(f, "{}", p),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// The phase state machine
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    current: PhaseState,
}

impl PhaseMachine {
    /// A fresh run starts at the first phase
    pub fn fresh() -> Self {
        Self {
            current: PhaseState::Phase(PhaseId::Context),
        }
    }

    /// Re-enter the workflow from recorded history: execution restarts at
    /// the first phase with no corresponding event. All phases recorded
    /// means the run is complete.
    pub fn resume(history: &[SessionEvent]) -> Self {
        let current = PhaseId::ALL
            .iter()
            .find(|phase| !history.iter().any(|e| e.phase == **phase))
            .map(|p| PhaseState::Phase(*p))
            .unwrap_or(PhaseState::Complete);
        Self { current }
    }

    /// Current position
    pub fn current(&self) -> PhaseState {
        self.current
    }

    /// Advance to the successor phase. Requires the current phase to have
    /// recorded at least one event.
    pub fn advance(&mut self, history: &[SessionEvent]) -> Result<PhaseState, MachineError> {
        let phase = match self.current {
            PhaseState::Phase(p) => p,
            PhaseState::Complete => return Err(MachineError::AlreadyComplete),
        };

        if !history.iter().any(|e| e.phase == phase) {
            return Err(MachineError::PhaseIncomplete(phase));
        }

        self.current = match phase.successor() {
            Some(next) => PhaseState::Phase(next),
            None => PhaseState::Complete,
        };
        Ok(self.current)
    }

    /// Explicit user-initiated revision: re-enter a named earlier phase.
    /// From a complete run any phase may be revised. Recorded events are
    /// untouched; the revised phase appends new ones.
    pub fn revise(&mut self, target: PhaseId) -> Result<(), MachineError> {
        match self.current {
            PhaseState::Complete => {}
            PhaseState::Phase(current) => {
                if target >= current {
                    return Err(MachineError::NotEarlier { target, current });
                }
            }
        }
        self.current = PhaseState::Phase(target);
        Ok(())
    }

    /// Loop a complete run back into the adaptation phase. Adaptation is
    /// re-entrant indefinitely for living-documentation updates.
    pub fn reopen(&mut self) -> Result<(), MachineError> {
        if self.current != PhaseState::Complete {
            return Err(MachineError::NotComplete);
        }
        self.current = PhaseState::Phase(PhaseId::Adaptation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(phase: PhaseId) -> SessionEvent {
        SessionEvent::now(phase, vec![format!("{} done", phase)])
    }

    #[test]
    fn test_fresh_starts_at_context() {
        let machine = PhaseMachine::fresh();
        assert_eq!(machine.current(), PhaseState::Phase(PhaseId::Context));
    }

    #[test]
    fn test_advance_requires_event() {
        let mut machine = PhaseMachine::fresh();
        let err = machine.advance(&[]).unwrap_err();
        assert_eq!(err, MachineError::PhaseIncomplete(PhaseId::Context));
        assert_eq!(machine.current(), PhaseState::Phase(PhaseId::Context));
    }

    #[test]
    fn test_advance_walks_phases_in_order() {
        let mut machine = PhaseMachine::fresh();
        let mut history = Vec::new();

        for expected in PhaseId::ALL {
            assert_eq!(machine.current(), PhaseState::Phase(expected));
            history.push(event(expected));
            machine.advance(&history).unwrap();
        }
        assert_eq!(machine.current(), PhaseState::Complete);
    }

    #[test]
    fn test_resume_at_first_missing_phase() {
        let history = vec![event(PhaseId::Context), event(PhaseId::OrchestrationSetup)];
        let machine = PhaseMachine::resume(&history);
        assert_eq!(machine.current(), PhaseState::Phase(PhaseId::DocScaffold));
    }

    #[test]
    fn test_resume_empty_history_is_fresh() {
        let machine = PhaseMachine::resume(&[]);
        assert_eq!(machine.current(), PhaseState::Phase(PhaseId::Context));
    }

    #[test]
    fn test_resume_full_history_is_complete() {
        let history: Vec<_> = PhaseId::ALL.iter().map(|p| event(*p)).collect();
        let machine = PhaseMachine::resume(&history);
        assert_eq!(machine.current(), PhaseState::Complete);
    }

    #[test]
    fn test_resume_ignores_out_of_order_events() {
        // A recorded Research event does not let Context be skipped
        let history = vec![event(PhaseId::Research)];
        let machine = PhaseMachine::resume(&history);
        assert_eq!(machine.current(), PhaseState::Phase(PhaseId::Context));
    }

    #[test]
    fn test_revise_only_backward() {
        let history = vec![
            event(PhaseId::Context),
            event(PhaseId::OrchestrationSetup),
            event(PhaseId::DocScaffold),
        ];
        let mut machine = PhaseMachine::resume(&history);
        assert_eq!(machine.current(), PhaseState::Phase(PhaseId::Research));

        machine.revise(PhaseId::OrchestrationSetup).unwrap();
        assert_eq!(machine.current(), PhaseState::Phase(PhaseId::OrchestrationSetup));

        let err = machine.revise(PhaseId::PlanGeneration).unwrap_err();
        assert!(matches!(err, MachineError::NotEarlier { .. }));
    }

    #[test]
    fn test_revise_from_complete() {
        let history: Vec<_> = PhaseId::ALL.iter().map(|p| event(*p)).collect();
        let mut machine = PhaseMachine::resume(&history);

        machine.revise(PhaseId::Research).unwrap();
        assert_eq!(machine.current(), PhaseState::Phase(PhaseId::Research));
    }

    #[test]
    fn test_complete_reopens_to_adaptation() {
        let history: Vec<_> = PhaseId::ALL.iter().map(|p| event(*p)).collect();
        let mut machine = PhaseMachine::resume(&history);
        assert_eq!(machine.current(), PhaseState::Complete);

        machine.reopen().unwrap();
        assert_eq!(machine.current(), PhaseState::Phase(PhaseId::Adaptation));

        // Adaptation already has an event, so it can complete again
        machine.advance(&history).unwrap();
        assert_eq!(machine.current(), PhaseState::Complete);

        // And reopen again, indefinitely
        machine.reopen().unwrap();
        assert_eq!(machine.current(), PhaseState::Phase(PhaseId::Adaptation));
    }

    #[test]
    fn test_reopen_requires_complete() {
        let mut machine = PhaseMachine::fresh();
        assert_eq!(machine.reopen().unwrap_err(), MachineError::NotComplete);
    }

    #[test]
    fn test_advance_from_complete_errors() {
        let history: Vec<_> = PhaseId::ALL.iter().map(|p| event(*p)).collect();
        let mut machine = PhaseMachine::resume(&history);
        assert_eq!(machine.advance(&history).unwrap_err(), MachineError::AlreadyComplete);
    }
}
