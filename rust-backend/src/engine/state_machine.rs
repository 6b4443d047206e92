// src/engine/state_machine.rs
//
// Pure `Copier.status` transition rules (§4.3.1). The engine calls these
// before touching any I/O so an invalid transition never reaches the
// database or a subscription.

use crate::db::models::CopierStatus;
use crate::utils::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Pause,
    Fault,
}

/// Validates `current -> command` and returns the resulting status.
/// `start` on an already-ACTIVE copier is reported via `AlreadyRunning`
/// rather than a generic transition error (§4.3.1).
pub fn transition(current: CopierStatus, command: Command) -> Result<CopierStatus, EngineError> {
    use Command::*;
    use CopierStatus::*;

    match (current, command) {
        (Stopped, Start) | (Paused, Start) => Ok(Active),
        (Active, Start) => Err(EngineError::AlreadyRunning),
        (Active, Stop) | (Error, Stop) => Ok(Stopped),
        (Active, Pause) => Ok(Paused),
        (_, Fault) => Ok(Error),
        (state, command) => Err(EngineError::CannotStart(format!(
            "{command:?} is not valid from {state:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CopierStatus::*;

    #[test]
    fn stopped_to_active_via_start() {
        assert!(matches!(transition(Stopped, Command::Start), Ok(Active)));
    }

    #[test]
    fn paused_to_active_via_start() {
        assert!(matches!(transition(Paused, Command::Start), Ok(Active)));
    }

    #[test]
    fn active_start_is_already_running() {
        assert!(matches!(
            transition(Active, Command::Start),
            Err(EngineError::AlreadyRunning)
        ));
    }

    #[test]
    fn active_to_stopped_via_stop() {
        assert!(matches!(transition(Active, Command::Stop), Ok(Stopped)));
    }

    #[test]
    fn active_to_paused_via_pause() {
        assert!(matches!(transition(Active, Command::Pause), Ok(Paused)));
    }

    #[test]
    fn error_to_stopped_via_stop() {
        assert!(matches!(transition(Error, Command::Stop), Ok(Stopped)));
    }

    #[test]
    fn any_state_to_error_via_fault() {
        for state in [Stopped, Active, Paused, Error] {
            assert!(matches!(transition(state, Command::Fault), Ok(CopierStatus::Error)));
        }
    }

    #[test]
    fn stopped_cannot_pause() {
        assert!(transition(Stopped, Command::Pause).is_err());
    }
}
