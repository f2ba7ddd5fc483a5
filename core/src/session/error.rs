use serde::Serialize;
use thiserror::Error;

use crate::collaborators::{CollaboratorError, CollaboratorKind};

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum SessionError {
    #[error("unknown test part: {0}")]
    InvalidPart(String),
    #[error("cannot {operation} while session is {phase}")]
    InvalidState {
        operation: &'static str,
        phase: &'static str,
    },
    #[error("{kind} collaborator failed: {message}")]
    Collaborator {
        kind: CollaboratorKind,
        message: String,
    },
    #[error("scoring payload rejected: {0}")]
    ScoringParse(String),
    #[error("session {0} is no longer running")]
    Closed(String),
}

impl SessionError {
    pub(crate) fn invalid_state(operation: &'static str, phase: &'static str) -> Self {
        Self::InvalidState { operation, phase }
    }

    /// Stable code carried by scoring telemetry and session notices.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidPart(_) => "invalid_part",
            SessionError::InvalidState { .. } => "invalid_state",
            SessionError::Collaborator { .. } => "collaborator_failure",
            SessionError::ScoringParse(_) => "scoring_parse",
            SessionError::Closed(_) => "closed",
        }
    }
}

impl From<CollaboratorError> for SessionError {
    fn from(error: CollaboratorError) -> Self {
        match error {
            CollaboratorError::Service { kind, message } => {
                SessionError::Collaborator { kind, message }
            }
            CollaboratorError::ScoringParse(message) => SessionError::ScoringParse(message),
        }
    }
}
