use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which external service a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorKind {
    Transcription,
    Dialogue,
    Scoring,
    Speech,
}

impl CollaboratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollaboratorKind::Transcription => "transcription",
            CollaboratorKind::Dialogue => "dialogue",
            CollaboratorKind::Scoring => "scoring",
            CollaboratorKind::Speech => "speech",
        }
    }
}

impl fmt::Display for CollaboratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{kind} service failed: {message}")]
    Service {
        kind: CollaboratorKind,
        message: String,
    },
    #[error("malformed scoring payload: {0}")]
    ScoringParse(String),
}

impl CollaboratorError {
    pub fn service(kind: CollaboratorKind, message: impl Into<String>) -> Self {
        Self::Service {
            kind,
            message: message.into(),
        }
    }

    pub fn scoring_parse(message: impl Into<String>) -> Self {
        Self::ScoringParse(message.into())
    }

    pub fn kind(&self) -> CollaboratorKind {
        match self {
            CollaboratorError::Service { kind, .. } => *kind,
            CollaboratorError::ScoringParse(_) => CollaboratorKind::Scoring,
        }
    }
}
