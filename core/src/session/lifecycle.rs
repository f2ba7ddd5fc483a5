//! Session lifecycle broadcast payloads.

use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;

use super::error::SessionError;
use super::types::{CompletionReason, Evaluation, Finalization, SessionPhase, SessionSnapshot};

/// Coarse phases surfaced to UI subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecyclePhase {
    Idle,
    AwaitingCandidate,
    AwaitingExaminer,
    Scoring,
    Completed,
    Failed,
    Aborted,
}

impl SessionLifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionLifecyclePhase::Idle => "idle",
            SessionLifecyclePhase::AwaitingCandidate => "awaiting_candidate",
            SessionLifecyclePhase::AwaitingExaminer => "awaiting_examiner",
            SessionLifecyclePhase::Scoring => "scoring",
            SessionLifecyclePhase::Completed => "completed",
            SessionLifecyclePhase::Failed => "failed",
            SessionLifecyclePhase::Aborted => "aborted",
        }
    }
}

impl SessionSnapshot {
    /// Maps the fine-grained state onto a lifecycle phase.
    pub fn lifecycle_phase(&self) -> SessionLifecyclePhase {
        match self.phase {
            SessionPhase::NotStarted => SessionLifecyclePhase::Idle,
            SessionPhase::AwaitingCandidate => SessionLifecyclePhase::AwaitingCandidate,
            SessionPhase::AwaitingExaminer => SessionLifecyclePhase::AwaitingExaminer,
            SessionPhase::Completed => match self.finalization {
                Finalization::NotStarted | Finalization::Pending => SessionLifecyclePhase::Scoring,
                Finalization::Skipped | Finalization::Scored(_) => SessionLifecyclePhase::Completed,
                Finalization::Failed(_) => SessionLifecyclePhase::Failed,
                Finalization::Cancelled => SessionLifecyclePhase::Aborted,
            },
        }
    }
}

/// Extra information attached to a lifecycle event.
#[derive(Debug, Clone, Default)]
pub enum SessionLifecyclePayload {
    #[default]
    None,
    Completed(CompletionPayload),
    Failed(FailurePayload),
}

#[derive(Debug, Clone)]
pub struct CompletionPayload {
    pub reason: CompletionReason,
    /// Absent when there was no candidate speech to score.
    pub evaluation: Option<Arc<Evaluation>>,
}

#[derive(Debug, Clone)]
pub struct FailurePayload {
    pub reason: Option<CompletionReason>,
    pub error: SessionError,
}

#[derive(Debug, Clone)]
pub struct SessionLifecycleUpdate {
    pub session_id: String,
    pub phase: SessionLifecyclePhase,
    pub issued_at: SystemTime,
    pub payload: SessionLifecyclePayload,
}

impl SessionLifecycleUpdate {
    pub fn new<S: Into<String>>(session_id: S, phase: SessionLifecyclePhase) -> Self {
        Self {
            session_id: session_id.into(),
            phase,
            issued_at: SystemTime::now(),
            payload: SessionLifecyclePayload::None,
        }
    }

    pub fn completed<S: Into<String>>(
        session_id: S,
        reason: CompletionReason,
        evaluation: Option<Arc<Evaluation>>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            phase: SessionLifecyclePhase::Completed,
            issued_at: SystemTime::now(),
            payload: SessionLifecyclePayload::Completed(CompletionPayload { reason, evaluation }),
        }
    }

    pub fn failed<S: Into<String>>(
        session_id: S,
        reason: Option<CompletionReason>,
        error: SessionError,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            phase: SessionLifecyclePhase::Failed,
            issued_at: SystemTime::now(),
            payload: SessionLifecyclePayload::Failed(FailurePayload { reason, error }),
        }
    }

    /// Builds the update matching a snapshot, with payloads for terminal phases.
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let phase = snapshot.lifecycle_phase();
        match (&snapshot.finalization, snapshot.completion) {
            (Finalization::Scored(evaluation), Some(reason)) => {
                Self::completed(&snapshot.session_id, reason, Some(Arc::clone(evaluation)))
            }
            (Finalization::Skipped, Some(reason)) => {
                Self::completed(&snapshot.session_id, reason, None)
            }
            (Finalization::Failed(error), reason) => {
                Self::failed(&snapshot.session_id, reason, error.clone())
            }
            _ => Self::new(&snapshot.session_id, phase),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct SessionNotice {
    pub level: NoticeLevel,
    pub message: String,
    /// `SessionError::code` of the failure behind the notice, if any.
    pub code: Option<&'static str>,
}

/// Everything a session broadcasts to its subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Lifecycle(SessionLifecycleUpdate),
    ExaminerUtterance { session_id: String, text: String },
    ExaminerAudio { session_id: String, text: String, audio: Bytes },
    Notice { session_id: String, notice: SessionNotice },
}
