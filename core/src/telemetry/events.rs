use serde::Serialize;
use tracing::{info, warn};

use crate::session::{Finalization, SessionError};

pub(crate) const TARGET: &str = "telemetry::session";
pub(crate) const EVENT_STARTED: &str = "session_started";
pub(crate) const EVENT_COMPLETED: &str = "session_completed";
pub(crate) const EVENT_DIALOGUE_FALLBACK: &str = "session_dialogue_fallback";
pub(crate) const EVENT_SCORING: &str = "session_scoring";
pub(crate) const EVENT_SPEECH_FAILURE: &str = "session_speech_failure";
pub(crate) const EVENT_STALE_RESPONSE: &str = "session_stale_response";

#[derive(Debug, Serialize)]
pub struct SessionStartedEvent<'a> {
    pub session_id: &'a str,
    pub part: &'static str,
    pub total_questions: u32,
    pub duration_secs: u32,
}

#[derive(Debug, Serialize)]
pub struct SessionCompletedEvent<'a> {
    pub session_id: &'a str,
    pub reason: &'static str,
    pub questions_asked: u32,
    pub time_remaining_secs: u32,
}

#[derive(Debug, Serialize)]
pub struct DialogueFallbackEvent<'a> {
    pub session_id: &'a str,
    pub questions_asked: u32,
    pub error: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ScoringOutcomeEvent<'a> {
    pub session_id: &'a str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_band: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn record_session_started(
    session_id: &str,
    part: &'static str,
    total_questions: u32,
    duration_secs: u32,
) {
    let event = SessionStartedEvent {
        session_id,
        part,
        total_questions,
        duration_secs,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_STARTED,
            session_id,
            part,
            total_questions,
            duration_secs,
            payload = %payload
        ),
        Err(err) => encode_failed(EVENT_STARTED, err),
    }
}

pub fn record_session_completed(
    session_id: &str,
    reason: &'static str,
    questions_asked: u32,
    time_remaining_secs: u32,
) {
    let event = SessionCompletedEvent {
        session_id,
        reason,
        questions_asked,
        time_remaining_secs,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_COMPLETED,
            session_id,
            reason,
            questions_asked,
            time_remaining_secs,
            payload = %payload
        ),
        Err(err) => encode_failed(EVENT_COMPLETED, err),
    }
}

pub fn record_dialogue_fallback(session_id: &str, questions_asked: u32, error: &str) {
    let event = DialogueFallbackEvent {
        session_id,
        questions_asked,
        error,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_DIALOGUE_FALLBACK,
            session_id,
            questions_asked,
            error,
            payload = %payload
        ),
        Err(err) => encode_failed(EVENT_DIALOGUE_FALLBACK, err),
    }
}

pub fn record_scoring_outcome(session_id: &str, finalization: &Finalization) {
    let failure = match finalization {
        Finalization::Failed(err) => Some(err),
        _ => None,
    };
    let event = ScoringOutcomeEvent {
        session_id,
        status: finalization.as_str(),
        overall_band: finalization.evaluation().map(|evaluation| evaluation.overall_band()),
        code: failure.map(SessionError::code),
        error: failure.map(ToString::to_string),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_SCORING,
            session_id,
            status = event.status,
            overall_band = ?event.overall_band,
            code = ?event.code,
            payload = %payload
        ),
        Err(err) => encode_failed(EVENT_SCORING, err),
    }
}

pub fn record_speech_failure(session_id: &str, error: &str) {
    warn!(
        target: TARGET,
        event = EVENT_SPEECH_FAILURE,
        session_id,
        error,
        "examiner audio unavailable"
    );
}

pub fn record_stale_response(session_id: &str, collaborator: &'static str, generation: u64) {
    info!(
        target: TARGET,
        event = EVENT_STALE_RESPONSE,
        session_id,
        collaborator,
        generation,
        "discarded collaborator response for a superseded request"
    );
}

fn encode_failed(event: &'static str, err: serde_json::Error) {
    warn!(
        target: TARGET,
        event,
        %err,
        "failed to encode session telemetry event"
    );
}
