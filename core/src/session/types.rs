//! Session domain models shared by the state machine, the runtime and IPC layers.

use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::error::SessionError;
use super::part::TestPart;

/// Highest band on the assessment rubric.
pub const MAX_BAND: f32 = 9.0;
/// Bands are reported in half-band steps.
pub const BAND_STEP: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Candidate,
    Examiner,
}

/// One turn of the conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
    pub spoken_at: SystemTime,
}

impl Utterance {
    pub fn candidate<S: Into<String>>(text: S) -> Self {
        Self {
            speaker: Speaker::Candidate,
            text: text.into(),
            spoken_at: SystemTime::now(),
        }
    }

    pub fn examiner<S: Into<String>>(text: S) -> Self {
        Self {
            speaker: Speaker::Examiner,
            text: text.into(),
            spoken_at: SystemTime::now(),
        }
    }
}

/// Score and feedback for one rubric criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionFeedback {
    pub band: f32,
    pub strengths: String,
    pub weaknesses: String,
}

/// Final scoring result of a completed session.
///
/// Constructed once through [`Evaluation::from_criteria`], which validates each
/// criterion band and derives the overall band; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    fluency_coherence: CriterionFeedback,
    lexical_resource: CriterionFeedback,
    grammatical_range: CriterionFeedback,
    pronunciation: CriterionFeedback,
    overall_band: f32,
    recommendations: Vec<String>,
    band_descriptor: String,
}

impl Evaluation {
    pub fn from_criteria(
        fluency_coherence: CriterionFeedback,
        lexical_resource: CriterionFeedback,
        grammatical_range: CriterionFeedback,
        pronunciation: CriterionFeedback,
        recommendations: Vec<String>,
        band_descriptor: impl Into<String>,
    ) -> Result<Self, String> {
        let criteria = [
            ("fluency_coherence", &fluency_coherence),
            ("lexical_resource", &lexical_resource),
            ("grammatical_range", &grammatical_range),
            ("pronunciation", &pronunciation),
        ];

        for (name, feedback) in criteria.iter() {
            if !feedback.band.is_finite() || feedback.band < 0.0 || feedback.band > MAX_BAND {
                return Err(format!(
                    "{name} band {} outside 0-{MAX_BAND}",
                    feedback.band
                ));
            }
        }

        let fluency_coherence = round_criterion(fluency_coherence);
        let lexical_resource = round_criterion(lexical_resource);
        let grammatical_range = round_criterion(grammatical_range);
        let pronunciation = round_criterion(pronunciation);

        // Overall band is derived from the reported (rounded) criterion bands.
        let mean = (fluency_coherence.band
            + lexical_resource.band
            + grammatical_range.band
            + pronunciation.band)
            / 4.0;

        Ok(Self {
            fluency_coherence,
            lexical_resource,
            grammatical_range,
            pronunciation,
            overall_band: round_band(mean),
            recommendations,
            band_descriptor: band_descriptor.into(),
        })
    }

    pub fn fluency_coherence(&self) -> &CriterionFeedback {
        &self.fluency_coherence
    }

    pub fn lexical_resource(&self) -> &CriterionFeedback {
        &self.lexical_resource
    }

    pub fn grammatical_range(&self) -> &CriterionFeedback {
        &self.grammatical_range
    }

    pub fn pronunciation(&self) -> &CriterionFeedback {
        &self.pronunciation
    }

    pub fn overall_band(&self) -> f32 {
        self.overall_band
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    pub fn band_descriptor(&self) -> &str {
        &self.band_descriptor
    }
}

/// Rounds to the nearest half band, halves rounding up.
pub fn round_band(value: f32) -> f32 {
    ((value / BAND_STEP).round() * BAND_STEP).clamp(0.0, MAX_BAND)
}

fn round_criterion(mut feedback: CriterionFeedback) -> CriterionFeedback {
    feedback.band = round_band(feedback.band);
    feedback
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    AwaitingCandidate,
    AwaitingExaminer,
    Completed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::NotStarted => "not_started",
            SessionPhase::AwaitingCandidate => "awaiting_candidate",
            SessionPhase::AwaitingExaminer => "awaiting_examiner",
            SessionPhase::Completed => "completed",
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            SessionPhase::AwaitingCandidate | SessionPhase::AwaitingExaminer
        )
    }
}

/// Why a session reached `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    QuestionsExhausted,
    TimeExpired,
    ExaminerConcluded,
    Aborted,
}

impl CompletionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionReason::QuestionsExhausted => "questions_exhausted",
            CompletionReason::TimeExpired => "time_expired",
            CompletionReason::ExaminerConcluded => "examiner_concluded",
            CompletionReason::Aborted => "aborted",
        }
    }
}

/// Progress of the one-shot scoring step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Finalization {
    NotStarted,
    /// No candidate speech to score.
    Skipped,
    Pending,
    Scored(Arc<Evaluation>),
    Failed(SessionError),
    /// Session aborted before finalization.
    Cancelled,
}

impl Finalization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Finalization::NotStarted => "not_started",
            Finalization::Skipped => "skipped",
            Finalization::Pending => "pending",
            Finalization::Scored(_) => "scored",
            Finalization::Failed(_) => "failed",
            Finalization::Cancelled => "cancelled",
        }
    }

    /// True once no further scoring outcome can arrive.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            Finalization::Skipped
                | Finalization::Scored(_)
                | Finalization::Failed(_)
                | Finalization::Cancelled
        )
    }

    pub fn evaluation(&self) -> Option<&Arc<Evaluation>> {
        match self {
            Finalization::Scored(evaluation) => Some(evaluation),
            _ => None,
        }
    }
}

/// Read model published to callers after every processed event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub part: TestPart,
    pub phase: SessionPhase,
    pub started_at: Option<SystemTime>,
    pub time_remaining_secs: u32,
    pub questions_asked: u32,
    pub total_questions: u32,
    pub transcript: Vec<Utterance>,
    pub completion: Option<CompletionReason>,
    pub finalization: Finalization,
}

impl SessionSnapshot {
    pub fn is_completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }
}
