use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::session::{PromptStyle, TestPart, Utterance};

#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Bytes,
    /// File name forwarded to the service so it can infer the container format.
    pub file_name: String,
    pub language_hint: Option<String>,
}

impl TranscriptionRequest {
    pub fn new(audio: Bytes) -> Self {
        Self {
            audio,
            file_name: "answer.webm".to_string(),
            language_hint: Some("en".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

/// Context handed to the dialogue service when the examiner should speak next.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueRequest {
    pub part: TestPart,
    /// Style of the session's part policy, which may override the part default.
    pub style: PromptStyle,
    pub latest_candidate_text: String,
    pub transcript: Vec<Utterance>,
    pub questions_asked: u32,
    pub total_questions: u32,
    pub time_remaining_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueReply {
    pub examiner_text: String,
    #[serde(default)]
    pub test_complete: bool,
}

impl DialogueReply {
    pub fn next<S: Into<String>>(examiner_text: S) -> Self {
        Self {
            examiner_text: examiner_text.into(),
            test_complete: false,
        }
    }

    pub fn concluding<S: Into<String>>(examiner_text: S) -> Self {
        Self {
            examiner_text: examiner_text.into(),
            test_complete: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringRequest {
    /// All candidate utterances joined in order.
    pub transcript: String,
    pub part: TestPart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
}
