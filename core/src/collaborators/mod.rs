//! External AI service boundaries: transcription, dialogue, scoring and speech.

mod error;
mod traits;
mod types;

pub mod config;
pub mod fallback;
pub mod openai;

pub use config::OpenAiConfig;
pub use error::{CollaboratorError, CollaboratorKind};
pub use traits::{DialogueEngine, Scorer, SpeechSynthesizer, Transcriber};
pub use types::{
    DialogueReply, DialogueRequest, ScoringRequest, SpeechRequest, TranscriptSegment,
    TranscriptionRequest, TranscriptionResult,
};

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::collaborators::fallback::{QuestionBankDialogue, SilentSpeech, UnavailableService};
use crate::collaborators::openai::{
    OpenAiClient, OpenAiDialogue, OpenAiScorer, OpenAiSpeech, OpenAiTranscriber,
};
use crate::session::QuestionBank;

/// The four services a session depends on.
#[derive(Clone)]
pub struct CollaboratorSet {
    pub transcriber: Arc<dyn Transcriber>,
    pub dialogue: Arc<dyn DialogueEngine>,
    pub scorer: Arc<dyn Scorer>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}

impl CollaboratorSet {
    pub fn with_components(
        transcriber: Arc<dyn Transcriber>,
        dialogue: Arc<dyn DialogueEngine>,
        scorer: Arc<dyn Scorer>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            transcriber,
            dialogue,
            scorer,
            speech,
        }
    }

    pub fn openai(config: OpenAiConfig) -> Result<Self> {
        info!(
            target: "collaborators",
            base_url = %config.base_url,
            chat_model = %config.chat_model,
            "using hosted collaborators"
        );
        let client = OpenAiClient::new(config)?;
        Ok(Self::with_components(
            Arc::new(OpenAiTranscriber::new(client.clone())),
            Arc::new(OpenAiDialogue::new(client.clone())),
            Arc::new(OpenAiScorer::new(client.clone())),
            Arc::new(OpenAiSpeech::new(client)),
        ))
    }

    /// Question-bank dialogue without transcription, scoring or audio.
    pub fn offline(bank: Arc<dyn QuestionBank>) -> Self {
        Self::with_components(
            Arc::new(UnavailableService),
            Arc::new(QuestionBankDialogue::new(bank)),
            Arc::new(UnavailableService),
            Arc::new(SilentSpeech),
        )
    }
}
