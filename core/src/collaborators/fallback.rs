//! Offline collaborators used when no hosted AI service is configured.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::collaborators::error::{CollaboratorError, CollaboratorKind};
use crate::collaborators::traits::{DialogueEngine, Scorer, SpeechSynthesizer, Transcriber};
use crate::collaborators::types::{
    DialogueReply, DialogueRequest, ScoringRequest, SpeechRequest, TranscriptionRequest,
    TranscriptionResult,
};
use crate::session::{Evaluation, QuestionBank};

/// Asks the next question from the bank; never concludes the test itself.
pub struct QuestionBankDialogue {
    bank: Arc<dyn QuestionBank>,
}

impl QuestionBankDialogue {
    pub fn new(bank: Arc<dyn QuestionBank>) -> Self {
        Self { bank }
    }
}

#[async_trait]
impl DialogueEngine for QuestionBankDialogue {
    async fn next_turn(&self, request: DialogueRequest) -> Result<DialogueReply, CollaboratorError> {
        let question = self.bank.pick(request.part);
        Ok(DialogueReply::next(format!("Thank you. {question}")))
    }
}

/// Produces no audio.
#[derive(Debug, Default)]
pub struct SilentSpeech;

#[async_trait]
impl SpeechSynthesizer for SilentSpeech {
    async fn synthesize(&self, _request: SpeechRequest) -> Result<Bytes, CollaboratorError> {
        Ok(Bytes::new())
    }
}

/// Reports every call as a service failure.
#[derive(Debug, Default)]
pub struct UnavailableService;

impl UnavailableService {
    fn failure(kind: CollaboratorKind) -> CollaboratorError {
        CollaboratorError::service(kind, "no hosted service configured")
    }
}

#[async_trait]
impl Transcriber for UnavailableService {
    async fn transcribe(
        &self,
        _request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, CollaboratorError> {
        Err(Self::failure(CollaboratorKind::Transcription))
    }
}

#[async_trait]
impl Scorer for UnavailableService {
    async fn score(&self, _request: ScoringRequest) -> Result<Evaluation, CollaboratorError> {
        Err(Self::failure(CollaboratorKind::Scoring))
    }
}
