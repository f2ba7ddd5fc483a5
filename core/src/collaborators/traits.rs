use async_trait::async_trait;
use bytes::Bytes;

use crate::collaborators::error::CollaboratorError;
use crate::collaborators::types::{
    DialogueReply, DialogueRequest, ScoringRequest, SpeechRequest, TranscriptionRequest,
    TranscriptionResult,
};
use crate::session::Evaluation;

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, CollaboratorError>;
}

#[async_trait]
pub trait DialogueEngine: Send + Sync {
    async fn next_turn(&self, request: DialogueRequest) -> Result<DialogueReply, CollaboratorError>;
}

#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, request: ScoringRequest) -> Result<Evaluation, CollaboratorError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: SpeechRequest) -> Result<Bytes, CollaboratorError>;
}
