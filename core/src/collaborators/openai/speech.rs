use async_trait::async_trait;
use bytes::Bytes;

use crate::collaborators::error::CollaboratorError;
use crate::collaborators::traits::SpeechSynthesizer;
use crate::collaborators::types::SpeechRequest;

use super::client::OpenAiClient;

pub struct OpenAiSpeech {
    client: OpenAiClient,
}

impl OpenAiSpeech {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, request: SpeechRequest) -> Result<Bytes, CollaboratorError> {
        self.client.speech(request).await
    }
}
