use async_trait::async_trait;

use crate::collaborators::error::CollaboratorError;
use crate::collaborators::traits::Transcriber;
use crate::collaborators::types::{TranscriptionRequest, TranscriptionResult};

use super::client::OpenAiClient;

pub struct OpenAiTranscriber {
    client: OpenAiClient,
}

impl OpenAiTranscriber {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, CollaboratorError> {
        let mut result = self.client.transcribe(request).await?;
        result.text = result.text.trim().to_string();
        Ok(result)
    }
}
