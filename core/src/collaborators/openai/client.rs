use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::collaborators::config::OpenAiConfig;
use crate::collaborators::error::{CollaboratorError, CollaboratorKind};
use crate::collaborators::types::{SpeechRequest, TranscriptionRequest, TranscriptionResult};

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub(crate) fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub(crate) fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub(crate) fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Shared HTTP client; cheap to clone.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: Arc<OpenAiConfig>,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Runs a JSON-mode chat completion and returns the raw message content.
    pub(crate) async fn chat_json(
        &self,
        kind: CollaboratorKind,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<String, CollaboratorError> {
        let body = json!({
            "model": self.config.chat_model,
            "messages": messages,
            "temperature": temperature,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| CollaboratorError::service(kind, err.to_string()))?;

        let completion: ChatCompletion = ensure_success(kind, response)
            .await?
            .json()
            .await
            .map_err(|err| CollaboratorError::service(kind, format!("invalid completion: {err}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| CollaboratorError::service(kind, "completion carried no content"))
    }

    pub(crate) async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, CollaboratorError> {
        let kind = CollaboratorKind::Transcription;
        let mime = mime_for(&request.file_name);
        debug!(
            target: "collaborators",
            bytes = request.audio.len(),
            file_name = %request.file_name,
            mime,
            "uploading answer audio"
        );

        let file = Part::bytes(request.audio.to_vec())
            .file_name(request.file_name)
            .mime_str(mime)
            .map_err(|err| CollaboratorError::service(kind, err.to_string()))?;
        let mut form = Form::new()
            .part("file", file)
            .text("model", self.config.transcription_model.clone())
            .text("response_format", "verbose_json");
        if let Some(language) = request.language_hint {
            form = form.text("language", language);
        }

        let response = self
            .http
            .post(self.config.endpoint("audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|err| CollaboratorError::service(kind, err.to_string()))?;

        ensure_success(kind, response)
            .await?
            .json::<TranscriptionResult>()
            .await
            .map_err(|err| CollaboratorError::service(kind, format!("invalid transcription: {err}")))
    }

    pub(crate) async fn speech(&self, request: SpeechRequest) -> Result<Bytes, CollaboratorError> {
        let kind = CollaboratorKind::Speech;
        let body = json!({
            "model": self.config.speech_model,
            "input": request.text,
            "voice": request.voice_id,
            "response_format": "mp3",
        });

        let response = self
            .http
            .post(self.config.endpoint("audio/speech"))
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|err| CollaboratorError::service(kind, err.to_string()))?;

        ensure_success(kind, response)
            .await?
            .bytes()
            .await
            .map_err(|err| CollaboratorError::service(kind, err.to_string()))
    }
}

async fn ensure_success(
    kind: CollaboratorKind,
    response: Response,
) -> Result<Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    Err(CollaboratorError::service(
        kind,
        format!("http {status}: {excerpt}"),
    ))
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        _ => "audio/webm",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_follows_file_extension() {
        assert_eq!(mime_for("answer.wav"), "audio/wav");
        assert_eq!(mime_for("answer.MP3"), "audio/mpeg");
        assert_eq!(mime_for("answer.webm"), "audio/webm");
        assert_eq!(mime_for("recording"), "audio/webm");
    }

    #[test]
    fn chat_messages_serialize_with_role() {
        let value = serde_json::to_value(ChatMessage::assistant("Hello")).expect("serialize");
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"], "Hello");
    }
}
