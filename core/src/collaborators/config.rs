use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub speech_model: String,
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            transcription_model: "whisper-1".to_string(),
            speech_model: "tts-1".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;

        let mut config = Self::new(api_key);
        if let Some(url) = env_override("OPENAI_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = env_override("SPEAKING_COACH_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Some(model) = env_override("SPEAKING_COACH_TRANSCRIPTION_MODEL") {
            config.transcription_model = model;
        }
        if let Some(model) = env_override("SPEAKING_COACH_SPEECH_MODEL") {
            config.speech_model = model;
        }
        Ok(config)
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

pub(crate) fn env_override(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
