use async_trait::async_trait;
use serde::Deserialize;

use crate::collaborators::error::{CollaboratorError, CollaboratorKind};
use crate::collaborators::traits::DialogueEngine;
use crate::collaborators::types::{DialogueReply, DialogueRequest};

use super::client::OpenAiClient;
use super::{prompts, strip_code_fence};

const DIALOGUE_TEMPERATURE: f32 = 0.7;

pub struct OpenAiDialogue {
    client: OpenAiClient,
}

impl OpenAiDialogue {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DialogueEngine for OpenAiDialogue {
    async fn next_turn(&self, request: DialogueRequest) -> Result<DialogueReply, CollaboratorError> {
        let content = self
            .client
            .chat_json(
                CollaboratorKind::Dialogue,
                prompts::dialogue_messages(&request),
                DIALOGUE_TEMPERATURE,
            )
            .await?;
        parse_dialogue_reply(&content)
    }
}

#[derive(Debug, Deserialize)]
struct RawDialogueReply {
    #[serde(default, alias = "examinerText", alias = "response")]
    examiner_text: String,
    #[serde(default, alias = "testComplete")]
    test_complete: bool,
}

/// Accepts the JSON contract, or a bare JSON string or plain text treated as
/// the next examiner line.
fn parse_dialogue_reply(content: &str) -> Result<DialogueReply, CollaboratorError> {
    let body = strip_code_fence(content);
    let reply = match serde_json::from_str::<RawDialogueReply>(body) {
        Ok(raw) => DialogueReply {
            examiner_text: raw.examiner_text.trim().to_string(),
            test_complete: raw.test_complete,
        },
        Err(_) if body.starts_with('"') => match serde_json::from_str::<String>(body) {
            Ok(text) => DialogueReply::next(text.trim()),
            Err(_) => DialogueReply::next(body.trim_matches('"').trim()),
        },
        Err(_) if !body.starts_with('{') => DialogueReply::next(body),
        Err(err) => {
            return Err(CollaboratorError::service(
                CollaboratorKind::Dialogue,
                format!("unreadable dialogue reply: {err}"),
            ))
        }
    };

    if reply.examiner_text.is_empty() && !reply.test_complete {
        return Err(CollaboratorError::service(
            CollaboratorKind::Dialogue,
            "dialogue reply carried no examiner text",
        ));
    }
    Ok(reply)
}
