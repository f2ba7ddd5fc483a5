//! OpenAI-compatible HTTP backends for the four collaborators.

mod client;
mod dialogue;
mod prompts;
mod scoring;
mod speech;
mod transcription;

pub use client::OpenAiClient;
pub use dialogue::OpenAiDialogue;
pub use scoring::OpenAiScorer;
pub use speech::OpenAiSpeech;
pub use transcription::OpenAiTranscriber;

/// Models occasionally wrap JSON answers in markdown fences.
pub(crate) fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
