use async_trait::async_trait;
use serde::Deserialize;

use crate::collaborators::error::{CollaboratorError, CollaboratorKind};
use crate::collaborators::traits::Scorer;
use crate::collaborators::types::ScoringRequest;
use crate::session::{CriterionFeedback, Evaluation};

use super::client::OpenAiClient;
use super::{prompts, strip_code_fence};

const SCORING_TEMPERATURE: f32 = 0.2;

pub struct OpenAiScorer {
    client: OpenAiClient,
}

impl OpenAiScorer {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Scorer for OpenAiScorer {
    async fn score(&self, request: ScoringRequest) -> Result<Evaluation, CollaboratorError> {
        let content = self
            .client
            .chat_json(
                CollaboratorKind::Scoring,
                prompts::scoring_messages(&request),
                SCORING_TEMPERATURE,
            )
            .await?;
        parse_evaluation(&content)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct RawEvaluation {
    #[serde(alias = "fluencyCoherence", alias = "fluency_and_coherence")]
    fluency_coherence: RawCriterion,
    #[serde(alias = "lexicalResource")]
    lexical_resource: RawCriterion,
    #[serde(alias = "grammaticalRange", alias = "grammatical_range_and_accuracy")]
    grammatical_range: RawCriterion,
    pronunciation: RawCriterion,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default, alias = "bandDescriptor")]
    band_descriptor: String,
}

#[derive(Debug, Deserialize)]
struct RawCriterion {
    #[serde(alias = "band")]
    score: f32,
    #[serde(default)]
    strengths: String,
    #[serde(default)]
    weaknesses: String,
}

impl From<RawCriterion> for CriterionFeedback {
    fn from(raw: RawCriterion) -> Self {
        CriterionFeedback {
            band: raw.score,
            strengths: raw.strengths.trim().to_string(),
            weaknesses: raw.weaknesses.trim().to_string(),
        }
    }
}

/// Validates the model's structured answer; anything off-contract is a parse error.
pub(crate) fn parse_evaluation(content: &str) -> Result<Evaluation, CollaboratorError> {
    let raw: RawEvaluation = serde_json::from_str(strip_code_fence(content))
        .map_err(|err| CollaboratorError::scoring_parse(err.to_string()))?;

    Evaluation::from_criteria(
        raw.fluency_coherence.into(),
        raw.lexical_resource.into(),
        raw.grammatical_range.into(),
        raw.pronunciation.into(),
        raw.recommendations
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        raw.band_descriptor.trim(),
    )
    .map_err(CollaboratorError::scoring_parse)
}
