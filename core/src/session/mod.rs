//! Speaking-test sessions: the state machine, its actor and the manager that starts them.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod machine;
pub mod part;
pub mod question_bank;
pub mod runtime;
pub mod types;


pub use config::SessionConfig;
pub use error::SessionError;
pub use lifecycle::{
    NoticeLevel, SessionEvent, SessionLifecyclePayload, SessionLifecyclePhase,
    SessionLifecycleUpdate, SessionNotice,
};
pub use machine::{Effect, SessionState};
pub use part::{PartPolicy, PartPolicyTable, PromptStyle, TestPart};
pub use question_bank::{QuestionBank, SequentialQuestionBank, StaticQuestionBank};
pub use runtime::SessionHandle;
pub use types::{
    CompletionReason, CriterionFeedback, Evaluation, Finalization, SessionPhase, SessionSnapshot,
    Speaker, Utterance,
};

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::collaborators::{CollaboratorSet, OpenAiConfig};

const LIFECYCLE_CAPACITY: usize = 32;

/// Starts sessions and fans their lifecycle updates into one channel.
pub struct SessionManager {
    config: SessionConfig,
    collaborators: CollaboratorSet,
    question_bank: Arc<dyn QuestionBank>,
    lifecycle_tx: broadcast::Sender<SessionLifecycleUpdate>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        collaborators: CollaboratorSet,
        question_bank: Arc<dyn QuestionBank>,
    ) -> Self {
        let (lifecycle_tx, _) = broadcast::channel(LIFECYCLE_CAPACITY);
        Self {
            config,
            collaborators,
            question_bank,
            lifecycle_tx,
        }
    }

    /// Hosted collaborators when `OPENAI_API_KEY` is set, offline ones otherwise.
    pub fn from_env() -> Result<Self> {
        let config = SessionConfig::from_env();
        let question_bank: Arc<dyn QuestionBank> = Arc::new(StaticQuestionBank::default());

        let collaborators = match OpenAiConfig::from_env() {
            Ok(openai) => CollaboratorSet::openai(openai)?,
            Err(err) => {
                warn!(
                    target: "session_manager",
                    %err,
                    "hosted services unavailable, running offline"
                );
                CollaboratorSet::offline(Arc::clone(&question_bank))
            }
        };

        Ok(Self::new(config, collaborators, question_bank))
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<SessionLifecycleUpdate> {
        self.lifecycle_tx.subscribe()
    }

    /// Starts a session for `part`. The examiner opening arrives on the returned receiver.
    pub fn start_session(
        &self,
        part: TestPart,
    ) -> (SessionHandle, broadcast::Receiver<SessionEvent>) {
        let session_id = Uuid::new_v4().to_string();
        let opening = self.question_bank.opening(part);
        info!(
            target: "session_manager",
            %session_id,
            part = part.as_str(),
            "starting session"
        );

        runtime::spawn_session(
            session_id,
            part,
            opening,
            self.config.clone(),
            self.collaborators.clone(),
            self.lifecycle_tx.clone(),
        )
    }

    /// Like [`start_session`](Self::start_session) with a user-supplied label such as `"part2"`.
    pub fn start_session_by_label(
        &self,
        label: &str,
    ) -> Result<(SessionHandle, broadcast::Receiver<SessionEvent>), SessionError> {
        let part = label.parse::<TestPart>()?;
        Ok(self.start_session(part))
    }
}
