use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::collaborators::{
    CollaboratorKind, Transcriber, TranscriptionRequest, TranscriptionResult,
};
use crate::session::error::SessionError;
use crate::session::lifecycle::SessionEvent;
use crate::session::part::TestPart;
use crate::session::types::{Evaluation, Finalization, SessionPhase, SessionSnapshot};

use super::worker::{CommandReply, SessionCommand};

/// Caller-side façade of a running session. Dropping it stops the session.
pub struct SessionHandle {
    session_id: String,
    part: TestPart,
    command_tx: mpsc::Sender<SessionCommand>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    events_tx: broadcast::Sender<SessionEvent>,
    transcriber: Arc<dyn Transcriber>,
    worker: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub(super) fn new(
        session_id: String,
        part: TestPart,
        command_tx: mpsc::Sender<SessionCommand>,
        snapshot_rx: watch::Receiver<SessionSnapshot>,
        events_tx: broadcast::Sender<SessionEvent>,
        transcriber: Arc<dyn Transcriber>,
        worker: JoinHandle<()>,
    ) -> Self {
        Self {
            session_id,
            part,
            command_tx,
            snapshot_rx,
            events_tx,
            transcriber,
            worker: Some(worker),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn part(&self) -> TestPart {
        self.part
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    pub async fn record_candidate_utterance<S: Into<String>>(
        &self,
        text: S,
    ) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| SessionCommand::RecordCandidate { text, reply })
            .await
    }

    /// Transcribes a recorded answer and records its text.
    ///
    /// A transcription failure leaves the session untouched.
    pub async fn submit_audio(&self, audio: Bytes) -> Result<TranscriptionResult, SessionError> {
        self.submit_transcription(TranscriptionRequest::new(audio))
            .await
    }

    pub async fn submit_transcription(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, SessionError> {
        let phase = self.snapshot_rx.borrow().phase;
        if phase != SessionPhase::AwaitingCandidate {
            return Err(SessionError::invalid_state(
                "submit candidate audio",
                phase.as_str(),
            ));
        }

        let result = self.transcriber.transcribe(request).await.map_err(|err| {
            warn!(
                target: "session_manager",
                session_id = %self.session_id,
                %err,
                "transcription failed"
            );
            SessionError::from(err)
        })?;

        if result.text.trim().is_empty() {
            return Err(SessionError::Collaborator {
                kind: CollaboratorKind::Transcription,
                message: "no speech detected".to_string(),
            });
        }

        self.record_candidate_utterance(result.text.clone()).await?;
        Ok(result)
    }

    pub async fn abort(&self) -> Result<(), SessionError> {
        info!(
            target: "session_manager",
            session_id = %self.session_id,
            "abort requested"
        );
        self.request(|reply| SessionCommand::Abort { reply }).await
    }

    /// Resolves with the first snapshot accepted by `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionSnapshot, SessionError>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.snapshot_rx.clone();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if predicate(&*snapshot) {
                    return Ok(snapshot.clone());
                }
            }
            if rx.changed().await.is_err() {
                let snapshot = rx.borrow().clone();
                return if predicate(&snapshot) {
                    Ok(snapshot)
                } else {
                    Err(self.closed())
                };
            }
        }
    }

    /// Waits for the session to finish scoring.
    ///
    /// `Ok(None)` means nothing was scored (no candidate speech or aborted);
    /// scoring failures come back as the stored error.
    pub async fn wait_for_evaluation(&self) -> Result<Option<Arc<Evaluation>>, SessionError> {
        let snapshot = self
            .wait_for(|snapshot| snapshot.is_completed() && snapshot.finalization.is_settled())
            .await?;
        match snapshot.finalization {
            Finalization::Scored(evaluation) => Ok(Some(evaluation)),
            Finalization::Failed(error) => Err(error),
            _ => Ok(None),
        }
    }

    async fn request<F>(&self, command: F) -> Result<(), SessionError>
    where
        F: FnOnce(CommandReply) -> SessionCommand,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| self.closed())?;
        reply_rx.await.map_err(|_| self.closed())?
    }

    fn closed(&self) -> SessionError {
        SessionError::Closed(self.session_id.clone())
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
