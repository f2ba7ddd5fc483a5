use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant as TokioInstant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::collaborators::{
    CollaboratorError, CollaboratorSet, DialogueReply, DialogueRequest, ScoringRequest,
    SpeechRequest,
};
use crate::session::config::SessionConfig;
use crate::session::error::SessionError;
use crate::session::lifecycle::{
    NoticeLevel, SessionEvent, SessionLifecyclePhase, SessionLifecycleUpdate, SessionNotice,
};
use crate::session::machine::{Effect, SessionState};
use crate::session::types::{Evaluation, Finalization, SessionSnapshot};
use crate::telemetry::events::{
    record_dialogue_fallback, record_scoring_outcome, record_session_completed,
    record_session_started, record_speech_failure, record_stale_response,
};

pub(crate) type CommandReply = oneshot::Sender<Result<(), SessionError>>;

pub(crate) enum SessionCommand {
    RecordCandidate { text: String, reply: CommandReply },
    Abort { reply: CommandReply },
}

enum CollaboratorResponse {
    Dialogue {
        generation: u64,
        result: Result<DialogueReply, CollaboratorError>,
    },
    Scoring {
        generation: u64,
        result: Result<Evaluation, CollaboratorError>,
    },
}

/// Owns one session's state and serializes every event against it.
pub(crate) struct SessionWorker {
    state: SessionState,
    config: SessionConfig,
    collaborators: CollaboratorSet,
    command_rx: mpsc::Receiver<SessionCommand>,
    response_tx: mpsc::Sender<CollaboratorResponse>,
    response_rx: mpsc::Receiver<CollaboratorResponse>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    events_tx: broadcast::Sender<SessionEvent>,
    lifecycle_tx: broadcast::Sender<SessionLifecycleUpdate>,
    in_flight: Vec<JoinHandle<()>>,
    last_phase: SessionLifecyclePhase,
}

impl SessionWorker {
    pub(crate) fn new(
        state: SessionState,
        config: SessionConfig,
        collaborators: CollaboratorSet,
        command_rx: mpsc::Receiver<SessionCommand>,
        snapshot_tx: watch::Sender<SessionSnapshot>,
        events_tx: broadcast::Sender<SessionEvent>,
        lifecycle_tx: broadcast::Sender<SessionLifecycleUpdate>,
    ) -> Self {
        let (response_tx, response_rx) = mpsc::channel(config.command_capacity.max(1));
        Self {
            state,
            config,
            collaborators,
            command_rx,
            response_tx,
            response_rx,
            snapshot_tx,
            events_tx,
            lifecycle_tx,
            in_flight: Vec::new(),
            last_phase: SessionLifecyclePhase::Idle,
        }
    }

    pub(crate) fn spawn(self, opening: String) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(opening).await;
        })
    }

    async fn run(mut self, opening: String) {
        match self.state.start(opening) {
            Ok(effects) => {
                record_session_started(
                    self.state.session_id(),
                    self.state.part().as_str(),
                    self.state.total_questions(),
                    self.state.time_remaining_secs(),
                );
                self.apply(effects);
            }
            Err(err) => {
                warn!(target: "session_worker", %err, "session failed to start");
                return;
            }
        }

        let period = self.config.tick_interval;
        let mut ticker = interval_at(TokioInstant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                maybe_command = self.command_rx.recv() => {
                    match maybe_command {
                        Some(command) => self.handle_command(command),
                        None => break,
                    }
                }

                Some(response) = self.response_rx.recv() => {
                    self.handle_response(response);
                }

                _ = ticker.tick(), if self.state.phase().is_in_progress() => {
                    let effects = self.state.tick();
                    self.apply(effects);
                }
            }
        }

        self.cancel_in_flight();
        debug!(
            target: "session_worker",
            session_id = %self.state.session_id(),
            "session worker stopped"
        );
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::RecordCandidate { text, reply } => {
                let result = self
                    .state
                    .record_candidate_utterance(text)
                    .map(|effects| self.apply(effects));
                let _ = reply.send(result);
            }
            SessionCommand::Abort { reply } => {
                let result = self.state.abort().map(|effects| {
                    info!(
                        target: "session_worker",
                        session_id = %self.state.session_id(),
                        "session aborted"
                    );
                    self.apply(effects);
                    self.notify(NoticeLevel::Info, "Session aborted.".to_string(), None);
                });
                let _ = reply.send(result);
            }
        }
    }

    fn handle_response(&mut self, response: CollaboratorResponse) {
        match response {
            CollaboratorResponse::Dialogue { generation, result } => {
                if !self.state.awaits_dialogue(generation) {
                    record_stale_response(self.state.session_id(), "dialogue", generation);
                    return;
                }

                if let Err(err) = &result {
                    let message = err.to_string();
                    record_dialogue_fallback(
                        self.state.session_id(),
                        self.state.questions_asked(),
                        &message,
                    );
                    self.notify(
                        NoticeLevel::Warn,
                        format!("Examiner reply unavailable, continuing: {message}"),
                        Some(SessionError::from(err.clone()).code()),
                    );
                }

                let effects = self.state.apply_dialogue_reply(generation, result);
                self.apply(effects);
            }
            CollaboratorResponse::Scoring { generation, result } => {
                if !self.state.apply_scoring_result(generation, result) {
                    record_stale_response(self.state.session_id(), "scoring", generation);
                    return;
                }

                record_scoring_outcome(self.state.session_id(), self.state.finalization());
                if let Finalization::Failed(err) = self.state.finalization() {
                    self.notify(
                        NoticeLevel::Error,
                        format!("Scoring failed: {err}"),
                        Some(err.code()),
                    );
                }
                self.publish();
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Speak { text } => self.speak(text),
                Effect::RequestDialogue {
                    generation,
                    request,
                } => self.request_dialogue(generation, request),
                Effect::RequestScoring {
                    generation,
                    request,
                } => self.request_scoring(generation, request),
                Effect::Completed { reason } => {
                    record_session_completed(
                        self.state.session_id(),
                        reason.as_str(),
                        self.state.questions_asked(),
                        self.state.time_remaining_secs(),
                    );
                    if self.state.finalization() == &Finalization::Skipped {
                        record_scoring_outcome(self.state.session_id(), self.state.finalization());
                    }
                }
                Effect::CancelPending => self.cancel_in_flight(),
            }
        }
        self.publish();
    }

    fn speak(&mut self, text: String) {
        let session_id = self.state.session_id().to_string();
        self.broadcast(SessionEvent::ExaminerUtterance {
            session_id: session_id.clone(),
            text: text.clone(),
        });

        let speech = Arc::clone(&self.collaborators.speech);
        let events_tx = self.events_tx.clone();
        let request = SpeechRequest {
            text,
            voice_id: self.config.voice_id.clone(),
        };

        // Aborted along with other in-flight work on CancelPending.
        let handle = tokio::spawn(async move {
            let text = request.text.clone();
            match speech.synthesize(request).await {
                Ok(audio) if audio.is_empty() => {}
                Ok(audio) => {
                    let _ = events_tx.send(SessionEvent::ExaminerAudio {
                        session_id,
                        text,
                        audio,
                    });
                }
                Err(err) => record_speech_failure(&session_id, &err.to_string()),
            }
        });
        self.track(handle);
    }

    fn request_dialogue(&mut self, generation: u64, request: DialogueRequest) {
        let dialogue = Arc::clone(&self.collaborators.dialogue);
        let response_tx = self.response_tx.clone();
        let handle = tokio::spawn(async move {
            let result = dialogue.next_turn(request).await;
            let _ = response_tx
                .send(CollaboratorResponse::Dialogue { generation, result })
                .await;
        });
        self.track(handle);
    }

    fn request_scoring(&mut self, generation: u64, request: ScoringRequest) {
        info!(
            target: "session_worker",
            session_id = %self.state.session_id(),
            transcript_chars = request.transcript.len(),
            "requesting evaluation"
        );
        let scorer = Arc::clone(&self.collaborators.scorer);
        let response_tx = self.response_tx.clone();
        let handle = tokio::spawn(async move {
            let result = scorer.score(request).await;
            let _ = response_tx
                .send(CollaboratorResponse::Scoring { generation, result })
                .await;
        });
        self.track(handle);
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.in_flight.retain(|task| !task.is_finished());
        self.in_flight.push(handle);
    }

    fn cancel_in_flight(&mut self) {
        for task in self.in_flight.drain(..) {
            task.abort();
        }
    }

    fn notify(&self, level: NoticeLevel, message: String, code: Option<&'static str>) {
        self.broadcast(SessionEvent::Notice {
            session_id: self.state.session_id().to_string(),
            notice: SessionNotice {
                level,
                message,
                code,
            },
        });
    }

    fn broadcast(&self, event: SessionEvent) {
        if self.events_tx.send(event).is_err() {
            debug!(
                target: "session_worker",
                session_id = %self.state.session_id(),
                "no session event subscribers"
            );
        }
    }

    fn publish(&mut self) {
        let snapshot = self.state.snapshot();
        let phase = snapshot.lifecycle_phase();

        if phase != self.last_phase {
            self.last_phase = phase;
            let update = SessionLifecycleUpdate::from_snapshot(&snapshot);
            if self.lifecycle_tx.send(update.clone()).is_err() {
                debug!(
                    target: "session_worker",
                    phase = phase.as_str(),
                    "no lifecycle subscribers"
                );
            }
            self.broadcast(SessionEvent::Lifecycle(update));
        }

        self.snapshot_tx.send_replace(snapshot);
    }
}
