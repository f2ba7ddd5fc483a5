mod handle;
mod worker;

pub use handle::SessionHandle;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};

use crate::collaborators::CollaboratorSet;
use crate::session::config::SessionConfig;
use crate::session::lifecycle::{SessionEvent, SessionLifecycleUpdate};
use crate::session::machine::SessionState;
use crate::session::part::TestPart;

use self::worker::SessionWorker;

/// Starts one session actor.
///
/// The returned receiver is subscribed before the worker runs, so it observes
/// the opening examiner utterance.
pub(crate) fn spawn_session(
    session_id: String,
    part: TestPart,
    opening: String,
    config: SessionConfig,
    collaborators: CollaboratorSet,
    lifecycle_tx: broadcast::Sender<SessionLifecycleUpdate>,
) -> (SessionHandle, broadcast::Receiver<SessionEvent>) {
    let policy = config.policies.get(part);
    let state = SessionState::new(session_id.clone(), part, policy)
        .with_acknowledgement(config.fallback_acknowledgement.clone());

    let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
    let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());
    let (events_tx, events_rx) = broadcast::channel(config.event_capacity.max(1));
    let transcriber = Arc::clone(&collaborators.transcriber);

    let worker = SessionWorker::new(
        state,
        config,
        collaborators,
        command_rx,
        snapshot_tx,
        events_tx.clone(),
        lifecycle_tx,
    );
    let worker_handle = worker.spawn(opening);

    let handle = SessionHandle::new(
        session_id,
        part,
        command_tx,
        snapshot_rx,
        events_tx,
        transcriber,
        worker_handle,
    );
    (handle, events_rx)
}
