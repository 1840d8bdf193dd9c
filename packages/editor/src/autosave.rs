//! # Autosave Engine
//!
//! Persists document changes without user action.
//!
//! ## States
//!
//! ```text
//!            change                quiet period
//! idle/saved ──────→ dirty ──────────────────────→ saving ──→ saved
//!   error    ──────→                                  ├─────→ error     (transport failure)
//!                                                     └─────→ conflict  (stale version)
//! ```
//!
//! ## Design
//!
//! - One actor task per document owns all persistence state; the handle only
//!   sends commands, so the editing side never blocks on storage
//! - Trailing-edge debounce with a single deadline: N changes inside the quiet
//!   period produce one persist call with the latest snapshot
//! - A snapshot whose hash matches the last saved hash is never written
//! - `save_now` skips the wait; during an in-flight save it queues exactly one
//!   follow-up holding the state as of the call
//! - Errors are not retried on a timer; conflicts hold every further write
//!   until resolved
//! - Persist calls run on their own tasks and cannot be aborted; a result
//!   that arrives after shutdown or a rebase is ignored

use crate::errors::EditorError;
use crate::store::{PersistOutcome, Persistence, SaveRequest};
use invitation_model::{payload_hash, Content, ContentHash, Mode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Serialized document state handed to the engine after every mutation
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub mode: Mode,
    pub payload: Value,
    pub hash: ContentHash,
}

impl Snapshot {
    pub fn capture(content: &Content) -> Self {
        let payload = content.to_payload();
        Self {
            mode: content.mode(),
            hash: payload_hash(&payload),
            payload,
        }
    }
}

/// Where the engine starts: the storage version and hash the document was
/// loaded (or last saved) with
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Baseline {
    pub version: u64,
    pub saved_hash: Option<ContentHash>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SaveStatus {
    Idle,
    Dirty,
    Saving,
    Saved,
    Error { message: String },
    Conflict { known_version: u64 },
}

/// Published on the status channel after every transition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveState {
    pub status: SaveStatus,
    pub version: u64,
    pub saved_hash: Option<ContentHash>,
}

/// One-shot notices for UI toasts and the like
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum AutosaveEvent {
    Saved { version: u64, hash: ContentHash },
    Failed { message: String },
    Conflict { known_version: u64 },
}

enum Command {
    Changed(Snapshot),
    SaveNow(Snapshot),
    Flush(oneshot::Sender<AutosaveState>),
    ResolveConflict(Resolution),
    Shutdown(oneshot::Sender<AutosaveState>),
}

enum Resolution {
    /// Adopt the remote version and write the local state over it
    Overwrite,
    /// Local state was replaced by the remote one
    Rebase(Baseline),
}

/// Handle to a running autosave actor
#[derive(Debug)]
pub struct AutosaveEngine {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<AutosaveState>,
    task: Option<JoinHandle<()>>,
}

impl AutosaveEngine {
    /// Start the actor on the current tokio runtime
    pub fn spawn(
        document_id: impl Into<String>,
        store: Arc<dyn Persistence>,
        baseline: Baseline,
        debounce: Duration,
        events: broadcast::Sender<AutosaveEvent>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let initial = AutosaveState {
            status: SaveStatus::Idle,
            version: baseline.version,
            saved_hash: baseline.saved_hash,
        };
        let (status_tx, status) = watch::channel(initial);

        let actor = Actor {
            document_id: document_id.into(),
            store,
            debounce,
            status: status_tx,
            events,
            results_tx,
            current: SaveStatus::Idle,
            version: baseline.version,
            saved_hash: baseline.saved_hash,
            saved_once: false,
            pending: None,
            deadline: None,
            saving: None,
            follow_up: None,
            conflict: None,
            next_ticket: 0,
            stopping: false,
            waiters: Vec::new(),
        };
        let task = tokio::spawn(actor.run(command_rx, results_rx));

        Self {
            commands,
            status,
            task: Some(task),
        }
    }

    /// Report a new document state; restarts the quiet period
    pub fn mark_changed(&self, snapshot: Snapshot) -> Result<(), EditorError> {
        self.send(Command::Changed(snapshot))
    }

    /// Save immediately, or queue one follow-up if a save is in flight
    pub fn save_now(&self, snapshot: Snapshot) -> Result<(), EditorError> {
        self.send(Command::SaveNow(snapshot))
    }

    /// Write any pending change now and wait until the engine settles
    pub async fn flush(&self) -> Result<AutosaveState, EditorError> {
        let (reply, settled) = oneshot::channel();
        self.send(Command::Flush(reply))?;
        settled.await.map_err(|_| EditorError::EngineStopped)
    }

    /// Leave the conflict state by overwriting the remote version
    pub fn keep_local(&self) -> Result<(), EditorError> {
        self.send(Command::ResolveConflict(Resolution::Overwrite))
    }

    /// Forget local progress and continue from a freshly loaded remote state
    pub fn rebase(&self, baseline: Baseline) -> Result<(), EditorError> {
        self.send(Command::ResolveConflict(Resolution::Rebase(baseline)))
    }

    /// Stop the actor after any in-flight save completes. Pending changes
    /// that were never dispatched are discarded.
    pub async fn shutdown(&mut self) -> AutosaveState {
        let (reply, done) = oneshot::channel();
        let final_state = match self.send(Command::Shutdown(reply)) {
            Ok(()) => done.await.unwrap_or_else(|_| self.state()),
            Err(_) => self.state(),
        };

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("autosave task ended abnormally: {}", e);
            }
        }

        final_state
    }

    pub fn state(&self) -> AutosaveState {
        self.status.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<AutosaveState> {
        self.status.clone()
    }

    fn send(&self, command: Command) -> Result<(), EditorError> {
        self.commands
            .send(command)
            .map_err(|_| EditorError::EngineStopped)
    }
}

struct Actor {
    document_id: String,
    store: Arc<dyn Persistence>,
    debounce: Duration,
    status: watch::Sender<AutosaveState>,
    events: broadcast::Sender<AutosaveEvent>,
    results_tx: mpsc::UnboundedSender<(u64, PersistOutcome)>,

    current: SaveStatus,
    version: u64,
    saved_hash: Option<ContentHash>,
    saved_once: bool,

    /// Latest unsaved snapshot
    pending: Option<Snapshot>,
    /// End of the quiet period for `pending`
    deadline: Option<Instant>,
    /// Ticket and snapshot of the save in flight
    saving: Option<(u64, Snapshot)>,
    /// Queued by `save_now` while a save was in flight
    follow_up: Option<Snapshot>,
    /// Remote version that rejected our last write
    conflict: Option<u64>,

    next_ticket: u64,
    stopping: bool,
    waiters: Vec<oneshot::Sender<AutosaveState>>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut results: mpsc::UnboundedReceiver<(u64, PersistOutcome)>,
    ) {
        debug!(document = %self.document_id, "autosave engine started");

        loop {
            let timer_armed =
                self.deadline.is_some() && self.saving.is_none() && self.conflict.is_none();
            let deadline = self.deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.stop(&mut results).await;
                        let _ = reply.send(self.state());
                        break;
                    }
                    Some(command) => self.handle(command),
                    None => {
                        debug!(document = %self.document_id, "autosave handle dropped");
                        break;
                    }
                },
                Some((ticket, outcome)) = results.recv() => self.complete(ticket, outcome),
                () = sleep_until(deadline), if timer_armed => self.quiet_period_elapsed(),
            }

            self.advance();
            self.settle();
        }

        let state = self.state();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(state.clone());
        }
        debug!(document = %self.document_id, "autosave engine stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Changed(snapshot) => self.changed(snapshot),
            Command::SaveNow(snapshot) => self.save_now(snapshot),
            Command::Flush(reply) => self.waiters.push(reply),
            Command::ResolveConflict(resolution) => self.resolve(resolution),
            // Intercepted by the run loop
            Command::Shutdown(reply) => {
                let _ = reply.send(self.state());
            }
        }
    }

    fn changed(&mut self, snapshot: Snapshot) {
        if self.conflict.is_some() {
            debug!(hash = snapshot.hash, "change held back by unresolved conflict");
            self.pending = Some(snapshot);
            return;
        }

        if self.saving.is_some() {
            self.pending = Some(snapshot);
            self.deadline = Some(Instant::now() + self.debounce);
            return;
        }

        if self.is_saved(&snapshot) {
            self.pending = None;
            self.deadline = None;
            self.publish(self.clean_status());
            return;
        }

        self.pending = Some(snapshot);
        self.deadline = Some(Instant::now() + self.debounce);
        self.publish(SaveStatus::Dirty);
    }

    fn save_now(&mut self, snapshot: Snapshot) {
        if self.conflict.is_some() {
            self.pending = Some(snapshot);
            return;
        }

        self.pending = None;
        self.deadline = None;

        if self.saving.is_some() {
            debug!(hash = snapshot.hash, "queueing follow-up save");
            self.follow_up = Some(snapshot);
        } else {
            self.dispatch_if_dirty(snapshot);
        }
    }

    fn quiet_period_elapsed(&mut self) {
        self.deadline = None;
        if let Some(snapshot) = self.pending.take() {
            self.dispatch_if_dirty(snapshot);
        }
    }

    fn resolve(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Overwrite => {
                let Some(known_version) = self.conflict.take() else {
                    return;
                };
                info!(known_version, "overwriting remote version with local state");
                self.version = known_version;
                match self.pending.take() {
                    Some(snapshot) => self.dispatch(snapshot),
                    None => self.publish(self.clean_status()),
                }
            }
            Resolution::Rebase(baseline) => {
                info!(version = baseline.version, "rebased on remote state");
                self.version = baseline.version;
                self.saved_hash = baseline.saved_hash;
                self.conflict = None;
                self.pending = None;
                self.follow_up = None;
                self.deadline = None;
                self.saving = None;
                self.saved_once = false;
                self.publish(SaveStatus::Idle);
            }
        }
    }

    fn dispatch_if_dirty(&mut self, snapshot: Snapshot) {
        if self.is_saved(&snapshot) {
            debug!(hash = snapshot.hash, "snapshot matches saved state, skipping write");
            self.publish(self.clean_status());
        } else {
            self.dispatch(snapshot);
        }
    }

    fn dispatch(&mut self, snapshot: Snapshot) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;

        let request = SaveRequest {
            document_id: self.document_id.clone(),
            mode: snapshot.mode,
            payload: snapshot.payload.clone(),
            expected_version: self.version,
            hash: snapshot.hash,
        };
        debug!(ticket, hash = snapshot.hash, expected_version = self.version, "dispatching save");

        let store = Arc::clone(&self.store);
        let results = self.results_tx.clone();
        tokio::spawn(async move {
            let outcome = store.persist(request).await;
            // Receiver is gone once the engine stops
            let _ = results.send((ticket, outcome));
        });

        self.saving = Some((ticket, snapshot));
        self.publish(SaveStatus::Saving);
    }

    fn complete(&mut self, ticket: u64, outcome: PersistOutcome) {
        let snapshot = match self.saving.take() {
            Some((current, snapshot)) if current == ticket => snapshot,
            other => {
                debug!(ticket, "ignoring result of an abandoned save");
                self.saving = other;
                return;
            }
        };

        match outcome {
            PersistOutcome::Saved { version } => {
                info!(document = %self.document_id, version, hash = snapshot.hash, "saved");
                self.version = version;
                self.saved_hash = Some(snapshot.hash);
                self.saved_once = true;
                let _ = self.events.send(AutosaveEvent::Saved {
                    version,
                    hash: snapshot.hash,
                });

                if self.pending.as_ref().is_some_and(|p| self.is_saved(p)) {
                    self.pending = None;
                    self.deadline = None;
                }
                if self.pending.is_some() {
                    self.publish(SaveStatus::Dirty);
                } else {
                    self.publish(SaveStatus::Saved);
                }
            }
            PersistOutcome::Conflict { known_version } => {
                error!(
                    document = %self.document_id,
                    expected = self.version,
                    known_version,
                    "save rejected, document changed remotely"
                );
                self.conflict = Some(known_version);
                self.hold(snapshot);
                let _ = self.events.send(AutosaveEvent::Conflict { known_version });
                self.publish(SaveStatus::Conflict { known_version });
            }
            PersistOutcome::Failed(message) => {
                warn!(document = %self.document_id, "save failed: {}", message);
                self.hold(snapshot);
                let _ = self.events.send(AutosaveEvent::Failed {
                    message: message.clone(),
                });
                self.publish(SaveStatus::Error { message });
            }
        }
    }

    /// Keep the newest unsaved state around without arming the timer
    fn hold(&mut self, attempted: Snapshot) {
        let newest = self
            .pending
            .take()
            .or_else(|| self.follow_up.take())
            .unwrap_or(attempted);
        self.pending = Some(newest);
        self.follow_up = None;
        self.deadline = None;
    }

    /// Start queued work once nothing is in flight
    fn advance(&mut self) {
        if self.stopping || self.saving.is_some() || self.conflict.is_some() {
            return;
        }

        if let Some(next) = self.follow_up.take() {
            self.dispatch_if_dirty(next);
        } else if !self.waiters.is_empty() && self.deadline.is_some() {
            self.deadline = None;
            if let Some(snapshot) = self.pending.take() {
                self.dispatch_if_dirty(snapshot);
            }
        }
    }

    /// Answer flush waiters once no write is running or scheduled
    fn settle(&mut self) {
        let settled = self.saving.is_none() && self.follow_up.is_none() && self.deadline.is_none();
        if settled && !self.waiters.is_empty() {
            let state = self.state();
            for waiter in self.waiters.drain(..) {
                let _ = waiter.send(state.clone());
            }
        }
    }

    async fn stop(&mut self, results: &mut mpsc::UnboundedReceiver<(u64, PersistOutcome)>) {
        self.stopping = true;
        self.deadline = None;

        while self.saving.is_some() {
            debug!("waiting for in-flight save before shutdown");
            match results.recv().await {
                Some((ticket, outcome)) => self.complete(ticket, outcome),
                None => break,
            }
        }
    }

    fn is_saved(&self, snapshot: &Snapshot) -> bool {
        self.saved_hash == Some(snapshot.hash)
    }

    fn clean_status(&self) -> SaveStatus {
        if self.saved_once {
            SaveStatus::Saved
        } else {
            SaveStatus::Idle
        }
    }

    fn state(&self) -> AutosaveState {
        AutosaveState {
            status: self.current.clone(),
            version: self.version,
            saved_hash: self.saved_hash,
        }
    }

    fn publish(&mut self, status: SaveStatus) {
        if status != self.current {
            debug!(document = %self.document_id, ?status, "autosave status");
        }
        self.current = status;
        self.status.send_replace(self.state());
    }
}
