//! # Persistence Capability
//!
//! The editor never talks to a transport directly. Storage is injected as a
//! [`Persistence`] implementation, shared by the session and its autosave
//! engine:
//!
//! ```text
//! EditorSession ──load()──────→ Persistence
//! AutosaveEngine ──persist()──→ Persistence ──→ Saved | Conflict | Failed
//! ```
//!
//! Writes use optimistic versioning: a request carries the version the
//! client last saw, and the store refuses it if someone else wrote since.

use crate::errors::PersistError;
use async_trait::async_trait;
use invitation_model::{ContentHash, Mode};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Payload as it sits in storage
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub payload: Value,
    pub version: u64,
}

/// One write attempt
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub document_id: String,
    pub mode: Mode,
    pub payload: Value,
    /// Version the write is based on
    pub expected_version: u64,
    pub hash: ContentHash,
}

/// Result of a write attempt. Not an error type: conflicts and transport
/// failures are ordinary states of the autosave engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    Saved { version: u64 },
    /// The stored version moved past `expected_version`
    Conflict { known_version: u64 },
    Failed(String),
}

#[async_trait]
pub trait Persistence: Send + Sync {
    /// Fetch the stored document, `None` if nothing was ever saved
    async fn load(&self) -> Result<Option<StoredDocument>, PersistError>;

    async fn persist(&self, request: SaveRequest) -> PersistOutcome;
}

/// In-process store with version checks, failure injection and a record of
/// every persist call
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    stored: Option<StoredDocument>,
    calls: Vec<SaveRequest>,
    failures: usize,
    latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing payload
    pub fn with_document(payload: Value, version: u64) -> Self {
        let store = Self::new();
        store.state().stored = Some(StoredDocument { payload, version });
        store
    }

    /// Delay every persist call (simulated round-trip)
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state().latency = latency;
        self
    }

    /// Make the next `count` persist calls fail
    pub fn fail_next(&self, count: usize) {
        self.state().failures = count;
    }

    /// Simulate a write from another client, returning the new version
    pub fn write_remote(&self, payload: Value) -> u64 {
        let mut state = self.state();
        let version = state.stored.as_ref().map_or(0, |d| d.version) + 1;
        state.stored = Some(StoredDocument { payload, version });
        version
    }

    pub fn stored(&self) -> Option<StoredDocument> {
        self.state().stored.clone()
    }

    /// Every persist call received, failed ones included
    pub fn calls(&self) -> Vec<SaveRequest> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn load(&self) -> Result<Option<StoredDocument>, PersistError> {
        Ok(self.stored())
    }

    async fn persist(&self, request: SaveRequest) -> PersistOutcome {
        let latency = self.state().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state();
        state.calls.push(request.clone());

        if state.failures > 0 {
            state.failures -= 1;
            return PersistOutcome::Failed("injected transport failure".to_string());
        }

        let current = state.stored.as_ref().map_or(0, |d| d.version);
        if request.expected_version != current {
            return PersistOutcome::Conflict {
                known_version: current,
            };
        }

        let version = current + 1;
        state.stored = Some(StoredDocument {
            payload: request.payload,
            version,
        });
        PersistOutcome::Saved { version }
    }
}
