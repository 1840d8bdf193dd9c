//! # Invitation Editor
//!
//! Editing engine behind the invitation page builder.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model + registry: content and type catalog  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditorSession                       │
//! │  - Validate and apply mutations             │
//! │  - Undo/redo over block snapshots           │
//! │  - Switch linear ⇄ free via migration       │
//! │  - Drive the autosave engine                │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ Persistence (injected): load / persist      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **In-memory document is the source of truth**: storage lags it by at
//!    most one quiet period plus one round-trip
//! 2. **Conflicts are surfaced, never merged**
//! 3. **One representation, one autosave engine** at any time
//!
//! ## Usage
//!
//! ```rust,ignore
//! use invitation_editor::{EditorConfig, EditorSession, MemoryStore};
//!
//! let mut session = EditorSession::open(
//!     "doc-1",
//!     "event-1",
//!     Arc::new(TypeRegistry::builtin()),
//!     Arc::new(MemoryStore::new()),
//!     EditorConfig::default(),
//! )
//! .await?;
//!
//! let hero = session.add_block("hero")?;
//! session.patch_block(&hero, BlockPatch::content("title", "Ana & Luis"))?;
//!
//! // Persisted after the quiet period, or right away:
//! session.save_now()?;
//! ```

mod autosave;
mod config;
mod errors;
mod session;
mod store;
mod undo_stack;

pub use autosave::{AutosaveEngine, AutosaveEvent, AutosaveState, Baseline, SaveStatus, Snapshot};
pub use config::EditorConfig;
pub use errors::{EditorError, PersistError};
pub use session::{ConflictResolution, EditorSession, SwitchOutcome};
pub use store::{MemoryStore, PersistOutcome, Persistence, SaveRequest, StoredDocument};
pub use undo_stack::{HistoryEntry, UndoStack};
