//! # Edit Session Management
//!
//! An EditorSession is the only mutation surface for one open document. It
//! owns the document, the undo history and the active autosave engine, and
//! coordinates mode switches between them:
//!
//! ```text
//! mutation ──→ Document ──snapshot──→ AutosaveEngine ──→ Persistence
//!                 │
//!                 └──before-state──→ UndoStack (linear mode only)
//!
//! switch_mode: shutdown engine → migrate → swap content → spawn engine (dirty)
//! ```
//!
//! Validation failures are returned before anything is touched; a failed
//! call leaves document, history and autosave state as they were.

use crate::autosave::{AutosaveEngine, AutosaveEvent, AutosaveState, Baseline, Snapshot};
use crate::config::EditorConfig;
use crate::errors::{EditorError, PersistError};
use crate::store::Persistence;
use crate::undo_stack::UndoStack;
use invitation_migration::{decode_payload, migrate, MigrationPolicy, MigrationReport};
use invitation_model::{
    Block, BlockPatch, Content, Document, Element, ElementPatch, FieldMap, Mode, ModelError,
    PatchOutcome, Section,
};
use invitation_registry::{TypeLookup, TypeRegistry};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// How to leave the conflict state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Overwrite the remote version with the local document
    KeepLocal,
    /// Discard local changes and load the remote document
    ReloadRemote,
}

/// Result of a mode switch request
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    /// Already in the requested mode
    Unchanged,
    /// Converted and now autosaving the new representation
    Switched(MigrationReport<()>),
    /// Strict policy found items that would be dropped; nothing changed
    NeedsConfirmation(MigrationReport<()>),
}

/// Field edit being coalesced into one undo entry
#[derive(Debug, Clone)]
struct FieldEdit {
    block_id: String,
    field: String,
}

impl FieldEdit {
    /// Whether `patch` only writes this edit's field
    fn covers(&self, block_id: &str, patch: &BlockPatch) -> bool {
        self.block_id == block_id
            && patch.style.is_empty()
            && patch.visible.is_none()
            && !patch.content.is_empty()
            && patch.content.keys().all(|key| *key == self.field)
    }
}

/// One open document
pub struct EditorSession {
    document: Document,
    registry: Arc<TypeRegistry>,
    store: Arc<dyn Persistence>,
    config: EditorConfig,
    history: UndoStack,
    autosave: AutosaveEngine,
    events: broadcast::Sender<AutosaveEvent>,
    field_edit: Option<FieldEdit>,
}

impl EditorSession {
    /// Load the document from storage, or start an empty linear one
    pub async fn open(
        document_id: impl Into<String>,
        event_id: impl Into<String>,
        registry: Arc<TypeRegistry>,
        store: Arc<dyn Persistence>,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        let document_id = document_id.into();

        let document = match store.load().await? {
            Some(stored) => {
                let content = decode_payload(stored.payload).map_err(PersistError::from)?;
                let mut document =
                    Document::from_content(document_id, event_id, content, stored.version);
                document.saved_hash = Some(document.content_hash());
                document
            }
            None => Document::new(document_id, event_id),
        };

        info!(
            document = %document.id,
            mode = %document.mode(),
            version = document.version,
            "opened document"
        );
        report_unknown_types(&document, &registry);

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let autosave = spawn_engine(&document, &store, &config, &events);

        Ok(Self {
            history: UndoStack::with_max_levels(config.undo_depth),
            document,
            registry,
            store,
            config,
            autosave,
            events,
            field_edit: None,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn mode(&self) -> Mode {
        self.document.mode()
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Linear mode
    // ------------------------------------------------------------------

    /// Append a block of a registered type with its default content
    pub fn add_block(&mut self, kind: &str) -> Result<String, EditorError> {
        let before = self.linear_snapshot()?;
        let defaults = self.registry.validate(kind, Mode::Linear)?.default_content();

        let id = self.document.add_block(kind, defaults)?;
        debug!(%id, kind, "added block");

        self.record(before, format!("add {}", kind));
        Ok(id)
    }

    /// Shallow-merge a patch onto a block. A patch that changes nothing is
    /// not recorded and does not dirty the document.
    pub fn patch_block(&mut self, id: &str, patch: BlockPatch) -> Result<PatchOutcome, EditorError> {
        self.require_mode(Mode::Linear)?;

        let in_field_edit = self
            .field_edit
            .as_ref()
            .is_some_and(|edit| edit.covers(id, &patch));
        if in_field_edit {
            let outcome = self.document.patch_block(id, &patch)?;
            if outcome.changed {
                self.notify();
            }
            return Ok(outcome);
        }

        let before = self.linear_snapshot()?;
        let outcome = self.document.patch_block(id, &patch)?;
        if outcome.changed {
            self.record(before, format!("edit {}", id));
        }
        Ok(outcome)
    }

    pub fn remove_block(&mut self, id: &str) -> Result<Block, EditorError> {
        let before = self.linear_snapshot()?;

        let removed = self.document.remove_block(id)?;
        debug!(%id, "removed block");

        self.record(before, format!("remove {}", removed.kind));
        Ok(removed)
    }

    /// Apply a new block order; `ids` must list every block exactly once
    pub fn reorder_blocks(&mut self, ids: &[String]) -> Result<(), EditorError> {
        let before = self.linear_snapshot()?;

        self.document.reorder_blocks(ids)?;

        if self.document.blocks() != Some(before.as_slice()) {
            self.record(before, "reorder");
        }
        Ok(())
    }

    /// Start typing into one field; patches to that field until
    /// [`end_field_edit`](Self::end_field_edit) form a single undo entry
    pub fn begin_field_edit(&mut self, block_id: &str, field: &str) -> Result<(), EditorError> {
        let already_open = self
            .field_edit
            .as_ref()
            .is_some_and(|edit| edit.block_id == block_id && edit.field == field);
        if already_open {
            return Ok(());
        }

        let before = self.linear_snapshot()?;
        if !before.iter().any(|b| b.id == block_id) {
            return Err(ModelError::BlockNotFound(block_id.to_string()).into());
        }

        self.end_field_edit();
        self.history
            .begin_coalesce(format!("{}/{}", block_id, field), before);
        self.field_edit = Some(FieldEdit {
            block_id: block_id.to_string(),
            field: field.to_string(),
        });
        Ok(())
    }

    /// Close the open field edit, recording it if anything changed
    pub fn end_field_edit(&mut self) {
        let Some(edit) = self.field_edit.take() else {
            return;
        };
        if let Some(blocks) = self.document.blocks() {
            if self.history.end_coalesce(blocks) {
                debug!(block = %edit.block_id, field = %edit.field, "recorded field edit");
            }
        }
    }

    /// Close the open field edit against `state`, the blocks as they stood
    /// when typing stopped
    fn close_field_edit(&mut self, state: &[Block]) {
        let Some(edit) = self.field_edit.take() else {
            return;
        };
        if self.history.end_coalesce(state) {
            debug!(block = %edit.block_id, field = %edit.field, "recorded field edit");
        }
    }

    /// Record a successful linear mutation whose prior state is `before`
    fn record(&mut self, before: Vec<Block>, description: impl Into<String>) {
        self.close_field_edit(&before);
        self.history.record(before, description);
        self.notify();
    }

    // ------------------------------------------------------------------
    // Free mode
    // ------------------------------------------------------------------

    pub fn add_section(&mut self, background: FieldMap) -> Result<String, EditorError> {
        let id = self.document.add_section(background)?;
        debug!(%id, "added section");
        self.notify();
        Ok(id)
    }

    /// Append an element of a registered type to the end of a section's flow
    pub fn add_element(&mut self, section_id: &str, kind: &str) -> Result<String, EditorError> {
        self.require_mode(Mode::Free)?;
        let defaults = self.registry.validate(kind, Mode::Free)?.default_content();

        let id = self.document.add_element(section_id, kind, defaults)?;
        debug!(%id, section = section_id, kind, "added element");
        self.notify();
        Ok(id)
    }

    pub fn patch_element(
        &mut self,
        id: &str,
        patch: ElementPatch,
    ) -> Result<PatchOutcome, EditorError> {
        let outcome = self.document.patch_element(id, &patch)?;
        if outcome.changed {
            self.notify();
        }
        Ok(outcome)
    }

    pub fn remove_element(&mut self, id: &str) -> Result<Element, EditorError> {
        let removed = self.document.remove_element(id)?;
        self.notify();
        Ok(removed)
    }

    pub fn remove_section(&mut self, id: &str) -> Result<Section, EditorError> {
        let removed = self.document.remove_section(id)?;
        self.notify();
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Mode switching
    // ------------------------------------------------------------------

    /// Convert the document to `target`.
    ///
    /// Under the strict policy a lossy conversion is not applied; the report
    /// comes back as [`SwitchOutcome::NeedsConfirmation`] and the caller can
    /// retry with [`MigrationPolicy::Tolerant`] once the user agrees.
    pub async fn switch_mode(
        &mut self,
        target: Mode,
        policy: MigrationPolicy,
    ) -> Result<SwitchOutcome, EditorError> {
        let from = self.document.mode();
        if from == target {
            return Ok(SwitchOutcome::Unchanged);
        }

        self.end_field_edit();
        let report = migrate(self.document.content(), target, &self.registry, policy);

        if report.requires_confirmation {
            info!(
                %from,
                to = %target,
                dropped = report.dropped_count(),
                "mode switch needs confirmation"
            );
            return Ok(SwitchOutcome::NeedsConfirmation(report.map(|_| ())));
        }

        // The outgoing engine must finish its write before the new
        // representation is based on its version
        let settled = self.autosave.shutdown().await;
        self.document.version = settled.version;
        self.document.saved_hash = settled.saved_hash;

        let MigrationReport {
            output,
            dropped,
            warnings,
            ..
        } = report;
        self.document.replace_content(output);
        self.history.clear();

        self.autosave = spawn_engine(&self.document, &self.store, &self.config, &self.events);
        self.notify();

        info!(
            document = %self.document.id,
            %from,
            to = %target,
            dropped = dropped.len(),
            warnings = warnings.len(),
            "switched editing mode"
        );

        Ok(SwitchOutcome::Switched(MigrationReport {
            output: (),
            dropped,
            warnings,
            requires_confirmation: false,
        }))
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Returns `false` if there was nothing to undo
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        self.end_field_edit();
        let Some(current) = self.document.blocks().map(<[Block]>::to_vec) else {
            return Ok(false);
        };

        match self.history.undo(current) {
            Some(previous) => {
                self.document.replace_blocks(previous)?;
                self.notify();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns `false` if there was nothing to redo
    pub fn redo(&mut self) -> Result<bool, EditorError> {
        self.end_field_edit();
        let Some(current) = self.document.blocks().map(<[Block]>::to_vec) else {
            return Ok(false);
        };

        match self.history.redo(current) {
            Some(next) => {
                self.document.replace_blocks(next)?;
                self.notify();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Persist now instead of waiting for the quiet period
    pub fn save_now(&mut self) -> Result<(), EditorError> {
        self.end_field_edit();
        self.autosave
            .save_now(Snapshot::capture(self.document.content()))
    }

    /// Write pending changes and wait until autosave settles
    pub async fn flush(&self) -> Result<AutosaveState, EditorError> {
        self.autosave.flush().await
    }

    pub async fn resolve_conflict(
        &mut self,
        resolution: ConflictResolution,
    ) -> Result<(), EditorError> {
        match resolution {
            ConflictResolution::KeepLocal => self.autosave.keep_local(),
            ConflictResolution::ReloadRemote => self.reload_remote().await,
        }
    }

    async fn reload_remote(&mut self) -> Result<(), EditorError> {
        let stored = self.store.load().await?;
        let (content, version) = match stored {
            Some(stored) => (
                decode_payload(stored.payload).map_err(PersistError::from)?,
                stored.version,
            ),
            None => (Content::empty(Mode::Linear), 0),
        };

        self.field_edit = None;
        self.history.clear();
        self.document.replace_content(content);
        self.document.version = version;
        self.document.saved_hash = (version > 0).then(|| self.document.content_hash());

        info!(document = %self.document.id, version, "reloaded remote document");
        report_unknown_types(&self.document, &self.registry);

        self.autosave.rebase(Baseline {
            version: self.document.version,
            saved_hash: self.document.saved_hash,
        })
    }

    pub fn save_status(&self) -> AutosaveState {
        self.autosave.state()
    }

    /// Status updates for the active engine. Replaced on mode switch, so
    /// callers should resubscribe after [`switch_mode`](Self::switch_mode).
    pub fn watch_status(&self) -> watch::Receiver<AutosaveState> {
        self.autosave.watch()
    }

    /// Save notices; survives mode switches
    pub fn subscribe(&self) -> broadcast::Receiver<AutosaveEvent> {
        self.events.subscribe()
    }

    /// Flush pending changes and stop autosaving
    pub async fn close(mut self) -> Result<AutosaveState, EditorError> {
        self.end_field_edit();
        let settled = self.autosave.flush().await?;
        self.autosave.shutdown().await;
        info!(document = %self.document.id, status = ?settled.status, "closed document");
        Ok(settled)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn require_mode(&self, expected: Mode) -> Result<(), EditorError> {
        let actual = self.document.mode();
        if actual == expected {
            Ok(())
        } else {
            Err(ModelError::wrong_mode(expected, actual).into())
        }
    }

    fn linear_snapshot(&self) -> Result<Vec<Block>, EditorError> {
        self.require_mode(Mode::Linear)?;
        Ok(self.document.blocks().map(<[Block]>::to_vec).unwrap_or_default())
    }

    /// Hand the current state to the autosave engine
    fn notify(&self) {
        let snapshot = Snapshot::capture(self.document.content());
        if let Err(e) = self.autosave.mark_changed(snapshot) {
            warn!(document = %self.document.id, "change not tracked: {}", e);
        }
    }
}

fn spawn_engine(
    document: &Document,
    store: &Arc<dyn Persistence>,
    config: &EditorConfig,
    events: &broadcast::Sender<AutosaveEvent>,
) -> AutosaveEngine {
    AutosaveEngine::spawn(
        document.id.clone(),
        Arc::clone(store),
        Baseline {
            version: document.version,
            saved_hash: document.saved_hash,
        },
        config.debounce(),
        events.clone(),
    )
}

fn report_unknown_types(document: &Document, registry: &TypeRegistry) {
    for kind in document.content().kinds() {
        if let TypeLookup::Unknown(tag) = registry.lookup(kind) {
            warn!(document = %document.id, kind = tag, "unregistered type, rendering placeholder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn session() -> EditorSession {
        EditorSession::open(
            "doc-1",
            "event-1",
            Arc::new(TypeRegistry::builtin()),
            Arc::new(MemoryStore::new()),
            EditorConfig::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_creation() {
        let session = session().await;

        assert_eq!(session.mode(), Mode::Linear);
        assert_eq!(session.document().blocks(), Some(&[][..]));
        assert!(!session.can_undo());
        assert_eq!(session.save_status().version, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_block_uses_registry_defaults() {
        let mut session = session().await;
        let id = session.add_block("countdown").unwrap();

        let block = session.document().find_block(&id).unwrap();
        let defaults = session
            .registry()
            .validate("countdown", Mode::Linear)
            .unwrap()
            .default_content();
        assert_eq!(block.content, defaults);
        assert!(session.can_undo());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_type_rejected_without_change() {
        let mut session = session().await;
        session.add_block("hero").unwrap();
        let before = session.document().clone();

        let result = session.add_block("holoprojection");

        assert_eq!(
            result,
            Err(EditorError::Validation(ModelError::UnknownType("holoprojection".into())))
        );
        assert_eq!(session.document(), &before);
        assert_eq!(session.history.undo_levels(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_free_only_type_rejected_in_linear_mode() {
        let mut session = session().await;
        let result = session.add_block("sticker");
        assert!(matches!(
            result,
            Err(EditorError::Validation(ModelError::TypeNotAvailable { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_free_operations_need_free_mode() {
        let mut session = session().await;
        assert!(matches!(
            session.add_section(FieldMap::new()),
            Err(EditorError::Validation(ModelError::WrongMode { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_field_edit_coalesces() {
        let mut session = session().await;
        let id = session.add_block("text").unwrap();
        let levels = session.history.undo_levels();

        session.begin_field_edit(&id, "body").unwrap();
        for text in ["H", "He", "Hel", "Hello"] {
            session.patch_block(&id, BlockPatch::content("body", text)).unwrap();
        }
        session.end_field_edit();

        assert_eq!(session.history.undo_levels(), levels + 1);

        assert!(session.undo().unwrap());
        let block = session.document().find_block(&id).unwrap();
        assert_ne!(block.content.get("body"), Some(&serde_json::json!("Hello")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_field_edit_on_missing_block() {
        let mut session = session().await;
        assert_eq!(
            session.begin_field_edit("nope", "title"),
            Err(EditorError::Validation(ModelError::BlockNotFound("nope".into())))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_operations_keep_field_edit_open() {
        let mut session = session().await;
        let id = session.add_block("text").unwrap();
        let levels = session.history.undo_levels();

        session.begin_field_edit(&id, "body").unwrap();
        session.patch_block(&id, BlockPatch::content("body", "H")).unwrap();

        assert!(session.add_block("holoprojection").is_err());
        assert!(session.remove_block("nope").is_err());
        assert!(session.reorder_blocks(&["nope".to_string()]).is_err());
        assert!(session.patch_block("nope", BlockPatch::content("body", "x")).is_err());
        assert!(session.begin_field_edit("nope", "body").is_err());

        for text in ["He", "Hel", "Hell", "Hello"] {
            session.patch_block(&id, BlockPatch::content("body", text)).unwrap();
        }
        session.end_field_edit();

        assert_eq!(session.history.undo_levels(), levels + 1);
        assert!(session.undo().unwrap());
        let block = session.document().find_block(&id).unwrap();
        assert_eq!(block.content.get("body"), Some(&serde_json::json!("")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_field_is_not_coalesced() {
        let mut session = session().await;
        let id = session.add_block("text").unwrap();
        let levels = session.history.undo_levels();

        session.begin_field_edit(&id, "body").unwrap();
        session.patch_block(&id, BlockPatch::content("body", "Hello")).unwrap();
        session.patch_block(&id, BlockPatch::content("title", "Welcome")).unwrap();
        session.end_field_edit();

        assert_eq!(session.history.undo_levels(), levels + 2);

        assert!(session.undo().unwrap());
        let block = session.document().find_block(&id).unwrap();
        assert_eq!(block.content.get("body"), Some(&serde_json::json!("Hello")));
        assert_ne!(block.content.get("title"), Some(&serde_json::json!("Welcome")));

        assert!(session.undo().unwrap());
        let block = session.document().find_block(&id).unwrap();
        assert_eq!(block.content.get("body"), Some(&serde_json::json!("")));
    }
}
