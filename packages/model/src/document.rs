//! # Document Handle
//!
//! A Document holds one invitation's visual content and its editing
//! bookkeeping. The content is in exactly one representation at a time and
//! the mode is read off that representation, never stored beside it.
//!
//! ## Lifecycle
//!
//! ```text
//! Load/Empty → add / patch / remove / reorder → Save (external)
//!                         ↓
//!               orders compacted to 0..n
//! ```

use crate::content::{
    compact_order, merge_fields, normalize_order, Block, BlockPatch, Content, Element,
    ElementPatch, FieldMap, Mode, PatchOutcome, Position, Section,
};
use crate::error::{ModelError, ModelResult};
use crate::hash::{content_hash, ContentHash};
use crate::id_generator::IdGenerator;
use std::collections::HashSet;

/// Editable invitation document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document identifier
    pub id: String,

    /// Owning event reference
    pub event_id: String,

    /// Last storage version known to this client
    pub version: u64,

    /// Hash of the last successfully saved snapshot
    pub saved_hash: Option<ContentHash>,

    content: Content,
    ids: IdGenerator,
}

impl Document {
    /// Create an empty linear document
    pub fn new(id: impl Into<String>, event_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            ids: IdGenerator::new(&id),
            id,
            event_id: event_id.into(),
            version: 0,
            saved_hash: None,
            content: Content::Linear(Vec::new()),
        }
    }

    /// Wrap loaded content; orders are normalized to `0..n`
    pub fn from_content(
        id: impl Into<String>,
        event_id: impl Into<String>,
        content: Content,
        version: u64,
    ) -> Self {
        let id = id.into();
        let content = normalized(content);
        Self {
            ids: IdGenerator::resume(&id, content.ids()),
            id,
            event_id: event_id.into(),
            version,
            saved_hash: None,
            content,
        }
    }

    pub fn mode(&self) -> Mode {
        self.content.mode()
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn content_hash(&self) -> ContentHash {
        content_hash(&self.content)
    }

    /// Blocks, if the document is linear
    pub fn blocks(&self) -> Option<&[Block]> {
        match &self.content {
            Content::Linear(blocks) => Some(blocks),
            Content::Free(_) => None,
        }
    }

    /// Sections, if the document is free
    pub fn sections(&self) -> Option<&[Section]> {
        match &self.content {
            Content::Free(sections) => Some(sections),
            Content::Linear(_) => None,
        }
    }

    pub fn find_block(&self, id: &str) -> Option<&Block> {
        self.blocks()?.iter().find(|b| b.id == id)
    }

    pub fn find_section(&self, id: &str) -> Option<&Section> {
        self.sections()?.iter().find(|s| s.id == id)
    }

    pub fn find_element(&self, id: &str) -> Option<&Element> {
        self.sections()?
            .iter()
            .flat_map(|s| s.elements.iter())
            .find(|e| e.id == id)
    }

    /// Swap in a different representation (migration, remote reload)
    pub fn replace_content(&mut self, content: Content) {
        let content = normalized(content);
        for id in content.ids() {
            self.ids.observe(id);
        }
        self.content = content;
    }

    /// Restore a linear snapshot (undo/redo)
    pub fn replace_blocks(&mut self, blocks: Vec<Block>) -> ModelResult<()> {
        self.linear_mut()?;
        self.replace_content(Content::Linear(blocks));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Linear mode
    // ------------------------------------------------------------------

    /// Append a block with the given default content, returning its id
    pub fn add_block(&mut self, kind: &str, defaults: FieldMap) -> ModelResult<String> {
        self.linear_mut()?;
        let id = self.ids.new_id()?;
        let blocks = self.linear_mut()?;
        let order = blocks.len() as u32;
        blocks.push(Block::new(id.clone(), kind, order, defaults));
        Ok(id)
    }

    pub fn patch_block(&mut self, id: &str, patch: &BlockPatch) -> ModelResult<PatchOutcome> {
        let block = self
            .linear_mut()?
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| ModelError::BlockNotFound(id.to_string()))?;

        let mut changed = merge_fields(&mut block.content, &patch.content);
        changed |= merge_fields(&mut block.style, &patch.style);
        if let Some(visible) = patch.visible {
            if block.visible != visible {
                block.visible = visible;
                changed = true;
            }
        }

        if changed {
            block.revision += 1;
        }

        Ok(PatchOutcome {
            changed,
            revision: block.revision,
        })
    }

    pub fn remove_block(&mut self, id: &str) -> ModelResult<Block> {
        let blocks = self.linear_mut()?;
        let index = blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| ModelError::BlockNotFound(id.to_string()))?;

        let removed = blocks.remove(index);
        compact_order(blocks);
        Ok(removed)
    }

    /// Reorder blocks; `ids` must name every block exactly once
    pub fn reorder_blocks(&mut self, ids: &[String]) -> ModelResult<()> {
        let blocks = self.linear_mut()?;

        if ids.len() != blocks.len() {
            return Err(ModelError::invalid_reorder(format!(
                "expected {} ids, got {}",
                blocks.len(),
                ids.len()
            )));
        }

        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                return Err(ModelError::invalid_reorder(format!("duplicate id {}", id)));
            }
            if !blocks.iter().any(|b| &b.id == id) {
                return Err(ModelError::BlockNotFound(id.clone()));
            }
        }

        blocks.sort_by_key(|b| ids.iter().position(|id| *id == b.id));
        compact_order(blocks);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Free mode
    // ------------------------------------------------------------------

    /// Append an empty section, returning its id
    pub fn add_section(&mut self, background: FieldMap) -> ModelResult<String> {
        self.free_mut()?;
        let id = self.ids.new_id()?;
        let sections = self.free_mut()?;
        sections.push(Section {
            id: id.clone(),
            order: sections.len() as u32,
            background,
            elements: Vec::new(),
        });
        Ok(id)
    }

    /// Append an element to the end of a section's flow, returning its id
    pub fn add_element(
        &mut self,
        section_id: &str,
        kind: &str,
        defaults: FieldMap,
    ) -> ModelResult<String> {
        let index = self
            .free_mut()?
            .iter()
            .position(|s| s.id == section_id)
            .ok_or_else(|| ModelError::SectionNotFound(section_id.to_string()))?;

        let id = self.ids.new_id()?;
        let section = &mut self.free_mut()?[index];

        let z_index = section.elements.iter().map(|e| e.z_index + 1).max().unwrap_or(0);
        section.elements.push(Element {
            id: id.clone(),
            kind: kind.to_string(),
            position: Position::Flow {
                slot: section.elements.len() as u32,
            },
            z_index,
            content: defaults,
            style: FieldMap::new(),
            locked: false,
            hidden: false,
            revision: 0,
        });
        Ok(id)
    }

    pub fn patch_element(&mut self, id: &str, patch: &ElementPatch) -> ModelResult<PatchOutcome> {
        let element = self
            .free_mut()?
            .iter_mut()
            .flat_map(|s| s.elements.iter_mut())
            .find(|e| e.id == id)
            .ok_or_else(|| ModelError::ElementNotFound(id.to_string()))?;

        // A locked element may only be moved by a patch that also unlocks it
        let unlocking = patch.locked == Some(false);
        if element.locked && !unlocking && (patch.position.is_some() || patch.z_index.is_some()) {
            return Err(ModelError::ElementLocked(id.to_string()));
        }

        let mut changed = merge_fields(&mut element.content, &patch.content);
        changed |= merge_fields(&mut element.style, &patch.style);
        changed |= set_if_changed(&mut element.position, patch.position.clone());
        changed |= set_if_changed(&mut element.z_index, patch.z_index);
        changed |= set_if_changed(&mut element.locked, patch.locked);
        changed |= set_if_changed(&mut element.hidden, patch.hidden);

        if changed {
            element.revision += 1;
        }

        Ok(PatchOutcome {
            changed,
            revision: element.revision,
        })
    }

    pub fn remove_element(&mut self, id: &str) -> ModelResult<Element> {
        for section in self.free_mut()? {
            if let Some(index) = section.elements.iter().position(|e| e.id == id) {
                return Ok(section.elements.remove(index));
            }
        }
        Err(ModelError::ElementNotFound(id.to_string()))
    }

    pub fn remove_section(&mut self, id: &str) -> ModelResult<Section> {
        let sections = self.free_mut()?;
        let index = sections
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| ModelError::SectionNotFound(id.to_string()))?;

        let removed = sections.remove(index);
        compact_order(sections);
        Ok(removed)
    }

    /// Check id uniqueness and dense ordering
    pub fn check_invariants(&self) -> ModelResult<()> {
        let mut seen = HashSet::new();
        for id in self.content.ids() {
            if !seen.insert(id) {
                return Err(ModelError::MalformedPayload(format!("duplicate id {}", id)));
            }
        }

        let orders: Vec<u32> = match &self.content {
            Content::Linear(blocks) => blocks.iter().map(|b| b.order).collect(),
            Content::Free(sections) => sections.iter().map(|s| s.order).collect(),
        };
        if orders.iter().enumerate().any(|(i, order)| *order != i as u32) {
            return Err(ModelError::MalformedPayload(format!(
                "orders are not dense: {:?}",
                orders
            )));
        }

        Ok(())
    }

    fn linear_mut(&mut self) -> ModelResult<&mut Vec<Block>> {
        match &mut self.content {
            Content::Linear(blocks) => Ok(blocks),
            Content::Free(_) => Err(ModelError::wrong_mode(Mode::Linear, Mode::Free)),
        }
    }

    fn free_mut(&mut self) -> ModelResult<&mut Vec<Section>> {
        match &mut self.content {
            Content::Free(sections) => Ok(sections),
            Content::Linear(_) => Err(ModelError::wrong_mode(Mode::Free, Mode::Linear)),
        }
    }
}

fn normalized(content: Content) -> Content {
    match content {
        Content::Linear(mut blocks) => {
            normalize_order(&mut blocks);
            Content::Linear(blocks)
        }
        Content::Free(mut sections) => {
            normalize_order(&mut sections);
            Content::Free(sections)
        }
    }
}

fn set_if_changed<T: PartialEq>(target: &mut T, value: Option<T>) -> bool {
    match value {
        Some(value) if *target != value => {
            *target = value;
            true
        }
        _ => false,
    }
}
