//! # Content Types
//!
//! The two shapes an invitation document can take:
//!
//! ```text
//! Linear: [Block, Block, Block]              ordered list, one column
//! Free:   [Section { [Element, Element] }]   sections of positioned elements
//! ```
//!
//! Field maps (`content`, `style`, `background`) are JSON objects. `serde_json`
//! keeps their keys sorted, so the serialized form of any value is canonical
//! and safe to hash.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Type-specific field map (content, style overrides, section background)
pub type FieldMap = serde_json::Map<String, Value>;

/// Editing mode of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Linear,
    Free,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Linear => "linear",
            Mode::Free => "free",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Mode::Linear),
            "free" => Ok(Mode::Free),
            other => Err(ModelError::MalformedPayload(format!("unknown mode '{}'", other))),
        }
    }
}

fn default_visible() -> bool {
    true
}

/// Ordered unit of content in the linear representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub order: u32,

    #[serde(default = "default_visible")]
    pub visible: bool,

    #[serde(default)]
    pub content: FieldMap,

    #[serde(default)]
    pub style: FieldMap,

    #[serde(default)]
    pub revision: u64,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, order: u32, content: FieldMap) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            order,
            visible: true,
            content,
            style: FieldMap::new(),
            revision: 0,
        }
    }
}

/// Placement of an element inside its section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Position {
    /// Explicit geometry authored in the free editor
    Absolute {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },

    /// Vertical auto-flow; `slot` is the element's place in the flow
    #[serde(rename = "auto")]
    Flow { slot: u32 },
}

impl Position {
    /// Key used to put elements into reading order: `(vertical, horizontal)`.
    ///
    /// Flow slots read as vertical offsets with no horizontal offset.
    pub fn reading_key(&self) -> (f64, f64) {
        match self {
            Position::Absolute { x, y, .. } => (*y, *x),
            Position::Flow { slot } => (f64::from(*slot), 0.0),
        }
    }

    pub fn is_flow(&self) -> bool {
        matches!(self, Position::Flow { .. })
    }
}

/// Freely positioned content unit inside a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub position: Position,

    #[serde(default)]
    pub z_index: i32,

    #[serde(default)]
    pub content: FieldMap,

    #[serde(default)]
    pub style: FieldMap,

    #[serde(default)]
    pub locked: bool,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub revision: u64,
}

/// Free-position container in the free representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,

    pub order: u32,

    #[serde(default)]
    pub background: FieldMap,

    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Items that carry a dense `order` within their collection
pub trait Ordered {
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
}

impl Ordered for Block {
    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

impl Ordered for Section {
    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// Sort by existing order (stable) and renumber to `0..n`
pub fn normalize_order<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(|item| item.order());
    compact_order(items);
}

/// Renumber to `0..n` in current array order
pub fn compact_order<T: Ordered>(items: &mut [T]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_order(index as u32);
    }
}

/// The document payload: exactly one representation at a time
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Linear(Vec<Block>),
    Free(Vec<Section>),
}

impl Content {
    pub fn empty(mode: Mode) -> Self {
        match mode {
            Mode::Linear => Content::Linear(Vec::new()),
            Mode::Free => Content::Free(Vec::new()),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Content::Linear(_) => Mode::Linear,
            Content::Free(_) => Mode::Free,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Content::Linear(blocks) => blocks.len(),
            Content::Free(sections) => sections.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize to the persisted collection (a bare array, no mode marker)
    pub fn to_payload(&self) -> Value {
        // String-keyed structs always serialize
        match self {
            Content::Linear(blocks) => serde_json::to_value(blocks).unwrap_or_default(),
            Content::Free(sections) => serde_json::to_value(sections).unwrap_or_default(),
        }
    }

    /// Deserialize a persisted collection whose mode is already known
    pub fn from_payload_as(mode: Mode, payload: Value) -> ModelResult<Self> {
        let content = match mode {
            Mode::Linear => Content::Linear(
                serde_json::from_value(payload)
                    .map_err(|e| ModelError::MalformedPayload(e.to_string()))?,
            ),
            Mode::Free => Content::Free(
                serde_json::from_value(payload)
                    .map_err(|e| ModelError::MalformedPayload(e.to_string()))?,
            ),
        };
        Ok(content)
    }

    /// Every item id in the document, sections and elements included
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Content::Linear(blocks) => blocks.iter().map(|b| b.id.as_str()).collect(),
            Content::Free(sections) => sections
                .iter()
                .flat_map(|s| {
                    std::iter::once(s.id.as_str()).chain(s.elements.iter().map(|e| e.id.as_str()))
                })
                .collect(),
        }
    }

    /// Every type tag used by blocks or elements, in document order
    pub fn kinds(&self) -> Vec<&str> {
        match self {
            Content::Linear(blocks) => blocks.iter().map(|b| b.kind.as_str()).collect(),
            Content::Free(sections) => sections
                .iter()
                .flat_map(|s| s.elements.iter().map(|e| e.kind.as_str()))
                .collect(),
        }
    }
}

/// Partial update for a block (shallow merge onto content/style)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockPatch {
    #[serde(default)]
    pub content: FieldMap,

    #[serde(default)]
    pub style: FieldMap,

    #[serde(default)]
    pub visible: Option<bool>,
}

/// Fields the UI may never send in a patch
const IMMUTABLE_FIELDS: &[&str] = &["id", "type", "order", "revision"];

impl BlockPatch {
    pub fn content(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut patch = Self::default();
        patch.content.insert(field.into(), value.into());
        patch
    }

    pub fn style(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut patch = Self::default();
        patch.style.insert(field.into(), value.into());
        patch
    }

    pub fn visibility(visible: bool) -> Self {
        Self {
            visible: Some(visible),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.content.insert(field.into(), value.into());
        self
    }

    /// Decode a patch sent by the UI, rejecting writes to immutable fields
    pub fn from_json(value: Value) -> ModelResult<Self> {
        reject_immutable(&value)?;
        serde_json::from_value(value).map_err(|e| ModelError::malformed_patch(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.style.is_empty() && self.visible.is_none()
    }
}

/// Partial update for an element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ElementPatch {
    #[serde(default)]
    pub content: FieldMap,

    #[serde(default)]
    pub style: FieldMap,

    #[serde(default)]
    pub position: Option<Position>,

    #[serde(default)]
    pub z_index: Option<i32>,

    #[serde(default)]
    pub locked: Option<bool>,

    #[serde(default)]
    pub hidden: Option<bool>,
}

impl ElementPatch {
    pub fn content(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut patch = Self::default();
        patch.content.insert(field.into(), value.into());
        patch
    }

    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn from_json(value: Value) -> ModelResult<Self> {
        reject_immutable(&value)?;
        serde_json::from_value(value).map_err(|e| ModelError::malformed_patch(e.to_string()))
    }
}

fn reject_immutable(value: &Value) -> ModelResult<()> {
    let object = value
        .as_object()
        .ok_or_else(|| ModelError::malformed_patch("patch must be an object"))?;

    if let Some(field) = IMMUTABLE_FIELDS.iter().find(|f| object.contains_key(**f)) {
        return Err(ModelError::malformed_patch(format!("field '{}' is immutable", field)));
    }

    Ok(())
}

/// Result of applying a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOutcome {
    /// False when every patched value was already present
    pub changed: bool,
    pub revision: u64,
}

/// Shallow merge; returns whether any value actually changed
pub(crate) fn merge_fields(target: &mut FieldMap, patch: &FieldMap) -> bool {
    let mut changed = false;
    for (key, value) in patch {
        if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}
