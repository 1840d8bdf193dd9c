//! # Invitation Model
//!
//! Content model for the invitation page builder.
//!
//! ```text
//! Document
//!  ├─ Content::Linear ── Block (id, type, order, visible, content, style, revision)
//!  └─ Content::Free ──── Section (id, order, background)
//!                          └─ Element (id, type, position, z-index, content, style, flags)
//! ```
//!
//! The model knows nothing about which type tags exist; callers validate tags
//! against the type registry and pass default content in.

pub mod content;
pub mod document;
pub mod error;
pub mod hash;
pub mod id_generator;

pub use content::{
    Block, BlockPatch, Content, Element, ElementPatch, FieldMap, Mode, Ordered, PatchOutcome,
    Position, Section,
};
pub use document::Document;
pub use error::{ModelError, ModelResult};
pub use hash::{content_hash, payload_hash, ContentHash};
pub use id_generator::IdGenerator;
