use crate::content::Mode;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Validation failures raised by document mutations.
///
/// A mutation that returns one of these has not touched the document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown content type: {0}")]
    UnknownType(String),

    #[error("Type '{kind}' is not available in {mode} mode")]
    TypeNotAvailable { kind: String, mode: Mode },

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element is locked: {0}")]
    ElementLocked(String),

    #[error("Operation requires {expected} mode, document is in {actual} mode")]
    WrongMode { expected: Mode, actual: Mode },

    #[error("Malformed patch: {0}")]
    MalformedPatch(String),

    #[error("Invalid reorder: {0}")]
    InvalidReorder(String),

    #[error("No ids left for seed {0}")]
    IdsExhausted(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl ModelError {
    pub fn wrong_mode(expected: Mode, actual: Mode) -> Self {
        Self::WrongMode { expected, actual }
    }

    pub fn malformed_patch(message: impl Into<String>) -> Self {
        Self::MalformedPatch(message.into())
    }

    pub fn invalid_reorder(message: impl Into<String>) -> Self {
        Self::InvalidReorder(message.into())
    }
}
