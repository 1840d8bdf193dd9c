//! Error types for the editor

use invitation_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ModelError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Autosave engine has stopped")]
    EngineStopped,
}

/// Failures of the injected storage capability outside of a save
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Stored payload is malformed: {0}")]
    Malformed(String),
}

impl From<ModelError> for PersistError {
    fn from(e: ModelError) -> Self {
        PersistError::Malformed(e.to_string())
    }
}
