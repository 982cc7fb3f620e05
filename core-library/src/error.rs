use crate::models::DirectoryId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Directory not found: {id}")]
    DirectoryNotFound { id: DirectoryId },

    #[error("Directory {parent} already has a child named {name:?}")]
    DuplicateName { parent: DirectoryId, name: String },

    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("The root directory cannot be deleted")]
    RootDirectory,

    #[error("Invalid snapshot: {0}")]
    Snapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
