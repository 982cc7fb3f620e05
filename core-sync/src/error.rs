use bridge_traits::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{uri} has no local filesystem path")]
    NotLocallyAddressable { uri: String },

    #[error("Failed to open archive {}: {source}", .path.display())]
    OpenFailed {
        path: std::path::PathBuf,
        source: BridgeError,
    },

    #[error("Archive returned an empty entry")]
    EmptyEntry,

    #[error("Storage error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
