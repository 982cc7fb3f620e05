//! # Host Bridge Traits
//!
//! Collaborator contracts consumed by the media database update core.
//!
//! ## Overview
//!
//! The update core never touches the filesystem, archive formats or tag
//! parsers directly. Each of those concerns is a capability injected through
//! one of the traits below, so the core can be driven by desktop
//! implementations (`bridge-desktop`) or by in-memory test doubles.
//!
//! ## Traits
//!
//! ### Storage
//! - [`Storage`](storage::Storage) - Maps logical library URIs to stat info,
//!   directory listings and (when possible) local filesystem paths
//!
//! ### Archives
//! - [`ArchivePlugin`](archive::ArchivePlugin) - Opens one archive format
//! - [`ArchiveFile`](archive::ArchiveFile) - An opened archive yielding entry paths
//! - [`ArchivePluginRegistry`](archive::ArchivePluginRegistry) - Resolves a plugin by file suffix
//!
//! ### Metadata
//! - [`SongLoader`](metadata::SongLoader) - Loads song metadata for a file or archive entry
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert backend-specific errors and keep the failing path in the
//! message.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` (archive handles only `Send`), since the
//! updater may run on a background thread while readers share the database.

pub mod archive;
pub mod error;
pub mod metadata;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use archive::{ArchiveFile, ArchivePlugin, ArchivePluginRegistry};
pub use metadata::{SongLoader, SongMetadata};
pub use storage::{join_uri, uri_suffix, FileKind, Storage, StorageFileInfo};
