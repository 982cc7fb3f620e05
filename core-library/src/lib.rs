//! # Media Database Module
//!
//! Owns the in-memory media database: a tree of directories and songs
//! mirroring the storage tree, including the virtual subtrees materialized
//! from archive files.
//!
//! ## Overview
//!
//! This module manages:
//! - Arena-owned directory nodes addressed by [`DirectoryId`]
//! - The single reader/writer lock guarding the whole tree ([`Database`])
//! - Path reconstruction, pre-order visiting and text dumps
//! - JSON snapshot persistence
//!
//! Every [`Database`] accessor takes the lock for exactly one operation, so
//! callers never hold it across I/O.

pub mod database;
pub mod error;
pub mod models;
pub mod snapshot;
pub mod tree;

pub use database::Database;
pub use error::{LibraryError, Result};
pub use models::{DatabaseEntry, DatabaseStats, Device, Directory, DirectoryId, Removal, Song};
pub use snapshot::Snapshot;
pub use tree::{DirectoryTree, PruneReport};
