//! # Database Update Module
//!
//! Synchronizes the media database with the storage tree, including the
//! contents of archive files found in it.
//!
//! ## Overview
//!
//! An [`UpdateWalk`] walks the storage tree from the database root. Regular
//! files whose suffix is claimed by an archive plugin are opened and their
//! entries are grafted below a directory node named after the archive;
//! other files go through the song loader.
//!
//! ## Components
//!
//! - **Walk** (`walk`): Directory traversal, purging of vanished entries, the modified flag
//! - **Archive** (`archive`): Skip/rebuild/delete decision per archive and entry grafting
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_library::Database;
//! use core_runtime::config::UpdateConfig;
//! use core_sync::UpdateWalk;
//! use std::sync::Arc;
//!
//! let config = UpdateConfig::builder().music_directory("/music").build()?;
//! let database = Arc::new(Database::new());
//! let mut walk = UpdateWalk::new(Arc::clone(&database), &config);
//! let stats = walk.walk()?;
//! if walk.is_modified() {
//!     database.save(&path)?;
//! }
//! ```

pub mod archive;
pub mod error;
pub mod walk;

pub use archive::{ArchiveUpdate, GraftOutcome};
pub use error::{Result, SyncError};
pub use walk::{UpdateStats, UpdateWalk};
