//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `Storage` rooted at a local music directory ([`LocalStorage`])
//! - `ArchivePlugin` for zip files using the `zip` crate ([`ZipArchivePlugin`])
//! - `ArchivePluginRegistry` dispatching by suffix ([`ArchivePluginList`])
//! - `SongLoader` accepting known audio/module suffixes ([`SuffixSongLoader`])
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ArchivePluginList, LocalStorage, SuffixSongLoader};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(LocalStorage::new("/home/me/Music"));
//! let plugins = Arc::new(ArchivePluginList::with_defaults());
//! let loader = Arc::new(SuffixSongLoader::default());
//! ```

mod archive_list;
mod filesystem;
mod song_loader;
mod zip_archive;

pub use archive_list::ArchivePluginList;
pub use filesystem::LocalStorage;
pub use song_loader::{SuffixSongLoader, DEFAULT_SONG_SUFFIXES};
pub use zip_archive::ZipArchivePlugin;
