//! # Update Configuration Module
//!
//! Provides configuration for a database update walk.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `UpdateConfig` holding the injected collaborators (storage, archive plugins,
//! song loader) and the walk settings. Validation is fail-fast: a missing
//! collaborator is reported with an actionable message at build time instead
//! of surfacing halfway through a walk.
//!
//! ## Required Settings
//!
//! - `music_directory` - Root of the storage tree mirrored by the database
//!
//! ## Collaborators (with platform defaults)
//!
//! - `Storage` - Stat, listing and path mapping (desktop default: `LocalStorage`)
//! - `ArchivePluginRegistry` - Suffix to plugin lookup (desktop default: zip only)
//! - `SongLoader` - Song metadata loading (desktop default: `SuffixSongLoader`)
//!
//! When the `desktop-shims` feature is enabled, the desktop defaults are
//! injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::UpdateConfig;
//!
//! let config = UpdateConfig::builder()
//!     .music_directory("/home/me/Music")
//!     .database_path("/home/me/.cache/mediadb.json")
//!     .prune_stale_archive_entries(true)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{ArchivePluginRegistry, SongLoader, Storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Largest accepted event bus buffer
pub const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// Configuration for one or more update walks.
///
/// Use [`UpdateConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct UpdateConfig {
    /// Root of the storage tree
    pub music_directory: PathBuf,

    /// Where the database snapshot is persisted, if anywhere
    pub database_path: Option<PathBuf>,

    /// Storage backend
    pub storage: Arc<dyn Storage>,

    /// Archive plugin lookup
    pub archive_plugins: Arc<dyn ArchivePluginRegistry>,

    /// Song metadata loader
    pub song_loader: Arc<dyn SongLoader>,

    /// Ignore stored timestamps and rescan everything
    pub discard: bool,

    /// Remove archive entries that a successful re-visit no longer reports
    pub prune_stale_archive_entries: bool,

    /// Event bus buffer size
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for UpdateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateConfig")
            .field("music_directory", &self.music_directory)
            .field("database_path", &self.database_path)
            .field("storage", &"Storage { ... }")
            .field("archive_plugins", &"ArchivePluginRegistry { ... }")
            .field("song_loader", &"SongLoader { ... }")
            .field("discard", &self.discard)
            .field(
                "prune_stale_archive_entries",
                &self.prune_stale_archive_entries,
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl UpdateConfig {
    /// Creates a new builder for constructing an `UpdateConfig`.
    pub fn builder() -> UpdateConfigBuilder {
        UpdateConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Music directory is not empty
    /// - Database path, when set, is not empty and is not inside the music directory
    /// - Event buffer size is > 0 and <= [`MAX_EVENT_BUFFER_SIZE`]
    pub fn validate(&self) -> Result<()> {
        if self.music_directory.as_os_str().is_empty() {
            return Err(Error::Config("Music directory cannot be empty".to_string()));
        }

        if let Some(path) = &self.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
            // The snapshot would otherwise show up in its own scan
            if path.starts_with(&self.music_directory) {
                return Err(Error::Config(format!(
                    "Database path {} must not be inside the music directory {}",
                    path.display(),
                    self.music_directory.display()
                )));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: ensure the 'desktop-shims' feature is enabled to use the default. \
             Other hosts: inject an implementation through the builder.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_storage(music_directory: &Path) -> Result<Arc<dyn Storage>> {
    use bridge_desktop::LocalStorage;

    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(music_directory));
    Ok(storage)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_storage(_music_directory: &Path) -> Result<Arc<dyn Storage>> {
    Err(capability_missing("Storage", "scanning the music directory"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_archive_plugins() -> Result<Arc<dyn ArchivePluginRegistry>> {
    use bridge_desktop::ArchivePluginList;

    let plugins: Arc<dyn ArchivePluginRegistry> = Arc::new(ArchivePluginList::with_defaults());
    Ok(plugins)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_archive_plugins() -> Result<Arc<dyn ArchivePluginRegistry>> {
    Err(capability_missing(
        "ArchivePluginRegistry",
        "opening archive files",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_song_loader() -> Result<Arc<dyn SongLoader>> {
    use bridge_desktop::SuffixSongLoader;

    let loader: Arc<dyn SongLoader> = Arc::new(SuffixSongLoader::default());
    Ok(loader)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_song_loader() -> Result<Arc<dyn SongLoader>> {
    Err(capability_missing("SongLoader", "loading song metadata"))
}

/// Builder for constructing [`UpdateConfig`] instances.
#[derive(Default)]
pub struct UpdateConfigBuilder {
    music_directory: Option<PathBuf>,
    database_path: Option<PathBuf>,
    storage: Option<Arc<dyn Storage>>,
    archive_plugins: Option<Arc<dyn ArchivePluginRegistry>>,
    song_loader: Option<Arc<dyn SongLoader>>,
    discard: bool,
    prune_stale_archive_entries: bool,
    event_buffer_size: Option<usize>,
}

impl UpdateConfigBuilder {
    /// Sets the root of the storage tree.
    pub fn music_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.music_directory = Some(path.into());
        self
    }

    /// Sets the snapshot location.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Injects a storage backend.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Injects an archive plugin registry.
    pub fn archive_plugins(mut self, plugins: Arc<dyn ArchivePluginRegistry>) -> Self {
        self.archive_plugins = Some(plugins);
        self
    }

    /// Injects a song loader.
    pub fn song_loader(mut self, loader: Arc<dyn SongLoader>) -> Self {
        self.song_loader = Some(loader);
        self
    }

    /// Forces a full rescan, ignoring stored timestamps.
    pub fn discard(mut self, discard: bool) -> Self {
        self.discard = discard;
        self
    }

    /// Enables removal of archive entries missing from a re-visit.
    pub fn prune_stale_archive_entries(mut self, enabled: bool) -> Self {
        self.prune_stale_archive_entries = enabled;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when the music directory is missing or a setting is invalid
    /// - [`Error::CapabilityMissing`] when a collaborator is neither injected
    ///   nor available as a platform default
    pub fn build(self) -> Result<UpdateConfig> {
        let music_directory = self.music_directory.ok_or_else(|| {
            Error::Config(
                "Music directory is required. Use .music_directory() to set it.".to_string(),
            )
        })?;

        let storage = match self.storage {
            Some(storage) => storage,
            None => provide_default_storage(&music_directory)?,
        };

        let archive_plugins = match self.archive_plugins {
            Some(plugins) => plugins,
            None => provide_default_archive_plugins()?,
        };

        let song_loader = match self.song_loader {
            Some(loader) => loader,
            None => provide_default_song_loader()?,
        };

        let config = UpdateConfig {
            music_directory,
            database_path: self.database_path,
            storage,
            archive_plugins,
            song_loader,
            discard: self.discard,
            prune_stale_archive_entries: self.prune_stale_archive_entries,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{ArchivePlugin, BridgeError, SongMetadata, StorageFileInfo};

    struct NullStorage;

    impl Storage for NullStorage {
        fn get_info(&self, uri: &str) -> bridge_traits::error::Result<StorageFileInfo> {
            Err(BridgeError::NotAvailable(uri.to_string()))
        }

        fn list_directory(&self, _uri: &str) -> bridge_traits::error::Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn map_fs(&self, _uri: &str) -> Option<PathBuf> {
            None
        }
    }

    struct NoPlugins;

    impl ArchivePluginRegistry for NoPlugins {
        fn from_suffix(&self, _suffix: &str) -> Option<Arc<dyn ArchivePlugin>> {
            None
        }
    }

    struct NoSongs;

    impl SongLoader for NoSongs {
        fn load_song(
            &self,
            _storage: &dyn Storage,
            _parent_uri: &str,
            _name: &str,
        ) -> Option<SongMetadata> {
            None
        }
    }

    fn injected() -> UpdateConfigBuilder {
        UpdateConfig::builder()
            .storage(Arc::new(NullStorage))
            .archive_plugins(Arc::new(NoPlugins))
            .song_loader(Arc::new(NoSongs))
    }

    #[test]
    fn test_builder_requires_music_directory() {
        let result = injected().build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Music directory is required"));
    }

    #[test]
    fn test_builder_with_injected_collaborators() {
        let config = injected()
            .music_directory("/music")
            .build()
            .expect("injected collaborators should succeed");

        assert_eq!(config.music_directory, PathBuf::from("/music"));
        assert_eq!(config.database_path, None);
        assert!(!config.discard);
        assert!(!config.prune_stale_archive_entries);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.archive_plugins.from_suffix("zip").is_none());
    }

    #[test]
    fn test_builder_flags() {
        let config = injected()
            .music_directory("/music")
            .database_path("/var/lib/mediadb.json")
            .discard(true)
            .prune_stale_archive_entries(true)
            .event_buffer_size(16)
            .build()
            .unwrap();

        assert!(config.discard);
        assert!(config.prune_stale_archive_entries);
        assert_eq!(config.event_buffer_size, 16);
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/mediadb.json"))
        );
    }

    #[test]
    fn test_validation_rejects_zero_buffer() {
        let result = injected()
            .music_directory("/music")
            .event_buffer_size(0)
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validation_rejects_oversized_buffer() {
        let result = injected()
            .music_directory("/music")
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build();

        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validation_rejects_database_inside_music_directory() {
        let result = injected()
            .music_directory("/music")
            .database_path("/music/db.json")
            .build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must not be inside the music directory"));
    }

    #[test]
    fn test_validation_rejects_empty_music_directory() {
        let result = injected().music_directory("").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_hides_collaborators() {
        let config = injected().music_directory("/music").build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("Storage { ... }"));
        assert!(debug.contains("/music"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_reports_missing_storage() {
        let result = UpdateConfig::builder()
            .music_directory("/music")
            .archive_plugins(Arc::new(NoPlugins))
            .song_loader(Arc::new(NoSongs))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "Storage")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = UpdateConfig::builder()
            .music_directory(dir.path())
            .build()
            .expect("desktop defaults should succeed");

        assert!(config.archive_plugins.from_suffix("zip").is_some());
        assert!(config.archive_plugins.from_suffix("mp3").is_none());
        assert!(config.storage.map_fs("").is_some());
    }
}
