//! # Update Walk
//!
//! Walks the storage tree and brings the database in line with it.
//!
//! ## Workflow
//! 1. Stat the storage root and record its device
//! 2. Pop a directory from an explicit stack and list it on storage
//! 3. Sub-directories are created (or refreshed) and pushed
//! 4. Regular files are offered to the archive plugins by suffix; files no
//!    plugin claims go through the song loader
//! 5. Children and songs that vanished from storage are purged
//!
//! Directories marked [`Device::InArchive`] are never listed on storage;
//! their contents are owned by the archive sync.
//!
//! Every failure below the root is logged and absorbed: one unreadable
//! directory or broken archive never aborts the walk.

use bridge_traits::{
    join_uri, uri_suffix, ArchivePluginRegistry, BridgeError, SongLoader, Storage,
    StorageFileInfo,
};
use core_library::{Database, Device, DirectoryId, Removal, Song};
use core_runtime::config::UpdateConfig;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, UpdateEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{Result, SyncError};

/// Counters of one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStats {
    pub directories_scanned: u64,
    pub archives_opened: u64,
    /// Archives skipped because their mtime did not change
    pub archives_skipped: u64,
    pub archives_failed: u64,
    pub songs_added: u64,
    pub songs_updated: u64,
    pub songs_removed: u64,
    pub directories_removed: u64,
}

/// A single pass over the storage tree
///
/// One walk at a time may mutate a [`Database`]; readers can keep using it
/// concurrently.
pub struct UpdateWalk {
    pub(crate) database: Arc<Database>,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) archive_plugins: Arc<dyn ArchivePluginRegistry>,
    pub(crate) song_loader: Arc<dyn SongLoader>,
    pub(crate) event_bus: Option<EventBus>,
    pub(crate) database_path: Option<PathBuf>,
    pub(crate) discard: bool,
    pub(crate) prune_stale_archive_entries: bool,
    pub(crate) modified: bool,
    pub(crate) stats: UpdateStats,
}

impl UpdateWalk {
    pub fn new(database: Arc<Database>, config: &UpdateConfig) -> Self {
        Self {
            database,
            storage: Arc::clone(&config.storage),
            archive_plugins: Arc::clone(&config.archive_plugins),
            song_loader: Arc::clone(&config.song_loader),
            event_bus: None,
            database_path: config.database_path.clone(),
            discard: config.discard,
            prune_stale_archive_entries: config.prune_stale_archive_entries,
            modified: false,
            stats: UpdateStats::default(),
        }
    }

    /// Build a walk entirely from `config`
    ///
    /// The database is loaded from `database_path` when one is configured (a
    /// missing file starts empty), and events go to a new bus holding
    /// `event_buffer_size` events per subscriber.
    pub fn from_config(config: &UpdateConfig) -> Result<Self> {
        let database = match &config.database_path {
            Some(path) => Database::open(path)?,
            None => Database::new(),
        };
        let event_bus = EventBus::new(config.event_buffer_size);
        Ok(Self::new(Arc::new(database), config).with_event_bus(event_bus))
    }

    /// Publish library and update events on `event_bus`
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.event_bus.as_ref()
    }

    /// Save the database to the configured `database_path` if it changed
    ///
    /// Returns whether a snapshot was written. Without a configured path
    /// nothing is persisted.
    pub fn save_database(&self) -> Result<bool> {
        let Some(path) = &self.database_path else {
            return Ok(false);
        };
        if !self.database.is_modified() {
            debug!(path = %path.display(), "Database unchanged, not saving");
            return Ok(false);
        }
        self.database.save(path)?;
        Ok(true)
    }

    /// Whether this walk changed the database
    ///
    /// Set on the first change and never cleared.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn stats(&self) -> UpdateStats {
        self.stats
    }

    /// Walk the whole storage tree
    ///
    /// # Errors
    /// Only when the storage root itself cannot be stat'ed or is not a
    /// directory. Everything below the root is handled in place.
    #[instrument(skip(self), fields(discard = self.discard))]
    pub fn walk(&mut self) -> Result<UpdateStats> {
        self.emit(CoreEvent::Update(UpdateEvent::Started {
            discard: self.discard,
        }));
        info!("Database update started");

        let root = self.database.root();
        let info = self.storage.get_info("")?;
        if !info.is_directory() {
            return Err(SyncError::Bridge(BridgeError::OperationFailed(
                "music directory is not a directory".to_string(),
            )));
        }
        self.database.set_device(root, Device::Id(info.device))?;
        self.database.set_mtime(root, Some(info.mtime))?;

        let mut pending = vec![root];
        while let Some(directory) = pending.pop() {
            self.stats.directories_scanned += 1;
            if let Err(e) = self.update_directory(directory, &mut pending) {
                warn!(directory = %directory, "Failed to update directory: {}", e);
            }
        }

        let stats = self.stats;
        self.emit(CoreEvent::Update(UpdateEvent::Finished {
            directories_scanned: stats.directories_scanned,
            archives_opened: stats.archives_opened,
            archives_skipped: stats.archives_skipped,
            archives_failed: stats.archives_failed,
            songs_added: stats.songs_added,
            songs_updated: stats.songs_updated,
            songs_removed: stats.songs_removed,
            directories_removed: stats.directories_removed,
            modified: self.modified,
        }));
        info!(
            directories = stats.directories_scanned,
            archives = stats.archives_opened,
            added = stats.songs_added,
            removed = stats.songs_removed,
            modified = self.modified,
            "Database update finished"
        );

        Ok(stats)
    }

    fn update_directory(
        &mut self,
        directory: DirectoryId,
        pending: &mut Vec<DirectoryId>,
    ) -> Result<()> {
        let uri = self.database.path(directory)?;
        let names = self.storage.list_directory(&uri)?;
        debug!(uri = %uri, entries = names.len(), "Listing directory");

        let mut present = BTreeSet::new();
        for name in names {
            if name.starts_with('.') {
                continue;
            }

            let child_uri = join_uri(&uri, &name);
            let info = match self.storage.get_info(&child_uri) {
                Ok(info) => info,
                Err(e) => {
                    debug!(uri = %child_uri, "Failed to stat: {}", e);
                    continue;
                }
            };

            let result = if info.is_directory() {
                self.update_subdirectory(directory, &name, &info)
                    .map(|child| pending.push(child))
            } else if info.is_regular() {
                self.update_regular_file(directory, &uri, &name, &info)
            } else {
                continue;
            };

            present.insert(name);
            if let Err(e) = result {
                warn!(uri = %child_uri, "Failed to update: {}", e);
            }
        }

        self.purge_vanished(directory, &present)
    }

    fn update_subdirectory(
        &mut self,
        parent: DirectoryId,
        name: &str,
        info: &StorageFileInfo,
    ) -> Result<DirectoryId> {
        // An archive was replaced by a real directory of the same name
        if let Some(existing) = self.database.find_child(parent, name) {
            if self.database.device(existing) == Some(Device::InArchive) {
                self.delete_directory(existing)?;
            }
        }
        if self.database.has_song(parent, name) {
            self.remove_song(parent, name)?;
        }

        let (child, created) = self
            .database
            .make_child(parent, name, Device::Id(info.device))?;
        if created {
            self.directory_added(child, false)?;
        } else {
            self.database.set_device(child, Device::Id(info.device))?;
        }
        self.database.set_mtime(child, Some(info.mtime))?;
        Ok(child)
    }

    fn update_regular_file(
        &mut self,
        parent: DirectoryId,
        parent_uri: &str,
        name: &str,
        info: &StorageFileInfo,
    ) -> Result<()> {
        // A real directory was replaced by a file of the same name
        if let Some(existing) = self.database.find_child(parent, name) {
            if self.database.device(existing) != Some(Device::InArchive) {
                self.delete_directory(existing)?;
            }
        }

        let is_archive = match uri_suffix(name) {
            Some(suffix) => self.update_archive_by_suffix(parent, name, suffix, info),
            None => false,
        };
        if is_archive {
            if self.database.has_song(parent, name) {
                self.remove_song(parent, name)?;
            }
            return Ok(());
        }

        // No plugin claims it (any more)
        if let Some(stale) = self.database.find_child(parent, name) {
            self.delete_directory(stale)?;
        }
        self.update_song_file(parent, parent_uri, name, info)
    }

    fn update_song_file(
        &mut self,
        parent: DirectoryId,
        parent_uri: &str,
        name: &str,
        info: &StorageFileInfo,
    ) -> Result<()> {
        let existing = self.database.find_song(parent, name);
        if let Some(song) = &existing {
            if !self.discard && song.metadata.mtime == Some(info.mtime) {
                return Ok(());
            }
        }

        let uri = join_uri(parent_uri, name);
        match self
            .song_loader
            .load_song(self.storage.as_ref(), parent_uri, name)
        {
            Some(metadata) => {
                let song = Song::new(name, metadata.with_mtime(info.mtime));
                if existing.is_some() {
                    self.database.remove_song(parent, name)?;
                    self.database.add_song(parent, song)?;
                    self.stats.songs_updated += 1;
                    debug!(uri = %uri, "Updated song");
                } else {
                    self.database.add_song(parent, song)?;
                    self.stats.songs_added += 1;
                    info!("added {}", uri);
                    self.emit(CoreEvent::Library(LibraryEvent::SongAdded { uri }));
                }
                self.set_modified();
            }
            None if existing.is_some() => {
                self.remove_song(parent, name)?;
            }
            None => {}
        }
        Ok(())
    }

    fn purge_vanished(&mut self, directory: DirectoryId, present: &BTreeSet<String>) -> Result<()> {
        for (name, child) in self.database.children(directory) {
            if !present.contains(&name) {
                self.delete_directory(child)?;
            }
        }
        for name in self.database.song_names(directory) {
            if !present.contains(&name) {
                self.remove_song(directory, &name)?;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Shared mutation helpers
    // ---------------------------------------------------------------------

    pub(crate) fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.event_bus {
            // No subscribers is fine
            let _ = bus.emit(event);
        }
    }

    pub(crate) fn set_modified(&mut self) {
        self.modified = true;
        if self.database.mark_modified() {
            self.emit(CoreEvent::Library(LibraryEvent::DatabaseModified));
        }
    }

    pub(crate) fn directory_added(&self, id: DirectoryId, in_archive: bool) -> Result<()> {
        if self.event_bus.is_some() {
            let path = self.database.path(id)?;
            self.emit(CoreEvent::Library(LibraryEvent::DirectoryAdded {
                path,
                in_archive,
            }));
        }
        Ok(())
    }

    pub(crate) fn delete_directory(&mut self, id: DirectoryId) -> Result<Removal> {
        let path = self.database.path(id)?;
        let removal = self.database.delete_directory(id)?;
        self.record_removal(removal);
        info!("removed {}", path);
        self.emit(CoreEvent::Library(LibraryEvent::DirectoryRemoved { path }));
        Ok(removal)
    }

    pub(crate) fn remove_song(&mut self, directory: DirectoryId, name: &str) -> Result<()> {
        if self.database.remove_song(directory, name)?.is_some() {
            let uri = join_uri(&self.database.path(directory)?, name);
            self.record_removal(Removal {
                directories: 0,
                songs: 1,
            });
            info!("removed {}", uri);
            self.emit(CoreEvent::Library(LibraryEvent::SongRemoved { uri }));
        }
        Ok(())
    }

    pub(crate) fn record_removal(&mut self, removal: Removal) {
        if removal.is_empty() {
            return;
        }
        self.stats.directories_removed += removal.directories as u64;
        self.stats.songs_removed += removal.songs as u64;
        self.set_modified();
    }
}

impl std::fmt::Debug for UpdateWalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateWalk")
            .field("database_path", &self.database_path)
            .field("discard", &self.discard)
            .field(
                "prune_stale_archive_entries",
                &self.prune_stale_archive_entries,
            )
            .field("modified", &self.modified)
            .field("stats", &self.stats)
            .finish()
    }
}
