//! # Archive Sync
//!
//! Materializes the contents of archive files as directory subtrees.
//!
//! An archive `mods/pack.zip` becomes a directory node `pack.zip` below
//! `mods`, marked [`Device::InArchive`], whose descendants mirror the
//! archive's '/'-separated entry paths. The node's mtime records the
//! archive file's mtime at the last successful visit, which is what lets an
//! unchanged archive be skipped without opening it.
//!
//! Archive I/O (open, entry enumeration, close) runs without holding the
//! database lock; every tree mutation is a single locked database call.

use bridge_traits::{join_uri, ArchiveFile, ArchivePlugin, StorageFileInfo};
use core_library::{Device, DirectoryId, Song};
use core_runtime::events::{CoreEvent, LibraryEvent, UpdateEvent};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, error, info, trace, warn};

use crate::walk::UpdateWalk;
use crate::{Result, SyncError};

/// Result of [`UpdateWalk::update_archive_file`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveUpdate {
    /// Stored mtime matches; the archive was not opened
    Unchanged,
    /// Storage has no local path for the archive; nothing happened
    NotLocal,
    /// The archive could not be opened; any previous subtree was deleted
    OpenFailed,
    /// The database rejected an operation while syncing
    Failed,
    /// A new subtree was created
    Created,
    /// The existing subtree was reused and re-visited
    Updated,
}

/// Result of [`UpdateWalk::update_archive_tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraftOutcome {
    /// A new song was attached
    Added,
    /// A song with that name was already present
    Existing,
    /// The song loader did not recognize the entry
    Skipped,
    /// The entry names a directory only (trailing '/'); nothing was created
    DirectoryOnly,
    /// A segment collides with a sibling of the other kind (a song where a
    /// directory is needed, or the reverse); the entry was skipped
    Conflict,
}

/// A '/'-separated archive entry split into its parts
///
/// Empty segments (leading, doubled or trailing slashes) are dropped from
/// the directory part; an empty final segment leaves `name` empty.
#[derive(Debug, PartialEq, Eq)]
struct EntryPath<'a> {
    directories: Vec<&'a str>,
    name: &'a str,
}

impl<'a> EntryPath<'a> {
    fn parse(path: &'a str) -> Self {
        let (directories, name) = path.rsplit_once('/').unwrap_or(("", path));
        Self {
            directories: directories
                .split('/')
                .filter(|segment| !segment.is_empty())
                .collect(),
            name,
        }
    }

    fn normalized(&self) -> String {
        let mut segments = self.directories.clone();
        segments.push(self.name);
        segments.join("/")
    }
}

/// An open archive, closed when dropped
struct OpenArchive {
    file: Box<dyn ArchiveFile>,
}

impl OpenArchive {
    fn open(plugin: &dyn ArchivePlugin, path: &Path) -> Result<Self> {
        plugin
            .open(path)
            .map(|file| Self { file })
            .map_err(|source| SyncError::OpenFailed {
                path: path.to_path_buf(),
                source,
            })
    }

    fn entries(&mut self) -> Box<dyn Iterator<Item = String> + '_> {
        self.file.entries()
    }
}

impl Drop for OpenArchive {
    fn drop(&mut self) {
        self.file.close();
    }
}

impl UpdateWalk {
    /// Sync one archive file found under `parent`
    ///
    /// Skips the archive when its node exists with the same mtime (unless
    /// the walk discards timestamps). Otherwise opens it, creates or reuses
    /// the node, records the new mtime and grafts every entry. When the
    /// archive fails to open, a previously synced subtree is deleted.
    ///
    /// Never fails: problems are logged and reported through the outcome.
    pub fn update_archive_file(
        &mut self,
        parent: DirectoryId,
        name: &str,
        info: &StorageFileInfo,
        plugin: &dyn ArchivePlugin,
    ) -> ArchiveUpdate {
        let existing = self.database.find_child(parent, name);
        if let Some(id) = existing {
            if !self.discard && self.database.mtime(id) == Some(info.mtime) {
                trace!(archive = name, "Archive unchanged");
                self.stats.archives_skipped += 1;
                return ArchiveUpdate::Unchanged;
            }
        }

        match self.sync_archive(parent, name, existing, info, plugin) {
            Ok(outcome) => outcome,
            Err(SyncError::NotLocallyAddressable { uri }) => {
                debug!(uri = %uri, "Archive is not on a local filesystem, skipping");
                ArchiveUpdate::NotLocal
            }
            Err(SyncError::OpenFailed { path, source }) => {
                error!(path = %path.display(), plugin = plugin.name(), "Failed to open archive: {}", source);
                self.stats.archives_failed += 1;
                let uri = self
                    .database
                    .path(parent)
                    .map(|parent_uri| join_uri(&parent_uri, name))
                    .unwrap_or_else(|_| name.to_string());
                self.emit(CoreEvent::Update(UpdateEvent::ArchiveFailed {
                    uri,
                    message: source.to_string(),
                }));

                if let Some(id) = existing {
                    if let Err(e) = self.delete_directory(id) {
                        error!(archive = name, "Failed to delete stale archive contents: {}", e);
                    }
                }
                ArchiveUpdate::OpenFailed
            }
            Err(e) => {
                error!(archive = name, "Failed to update archive: {}", e);
                ArchiveUpdate::Failed
            }
        }
    }

    fn sync_archive(
        &mut self,
        parent: DirectoryId,
        name: &str,
        existing: Option<DirectoryId>,
        info: &StorageFileInfo,
        plugin: &dyn ArchivePlugin,
    ) -> Result<ArchiveUpdate> {
        let parent_uri = self.database.path(parent)?;
        let uri = join_uri(&parent_uri, name);
        let path = self
            .storage
            .map_child_fs(&parent_uri, name)
            .ok_or_else(|| SyncError::NotLocallyAddressable { uri: uri.clone() })?;

        let mut archive = OpenArchive::open(plugin, &path)?;
        debug!(uri = %uri, plugin = plugin.name(), "Opened archive");
        self.stats.archives_opened += 1;
        self.emit(CoreEvent::Update(UpdateEvent::ArchiveOpened {
            uri: uri.clone(),
            plugin: plugin.name().to_string(),
        }));

        let (root, outcome) = match existing {
            Some(id) => {
                self.database.set_device(id, Device::InArchive)?;
                (id, ArchiveUpdate::Updated)
            }
            None => {
                let id = self.database.create_child(parent, name, Device::InArchive)?;
                self.directory_added(id, true)?;
                (id, ArchiveUpdate::Created)
            }
        };
        if self.database.mtime(root) != Some(info.mtime) {
            self.database.set_mtime(root, Some(info.mtime))?;
            // The stored mtime is what makes the next visit skip the archive
            self.set_modified();
        }

        let mut visited = BTreeSet::new();
        for entry in archive.entries() {
            match self.update_archive_tree(root, &entry) {
                Ok(GraftOutcome::Added) | Ok(GraftOutcome::Existing) => {
                    visited.insert(EntryPath::parse(&entry).normalized());
                }
                Ok(_) => {}
                Err(e) => warn!(archive = %uri, entry = %entry, "Skipping archive entry: {}", e),
            }
        }
        drop(archive);

        if self.prune_stale_archive_entries && outcome == ArchiveUpdate::Updated {
            self.prune_archive(root, &visited)?;
        }

        Ok(outcome)
    }

    fn prune_archive(&mut self, root: DirectoryId, visited: &BTreeSet<String>) -> Result<()> {
        let report = self.database.retain_archive_entries(root, visited)?;
        for entry in report.removed {
            let event = match entry {
                core_library::DatabaseEntry::Directory { path } => {
                    info!("removed {}", path);
                    LibraryEvent::DirectoryRemoved { path }
                }
                core_library::DatabaseEntry::Song { uri } => {
                    info!("removed {}", uri);
                    LibraryEvent::SongRemoved { uri }
                }
            };
            self.emit(CoreEvent::Library(event));
        }
        self.record_removal(report.counts);
        Ok(())
    }

    /// Sync an archive if a plugin claims `suffix`
    ///
    /// Returns `false` when no plugin handles the suffix, so the caller can
    /// treat the file as an ordinary one. Otherwise returns `true` whatever
    /// the sync outcome.
    pub fn update_archive_by_suffix(
        &mut self,
        parent: DirectoryId,
        name: &str,
        suffix: &str,
        info: &StorageFileInfo,
    ) -> bool {
        let Some(plugin) = self.archive_plugins.from_suffix(suffix) else {
            return false;
        };

        self.update_archive_file(parent, name, info, plugin.as_ref());
        true
    }

    /// Graft one archive entry below the archive node `root`
    ///
    /// Intermediate directories are found or created and marked
    /// [`Device::InArchive`]. The final segment becomes a song when the song
    /// loader recognizes it; an existing song of that name is left alone.
    ///
    /// Sibling names stay unique: the first entry to claim a name decides
    /// whether it is a song or a directory, and a later entry needing the
    /// other kind is skipped with [`GraftOutcome::Conflict`].
    ///
    /// # Errors
    /// - `EmptyEntry` for an empty path
    /// - `Library` when a segment is not a valid name or `root` is gone
    pub fn update_archive_tree(&mut self, root: DirectoryId, path: &str) -> Result<GraftOutcome> {
        if path.is_empty() {
            return Err(SyncError::EmptyEntry);
        }

        let entry = EntryPath::parse(path);
        if entry.name.is_empty() {
            warn!(entry = path, "Archive returned directory only");
            return Ok(GraftOutcome::DirectoryOnly);
        }

        let mut directory = root;
        for segment in &entry.directories {
            if self.database.has_song(directory, segment) {
                warn!(entry = path, segment = *segment, "Archive entry collides with a song");
                return Ok(GraftOutcome::Conflict);
            }
            let (child, created) = self.database.make_archive_child(directory, segment)?;
            if created {
                self.directory_added(child, true)?;
            }
            directory = child;
        }

        if self.database.has_song(directory, entry.name) {
            return Ok(GraftOutcome::Existing);
        }
        if self.database.find_child(directory, entry.name).is_some() {
            warn!(entry = path, "Archive entry collides with a directory");
            return Ok(GraftOutcome::Conflict);
        }

        let parent_uri = self.database.path(directory)?;
        let Some(metadata) =
            self.song_loader
                .load_song(self.storage.as_ref(), &parent_uri, entry.name)
        else {
            trace!(entry = path, "Not a song");
            return Ok(GraftOutcome::Skipped);
        };

        if !self
            .database
            .add_song(directory, Song::new(entry.name, metadata))?
        {
            return Ok(GraftOutcome::Existing);
        }

        let uri = join_uri(&parent_uri, entry.name);
        info!("added {}", uri);
        self.stats.songs_added += 1;
        self.set_modified();
        self.emit(CoreEvent::Library(LibraryEvent::SongAdded { uri }));
        Ok(GraftOutcome::Added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_path_parse() {
        let entry = EntryPath::parse("a/b/c.it");
        assert_eq!(entry.directories, vec!["a", "b"]);
        assert_eq!(entry.name, "c.it");

        let entry = EntryPath::parse("d.mod");
        assert!(entry.directories.is_empty());
        assert_eq!(entry.name, "d.mod");
    }

    #[test]
    fn test_entry_path_directory_only() {
        let entry = EntryPath::parse("x/");
        assert_eq!(entry.directories, vec!["x"]);
        assert_eq!(entry.name, "");
    }

    #[test]
    fn test_entry_path_normalizes_empty_segments() {
        let entry = EntryPath::parse("/a//b/c.it");
        assert_eq!(entry.directories, vec!["a", "b"]);
        assert_eq!(entry.normalized(), "a/b/c.it");
    }
}
