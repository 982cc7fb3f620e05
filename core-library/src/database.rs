//! The shared media database
//!
//! [`Database`] wraps the [`DirectoryTree`] in the one reader/writer lock
//! that guards every node. Each method holds the lock for a single
//! operation; nothing here performs I/O while holding it except
//! [`Database::save`], which only serializes an in-memory capture.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{DatabaseEntry, DatabaseStats, Device, DirectoryId, Removal, Song};
use crate::snapshot::Snapshot;
use crate::tree::{DirectoryTree, PruneReport};

#[derive(Debug, Default)]
pub struct Database {
    tree: RwLock<DirectoryTree>,
    modified: AtomicBool,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tree(tree: DirectoryTree) -> Self {
        Self {
            tree: RwLock::new(tree),
            modified: AtomicBool::new(false),
        }
    }

    // Every critical section leaves the tree consistent, so a panic in
    // another holder does not invalidate it.
    fn read(&self) -> RwLockReadGuard<'_, DirectoryTree> {
        self.tree.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryTree> {
        self.tree.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn root(&self) -> DirectoryId {
        self.read().root()
    }

    pub fn contains(&self, id: DirectoryId) -> bool {
        self.read().contains(id)
    }

    pub fn find_child(&self, parent: DirectoryId, name: &str) -> Option<DirectoryId> {
        self.read().find_child(parent, name)
    }

    /// Find or create a child directory; see [`DirectoryTree::make_child`]
    pub fn make_child(
        &self,
        parent: DirectoryId,
        name: &str,
        device: Device,
    ) -> Result<(DirectoryId, bool)> {
        self.write().make_child(parent, name, device)
    }

    /// Find or create a directory inside an archive subtree
    ///
    /// Lookup, creation and the [`Device::InArchive`] marking happen under
    /// one write lock.
    pub fn make_archive_child(&self, parent: DirectoryId, name: &str) -> Result<(DirectoryId, bool)> {
        self.write()
            .make_child_with_device(parent, name, Device::InArchive)
    }

    pub fn create_child(
        &self,
        parent: DirectoryId,
        name: &str,
        device: Device,
    ) -> Result<DirectoryId> {
        self.write().create_child(parent, name, device)
    }

    pub fn has_song(&self, directory: DirectoryId, name: &str) -> bool {
        self.read().find_song(directory, name).is_some()
    }

    pub fn find_song(&self, directory: DirectoryId, name: &str) -> Option<Song> {
        self.read().find_song(directory, name).cloned()
    }

    /// Add a song unless one with the same name exists
    ///
    /// Does not touch the modified flag; the updater decides.
    pub fn add_song(&self, directory: DirectoryId, song: Song) -> Result<bool> {
        self.write().add_song(directory, song)
    }

    pub fn remove_song(&self, directory: DirectoryId, name: &str) -> Result<Option<Song>> {
        self.write().remove_song(directory, name)
    }

    /// Delete a directory and everything below it
    pub fn delete_directory(&self, id: DirectoryId) -> Result<Removal> {
        let removal = self.write().delete(id)?;
        debug!(directory = %id, directories = removal.directories, songs = removal.songs, "Deleted directory");
        Ok(removal)
    }

    pub fn set_mtime(&self, id: DirectoryId, mtime: Option<i64>) -> Result<()> {
        self.write().set_mtime(id, mtime)
    }

    /// Stored mtime; `None` when unset or when the directory does not exist
    pub fn mtime(&self, id: DirectoryId) -> Option<i64> {
        self.read().get(id).and_then(|node| node.mtime)
    }

    pub fn device(&self, id: DirectoryId) -> Option<Device> {
        self.read().get(id).map(|node| node.device)
    }

    pub fn set_device(&self, id: DirectoryId, device: Device) -> Result<()> {
        self.write().set_device(id, device)
    }

    pub fn path(&self, id: DirectoryId) -> Result<String> {
        self.read().path(id)
    }

    /// Child directories by name
    pub fn children(&self, id: DirectoryId) -> Vec<(String, DirectoryId)> {
        self.read()
            .get(id)
            .map(|node| {
                node.children
                    .iter()
                    .map(|(name, child)| (name.clone(), *child))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn song_names(&self, id: DirectoryId) -> Vec<String> {
        self.read()
            .get(id)
            .map(|node| node.songs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Visit the whole database in pre-order under one read lock
    pub fn visit<F>(&self, visitor: F) -> Result<()>
    where
        F: FnMut(&DatabaseEntry),
    {
        let tree = self.read();
        tree.visit(tree.root(), visitor)
    }

    /// Render the database as `D <path>` / `S <uri>` lines
    pub fn dump(&self) -> Result<String> {
        let mut out = String::new();
        self.visit(|entry| {
            out.push_str(&entry.to_string());
            out.push('\n');
        })?;
        Ok(out)
    }

    pub fn stats(&self) -> DatabaseStats {
        self.read().stats()
    }

    /// Remove archive entries not listed in `keep`; see [`DirectoryTree::retain_entries`]
    pub fn retain_archive_entries(
        &self,
        archive_root: DirectoryId,
        keep: &BTreeSet<String>,
    ) -> Result<PruneReport> {
        self.write().retain_entries(archive_root, keep)
    }

    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Acquire)
    }

    /// Set the modified flag; returns `true` if the database was clean before
    pub fn mark_modified(&self) -> bool {
        !self.modified.swap(true, Ordering::AcqRel)
    }

    pub fn clear_modified(&self) {
        self.modified.store(false, Ordering::Release);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.read())
    }

    /// Persist the database and clear the modified flag
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        snapshot.write_to(path)?;
        self.clear_modified();
        info!(path = %path.display(), directories = snapshot.directories.len(), "Database saved");
        Ok(())
    }

    /// Load a database saved with [`Database::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let tree = Snapshot::read_from(path)?.restore()?;
        info!(path = %path.display(), directories = tree.len(), "Database loaded");
        Ok(Self::from_tree(tree))
    }

    /// Load `path` if it exists, otherwise start empty
    pub fn open(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "No database file, starting empty");
            Ok(Self::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::SongMetadata;
    use std::sync::Arc;
    use std::thread;

    fn song(name: &str) -> Song {
        Song::new(name, SongMetadata::default())
    }

    #[test]
    fn test_accessors() {
        let db = Database::new();
        let root = db.root();

        let (zip, created) = db.make_child(root, "p.zip", Device::InArchive).unwrap();
        assert!(created);
        assert_eq!(db.find_child(root, "p.zip"), Some(zip));
        assert_eq!(db.device(zip), Some(Device::InArchive));
        assert_eq!(db.mtime(zip), None);

        db.set_mtime(zip, Some(5)).unwrap();
        assert_eq!(db.mtime(zip), Some(5));

        assert!(db.add_song(zip, song("a.mod")).unwrap());
        assert!(db.has_song(zip, "a.mod"));
        assert_eq!(db.song_names(zip), vec!["a.mod".to_string()]);
        assert_eq!(db.path(zip).unwrap(), "p.zip");
        assert_eq!(db.children(root), vec![("p.zip".to_string(), zip)]);
    }

    #[test]
    fn test_dump_format() {
        let db = Database::new();
        let root = db.root();
        let zip = db.create_child(root, "p.zip", Device::InArchive).unwrap();
        let dir = db.create_child(zip, "d", Device::InArchive).unwrap();
        db.add_song(dir, song("x.mod")).unwrap();

        assert_eq!(db.dump().unwrap(), "D p.zip\nD p.zip/d\nS p.zip/d/x.mod\n");
    }

    #[test]
    fn test_modified_flag() {
        let db = Database::new();
        assert!(!db.is_modified());
        assert!(db.mark_modified());
        assert!(!db.mark_modified());
        assert!(db.is_modified());
        db.clear_modified();
        assert!(!db.is_modified());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediadb.json");

        let db = Database::new();
        let root = db.root();
        let zip = db.create_child(root, "p.zip", Device::InArchive).unwrap();
        db.set_mtime(zip, Some(42)).unwrap();
        db.add_song(zip, song("a.mod")).unwrap();
        db.mark_modified();

        db.save(&path).unwrap();
        assert!(!db.is_modified());

        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded.dump().unwrap(), db.dump().unwrap());
        let zip = loaded.find_child(loaded.root(), "p.zip").unwrap();
        assert_eq!(loaded.mtime(zip), Some(42));
        assert_eq!(loaded.device(zip), Some(Device::InArchive));
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("missing.json")).unwrap();
        assert_eq!(db.stats().directories, 1);
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let db = Arc::new(Database::new());
        let root = db.root();

        let writer = {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for i in 0..100 {
                    db.add_song(root, song(&format!("{}.mod", i))).unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let count = db.song_names(root).len();
                        assert!(count <= 100);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(db.stats().songs, 100);
    }
}
