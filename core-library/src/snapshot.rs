//! JSON snapshot persistence
//!
//! A snapshot is a flat list of directories in pre-order, each pointing at
//! its parent by the id it had when the snapshot was taken. Parents always
//! precede their children, so the tree can be rebuilt in one pass. Ids are
//! reassigned on load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::error::{LibraryError, Result};
use crate::models::{Device, DirectoryId, Song};
use crate::tree::DirectoryTree;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDirectory {
    pub id: DirectoryId,
    pub parent: Option<DirectoryId>,
    pub name: String,
    pub mtime: Option<i64>,
    pub device: Device,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub directories: Vec<SnapshotDirectory>,
}

impl Snapshot {
    /// Capture the whole tree
    pub fn capture(tree: &DirectoryTree) -> Self {
        let directories = tree
            .descendants(tree.root())
            .into_iter()
            .filter_map(|id| {
                let node = tree.get(id)?;
                Some(SnapshotDirectory {
                    id,
                    parent: node.parent,
                    name: node.name.clone(),
                    mtime: node.mtime,
                    device: node.device,
                    songs: node.songs.values().cloned().collect(),
                })
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            directories,
        }
    }

    /// Rebuild a tree from the snapshot
    ///
    /// # Errors
    /// `Snapshot` if the version is unknown, the first entry is not a root,
    /// or an entry refers to a parent that was not listed before it.
    pub fn restore(self) -> Result<DirectoryTree> {
        if self.version != SNAPSHOT_VERSION {
            return Err(LibraryError::Snapshot(format!(
                "unsupported version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }

        let mut entries = self.directories.into_iter();
        let root_entry = entries
            .next()
            .ok_or_else(|| LibraryError::Snapshot("no root directory".to_string()))?;
        if root_entry.parent.is_some() {
            return Err(LibraryError::Snapshot(
                "first directory is not the root".to_string(),
            ));
        }

        let mut tree = DirectoryTree::new();
        let root = tree.root();
        tree.set_mtime(root, root_entry.mtime)?;
        tree.set_device(root, root_entry.device)?;
        for song in root_entry.songs {
            tree.add_song(root, song)?;
        }

        let mut ids = HashMap::new();
        ids.insert(root_entry.id, root);

        for entry in entries {
            let parent = entry
                .parent
                .and_then(|old| ids.get(&old).copied())
                .ok_or_else(|| {
                    LibraryError::Snapshot(format!(
                        "directory {:?} refers to an unknown parent",
                        entry.name
                    ))
                })?;

            let id = tree.create_child(parent, &entry.name, entry.device)?;
            tree.set_mtime(id, entry.mtime)?;
            for song in entry.songs {
                tree.add_song(id, song)?;
            }
            ids.insert(entry.id, id);
        }

        Ok(tree)
    }

    /// Write the snapshot as JSON
    ///
    /// The file is written next to `path` first and renamed into place.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let temp = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&temp)?);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        fs::rename(&temp, path)?;
        debug!(path = %path.display(), directories = self.directories.len(), "Snapshot written");
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
