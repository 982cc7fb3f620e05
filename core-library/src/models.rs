//! Domain models for the media database

use bridge_traits::SongMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{LibraryError, Result};

// =============================================================================
// ID Types
// =============================================================================

/// Identifier of a directory node
///
/// Allocated from a counter owned by the tree; an id is never handed out
/// twice, even after its node is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryId(pub u64);

impl fmt::Display for DirectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Device a directory lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum Device {
    /// Not stat'ed yet (the root before its first scan)
    #[default]
    Unknown,
    /// Device id reported by the storage backend
    Id(u64),
    /// Contents come from an archive, not from the storage tree
    InArchive,
}

impl Device {
    pub fn is_in_archive(&self) -> bool {
        matches!(self, Device::InArchive)
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// Song leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Final path segment; unique within its directory
    pub name: String,
    #[serde(default)]
    pub metadata: SongMetadata,
}

impl Song {
    pub fn new(name: impl Into<String>, metadata: SongMetadata) -> Self {
        Self {
            name: name.into(),
            metadata,
        }
    }

    /// Validate song data
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)
    }
}

/// Directory node
///
/// `parent` is a plain index used to rebuild paths; ownership of every node
/// belongs to the tree's arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub name: String,
    pub parent: Option<DirectoryId>,
    /// Seconds since the Unix epoch; `None` until the directory was scanned
    pub mtime: Option<i64>,
    pub device: Device,
    pub children: BTreeMap<String, DirectoryId>,
    pub songs: BTreeMap<String, Song>,
}

impl Directory {
    pub fn new(name: impl Into<String>, parent: Option<DirectoryId>, device: Device) -> Self {
        Self {
            name: name.into(),
            parent,
            mtime: None,
            device,
            children: BTreeMap::new(),
            songs: BTreeMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.songs.is_empty()
    }
}

/// One item reported while visiting the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseEntry {
    /// Directory path relative to the root (the root itself is `""`)
    Directory { path: String },
    /// Song URI relative to the root
    Song { uri: String },
}

impl fmt::Display for DatabaseEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseEntry::Directory { path } => write!(f, "D {}", path),
            DatabaseEntry::Song { uri } => write!(f, "S {}", uri),
        }
    }
}

/// Counts of nodes removed by a delete or prune
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    pub directories: usize,
    pub songs: usize,
}

impl Removal {
    pub fn is_empty(&self) -> bool {
        self.directories == 0 && self.songs == 0
    }
}

impl std::ops::AddAssign for Removal {
    fn add_assign(&mut self, other: Self) {
        self.directories += other.directories;
        self.songs += other.songs;
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    /// Directories, root included
    pub directories: usize,
    pub songs: usize,
    /// Directories marked [`Device::InArchive`]
    pub archive_directories: usize,
}

/// Check that `name` can be used as a single path segment
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name cannot be empty"
    } else if name.contains('/') {
        "name cannot contain '/'"
    } else if name == "." || name == ".." {
        "name cannot be a relative path component"
    } else {
        return Ok(());
    };

    Err(LibraryError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("intro.mod").is_ok());
        assert!(validate_name("dir with spaces").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn test_song_validation() {
        let song = Song::new("a.mod", SongMetadata::default());
        assert!(song.validate().is_ok());

        let song = Song::new("", SongMetadata::default());
        assert!(matches!(
            song.validate(),
            Err(LibraryError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_device_serialization() {
        let json = serde_json::to_string(&Device::Id(42)).unwrap();
        assert_eq!(serde_json::from_str::<Device>(&json).unwrap(), Device::Id(42));

        let json = serde_json::to_string(&Device::InArchive).unwrap();
        let device: Device = serde_json::from_str(&json).unwrap();
        assert!(device.is_in_archive());
    }

    #[test]
    fn test_entry_display() {
        let dir = DatabaseEntry::Directory {
            path: "mods/pack.zip".to_string(),
        };
        let song = DatabaseEntry::Song {
            uri: "mods/pack.zip/a.mod".to_string(),
        };
        assert_eq!(dir.to_string(), "D mods/pack.zip");
        assert_eq!(song.to_string(), "S mods/pack.zip/a.mod");
    }

    #[test]
    fn test_new_directory_is_empty() {
        let dir = Directory::new("x", Some(DirectoryId(0)), Device::InArchive);
        assert!(dir.is_empty());
        assert!(!dir.is_root());
        assert_eq!(dir.mtime, None);
    }
}
