//! Storage Abstractions
//!
//! The library is addressed by logical URIs: UTF-8, `/`-separated, relative to
//! the storage root (the root itself is the empty string). A [`Storage`]
//! implementation resolves those URIs against whatever backend holds the
//! music collection.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Kind of a storage entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Regular,
    Directory,
    Other,
}

/// Stat information on a storage entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFileInfo {
    pub kind: FileKind,
    pub size: u64,
    /// Modification time in seconds since the Unix epoch
    pub mtime: i64,
    /// Device id, `0` when the backend has no such notion
    pub device: u64,
    pub inode: u64,
}

impl StorageFileInfo {
    pub fn regular(size: u64, mtime: i64) -> Self {
        Self {
            kind: FileKind::Regular,
            size,
            mtime,
            device: 0,
            inode: 0,
        }
    }

    pub fn directory(mtime: i64) -> Self {
        Self {
            kind: FileKind::Directory,
            size: 0,
            mtime,
            device: 0,
            inode: 0,
        }
    }

    pub fn is_regular(&self) -> bool {
        self.kind == FileKind::Regular
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

/// Storage backend trait
///
/// Abstracts the location of the music collection:
/// - Desktop: a directory on the local filesystem
/// - Remote backends (SMB, NFS, UPnP, ...): no local path, see [`Storage::map_fs`]
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::Storage;
///
/// fn is_archive_reachable(storage: &dyn Storage, parent: &str, name: &str) -> bool {
///     storage.map_child_fs(parent, name).is_some()
/// }
/// ```
pub trait Storage: Send + Sync {
    /// Stat the entry at `uri`
    fn get_info(&self, uri: &str) -> Result<StorageFileInfo>;

    /// List the names of all entries inside the directory at `uri`
    ///
    /// Names are bare (no leading path) and returned in backend order.
    fn list_directory(&self, uri: &str) -> Result<Vec<String>>;

    /// Map a URI to a path on the local filesystem
    ///
    /// Returns `None` when the backend is not locally addressable. Consumers
    /// that need direct file access (archive readers) must skip such entries.
    fn map_fs(&self, uri: &str) -> Option<PathBuf>;

    /// Map a child of the directory `parent_uri` to a local path
    fn map_child_fs(&self, parent_uri: &str, child: &str) -> Option<PathBuf> {
        self.map_fs(&join_uri(parent_uri, child))
    }
}

/// Join a parent URI and a child name
///
/// The root URI is the empty string, so its children have no leading slash.
pub fn join_uri(parent_uri: &str, child: &str) -> String {
    if parent_uri.is_empty() {
        child.to_string()
    } else {
        format!("{}/{}", parent_uri, child)
    }
}

/// Return the suffix of the last path segment (without the dot)
///
/// Hidden files (`.hidden`) and names ending with a dot have no suffix.
pub fn uri_suffix(uri: &str) -> Option<&str> {
    let base = uri.rsplit('/').next().unwrap_or(uri);
    let dot = base.rfind('.')?;
    if dot == 0 || dot + 1 == base.len() {
        return None;
    }
    Some(&base[dot + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        pub Backend {}

        impl Storage for Backend {
            fn get_info(&self, uri: &str) -> Result<StorageFileInfo>;
            fn list_directory(&self, uri: &str) -> Result<Vec<String>>;
            fn map_fs(&self, uri: &str) -> Option<PathBuf>;
        }
    }

    #[test]
    fn test_file_info_constructors() {
        let file = StorageFileInfo::regular(1024, 1_700_000_000);
        assert!(file.is_regular());
        assert!(!file.is_directory());
        assert_eq!(file.size, 1024);

        let dir = StorageFileInfo::directory(42);
        assert!(dir.is_directory());
        assert_eq!(dir.mtime, 42);
    }

    #[test]
    fn test_join_uri() {
        assert_eq!(join_uri("", "music"), "music");
        assert_eq!(join_uri("music", "album.zip"), "music/album.zip");
        assert_eq!(join_uri("a/b", "c"), "a/b/c");
    }

    #[test]
    fn test_uri_suffix() {
        assert_eq!(uri_suffix("song.mp3"), Some("mp3"));
        assert_eq!(uri_suffix("music/pack.tar.bz2"), Some("bz2"));
        assert_eq!(uri_suffix("music.dir/track"), None);
        assert_eq!(uri_suffix(".hidden"), None);
        assert_eq!(uri_suffix("trailing."), None);
        assert_eq!(uri_suffix(""), None);
    }

    #[test]
    fn test_map_child_fs_joins_uri() {
        let mut backend = MockBackend::new();
        backend.expect_map_fs().times(1).returning(|uri| {
            assert_eq!(uri, "mods/pack.zip");
            Some(PathBuf::from("/srv/music").join(uri))
        });

        assert_eq!(
            backend.map_child_fs("mods", "pack.zip"),
            Some(PathBuf::from("/srv/music/mods/pack.zip"))
        );
    }

    #[test]
    fn test_map_child_fs_not_local() {
        let mut backend = MockBackend::new();
        backend.expect_map_fs().returning(|_| None);

        assert_eq!(backend.map_child_fs("", "pack.zip"), None);
    }
}
