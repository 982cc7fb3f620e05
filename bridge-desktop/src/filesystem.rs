//! Local filesystem storage

use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileKind, Storage, StorageFileInfo},
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::debug;

/// Storage backed by a directory on the local filesystem
///
/// Every URI maps to `root/<uri>`, so archives found here can always be
/// opened directly.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a storage rooted at the music directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a URI below the root; URIs escaping the root are rejected
    fn resolve(&self, uri: &str) -> Option<PathBuf> {
        if uri.split('/').any(|segment| segment == "..") {
            return None;
        }

        if uri.is_empty() {
            Some(self.root.clone())
        } else {
            Some(self.root.join(uri))
        }
    }

    fn resolve_or_err(&self, uri: &str) -> Result<PathBuf> {
        self.resolve(uri)
            .ok_or_else(|| BridgeError::OperationFailed(format!("URI escapes storage root: {}", uri)))
    }
}

impl Storage for LocalStorage {
    fn get_info(&self, uri: &str) -> Result<StorageFileInfo> {
        let metadata = fs::metadata(self.resolve_or_err(uri)?)?;
        Ok(file_info(&metadata))
    }

    fn list_directory(&self, uri: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.resolve_or_err(uri)?)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => debug!(name = ?raw, "Skipping non UTF-8 file name"),
            }
        }
        names.sort();
        Ok(names)
    }

    fn map_fs(&self, uri: &str) -> Option<PathBuf> {
        self.resolve(uri)
    }
}

fn file_info(metadata: &fs::Metadata) -> StorageFileInfo {
    let kind = if metadata.is_dir() {
        FileKind::Directory
    } else if metadata.is_file() {
        FileKind::Regular
    } else {
        FileKind::Other
    };

    let mtime = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default();

    #[cfg(unix)]
    let (device, inode) = {
        use std::os::unix::fs::MetadataExt;
        (metadata.dev(), metadata.ino())
    };
    #[cfg(not(unix))]
    let (device, inode) = (0, 0);

    StorageFileInfo {
        kind,
        size: metadata.len(),
        mtime,
        device,
        inode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("mods")).unwrap();
        fs::write(dir.path().join("mods/song.it"), b"IMPM").unwrap();
        fs::write(dir.path().join("readme.txt"), b"hello").unwrap();
        let storage = LocalStorage::new(dir.path());
        (dir, storage)
    }

    #[test]
    fn test_get_info() {
        let (_dir, storage) = setup();

        let root = storage.get_info("").unwrap();
        assert!(root.is_directory());

        let file = storage.get_info("mods/song.it").unwrap();
        assert!(file.is_regular());
        assert_eq!(file.size, 4);
        assert!(file.mtime > 0);
    }

    #[test]
    fn test_get_info_missing_file() {
        let (_dir, storage) = setup();
        assert!(matches!(
            storage.get_info("missing.zip"),
            Err(BridgeError::Io(_))
        ));
    }

    #[test]
    fn test_list_directory_sorted() {
        let (_dir, storage) = setup();
        assert_eq!(storage.list_directory("").unwrap(), vec!["mods", "readme.txt"]);
        assert_eq!(storage.list_directory("mods").unwrap(), vec!["song.it"]);
    }

    #[test]
    fn test_map_fs() {
        let (dir, storage) = setup();
        assert_eq!(
            storage.map_child_fs("mods", "song.it"),
            Some(dir.path().join("mods/song.it"))
        );
        assert_eq!(storage.map_fs(""), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_rejects_parent_segments() {
        let (_dir, storage) = setup();
        assert_eq!(storage.map_fs("../etc/passwd"), None);
        assert!(storage.get_info("mods/../../x").is_err());
    }
}
