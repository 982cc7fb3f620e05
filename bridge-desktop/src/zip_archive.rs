//! Zip archive plugin using the `zip` crate

use bridge_traits::{
    archive::{ArchiveFile, ArchivePlugin},
    error::{BridgeError, Result},
};
use std::fs::File;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// Archive plugin for `.zip` files
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchivePlugin;

impl ArchivePlugin for ZipArchivePlugin {
    fn name(&self) -> &str {
        "zip"
    }

    fn suffixes(&self) -> &[&'static str] {
        &["zip"]
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveFile>> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file).map_err(|e| BridgeError::ArchiveOpen {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        debug!(path = %path.display(), entries = archive.len(), "Opened zip archive");
        Ok(Box::new(ZipArchiveFile {
            archive: Some(archive),
        }))
    }
}

struct ZipArchiveFile {
    archive: Option<ZipArchive<File>>,
}

impl ArchiveFile for ZipArchiveFile {
    fn entries(&mut self) -> Box<dyn Iterator<Item = String> + '_> {
        match &self.archive {
            // Directory records carry no song; their paths show up as
            // prefixes of the file entries anyway.
            Some(archive) => Box::new(
                archive
                    .file_names()
                    .filter(|name| !name.ends_with('/'))
                    .map(str::to_owned),
            ),
            None => Box::new(std::iter::empty()),
        }
    }

    fn close(&mut self) {
        self.archive = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn write_zip(path: &Path, entries: &[&str]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for entry in entries {
            if entry.ends_with('/') {
                writer.add_directory(*entry, options).unwrap();
            } else {
                writer.start_file(*entry, options).unwrap();
                writer.write_all(b"data").unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_lists_file_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pack.zip");
        write_zip(&path, &["a/", "a/b.it", "a/c.it", "d.mod"]);

        let mut archive = ZipArchivePlugin.open(&path).unwrap();
        let mut entries: Vec<String> = archive.entries().collect();
        entries.sort();
        archive.close();

        assert_eq!(entries, vec!["a/b.it", "a/c.it", "d.mod"]);
    }

    #[test]
    fn test_closed_archive_has_no_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pack.zip");
        write_zip(&path, &["x.xm"]);

        let mut archive = ZipArchivePlugin.open(&path).unwrap();
        archive.close();
        assert_eq!(archive.entries().count(), 0);
    }

    #[test]
    fn test_open_corrupt_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let err = match ZipArchivePlugin.open(&path) {
            Ok(_) => panic!("corrupt archive must not open"),
            Err(err) => err,
        };
        assert!(matches!(err, BridgeError::ArchiveOpen { .. }));
    }

    #[test]
    fn test_open_missing_archive() {
        let dir = TempDir::new().unwrap();
        let result = ZipArchivePlugin.open(&dir.path().join("missing.zip"));
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }
}
