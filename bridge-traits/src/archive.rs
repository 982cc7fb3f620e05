//! Archive Abstractions
//!
//! An archive plugin knows one container format (zip, iso9660, bzip2, ...).
//! Opening an archive yields an [`ArchiveFile`] which enumerates the logical
//! entries it contains as `/`-separated UTF-8 paths relative to the archive
//! root. Entries are not files on the real filesystem.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

/// An opened archive
///
/// The handle is released through [`ArchiveFile::close`]; consumers must call
/// it on every exit path (typically from a `Drop` guard).
pub trait ArchiveFile: Send {
    /// Enumerate the archive's entry paths
    ///
    /// The sequence is lazy, finite and not restartable. Order is whatever the
    /// underlying format stores.
    fn entries(&mut self) -> Box<dyn Iterator<Item = String> + '_>;

    /// Release the underlying resources
    ///
    /// Called exactly once by the consumer. The default does nothing and leaves
    /// cleanup to `Drop`.
    fn close(&mut self) {}
}

/// Archive format plugin
///
/// # Example
///
/// ```ignore
/// use bridge_traits::archive::ArchivePlugin;
///
/// fn list(plugin: &dyn ArchivePlugin, path: &Path) -> Result<Vec<String>> {
///     let mut file = plugin.open(path)?;
///     let entries = file.entries().collect();
///     file.close();
///     Ok(entries)
/// }
/// ```
pub trait ArchivePlugin: Send + Sync {
    /// Short plugin name used in logs
    fn name(&self) -> &str;

    /// File suffixes (without the dot, lowercase) handled by this plugin
    fn suffixes(&self) -> &[&'static str];

    /// Open the archive at a local filesystem path
    ///
    /// Fails when the file is missing, corrupt or uses an unsupported
    /// internal format.
    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveFile>>;
}

/// Resolves archive plugins by file suffix
///
/// Pure lookup, no I/O.
pub trait ArchivePluginRegistry: Send + Sync {
    fn from_suffix(&self, suffix: &str) -> Option<Arc<dyn ArchivePlugin>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    struct ListArchive {
        entries: Vec<String>,
        closed: bool,
    }

    impl ArchiveFile for ListArchive {
        fn entries(&mut self) -> Box<dyn Iterator<Item = String> + '_> {
            Box::new(self.entries.drain(..))
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    #[test]
    fn test_entries_are_not_restartable() {
        let mut archive = ListArchive {
            entries: vec!["a/b.it".to_string(), "c.mod".to_string()],
            closed: false,
        };

        let first: Vec<String> = archive.entries().collect();
        assert_eq!(first, vec!["a/b.it", "c.mod"]);
        assert_eq!(archive.entries().count(), 0);

        archive.close();
        assert!(archive.closed);
    }

    struct FailingPlugin;

    impl ArchivePlugin for FailingPlugin {
        fn name(&self) -> &str {
            "failing"
        }

        fn suffixes(&self) -> &[&'static str] {
            &["bad"]
        }

        fn open(&self, path: &Path) -> Result<Box<dyn ArchiveFile>> {
            Err(BridgeError::ArchiveOpen {
                path: path.display().to_string(),
                message: "corrupt".to_string(),
            })
        }
    }

    #[test]
    fn test_open_error_carries_path() {
        let err = match FailingPlugin.open(Path::new("/tmp/x.bad")) {
            Ok(_) => panic!("open should fail"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("/tmp/x.bad"));
        assert!(err.to_string().contains("corrupt"));
    }
}
