//! Song Metadata Loading
//!
//! Tag extraction is format specific and lives outside the core. The core
//! only asks a [`SongLoader`] whether a file (or archive entry) is a playable
//! song and stores whatever metadata it returns without interpreting it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::storage::Storage;

/// Opaque song metadata produced by a [`SongLoader`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongMetadata {
    /// Container/codec format, usually the file suffix
    pub format: Option<String>,
    /// Duration in milliseconds, when known
    pub duration_ms: Option<u64>,
    /// Modification time of the file the song was loaded from
    pub mtime: Option<i64>,
    /// Free-form tags (title, artist, ...)
    pub tags: BTreeMap<String, String>,
}

impl SongMetadata {
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_mtime(mut self, mtime: i64) -> Self {
        self.mtime = Some(mtime);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Song loading capability
///
/// `parent_uri` is the URI of the directory node that will own the song. For
/// archive entries it lies inside the archive (e.g. `mods/pack.zip/inner`).
///
/// Returns `None` when the entry is not a playable song or fails to parse.
/// Callers treat `None` as "skip silently".
pub trait SongLoader: Send + Sync {
    fn load_song(
        &self,
        storage: &dyn Storage,
        parent_uri: &str,
        name: &str,
    ) -> Option<SongMetadata>;
}
