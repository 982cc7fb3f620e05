//! Suffix based song loader

use bridge_traits::{
    metadata::{SongLoader, SongMetadata},
    storage::{uri_suffix, Storage},
};
use tracing::trace;

/// Suffixes recognised by [`SuffixSongLoader::default`]
pub const DEFAULT_SONG_SUFFIXES: &[&str] = &[
    // Common audio formats
    "mp3", "flac", "ogg", "oga", "opus", "m4a", "aac", "wav", "wave", "wma", "alac", "aiff",
    "aif", "ape", "wv",
    // Tracker module formats
    "mod", "it", "s3m", "xm", "mptm", "669", "amf", "dsm", "far", "med", "mtm", "okt", "stm",
    "ult", "umx",
];

/// Song loader accepting every file whose suffix belongs to a known format
///
/// This is the "does any decoder support this suffix" check. Tags are not
/// parsed; the file stem becomes the `title` tag so the entry is
/// displayable.
#[derive(Debug, Clone)]
pub struct SuffixSongLoader {
    suffixes: Vec<String>,
}

impl SuffixSongLoader {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(|suffix| suffix.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn supports(&self, suffix: &str) -> bool {
        self.suffixes
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(suffix))
    }
}

impl Default for SuffixSongLoader {
    fn default() -> Self {
        Self::new(DEFAULT_SONG_SUFFIXES)
    }
}

impl SongLoader for SuffixSongLoader {
    fn load_song(
        &self,
        _storage: &dyn Storage,
        parent_uri: &str,
        name: &str,
    ) -> Option<SongMetadata> {
        let suffix = uri_suffix(name)?;
        if !self.supports(suffix) {
            trace!(parent = parent_uri, entry = name, "No decoder for suffix");
            return None;
        }

        let stem = &name[..name.len() - suffix.len() - 1];
        Some(
            SongMetadata::default()
                .with_format(suffix.to_ascii_lowercase())
                .with_tag("title", stem),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalStorage;

    #[test]
    fn test_loads_supported_suffix() {
        let storage = LocalStorage::new("/nonexistent");
        let loader = SuffixSongLoader::default();

        let metadata = loader
            .load_song(&storage, "mods/pack.zip", "Dance.IT")
            .expect("module files are songs");
        assert_eq!(metadata.format.as_deref(), Some("it"));
        assert_eq!(metadata.tags.get("title").map(String::as_str), Some("Dance"));
    }

    #[test]
    fn test_rejects_unknown_suffix() {
        let storage = LocalStorage::new("/nonexistent");
        let loader = SuffixSongLoader::default();

        assert!(loader.load_song(&storage, "", "cover.jpg").is_none());
        assert!(loader.load_song(&storage, "", "README").is_none());
    }

    #[test]
    fn test_custom_suffixes() {
        let loader = SuffixSongLoader::new(["SID"]);
        assert!(loader.supports("sid"));
        assert!(!loader.supports("mp3"));
    }
}
