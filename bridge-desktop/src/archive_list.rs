//! Suffix based archive plugin dispatch

use bridge_traits::archive::{ArchivePlugin, ArchivePluginRegistry};
use std::fmt;
use std::sync::Arc;

use crate::zip_archive::ZipArchivePlugin;

/// Ordered list of archive plugins
///
/// The first plugin claiming a suffix wins. Suffix matching ignores ASCII
/// case so `PACK.ZIP` resolves like `pack.zip`.
#[derive(Clone, Default)]
pub struct ArchivePluginList {
    plugins: Vec<Arc<dyn ArchivePlugin>>,
}

impl ArchivePluginList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list with every plugin built into this crate
    pub fn with_defaults() -> Self {
        let mut list = Self::new();
        list.register(Arc::new(ZipArchivePlugin));
        list
    }

    pub fn register(&mut self, plugin: Arc<dyn ArchivePlugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl ArchivePluginRegistry for ArchivePluginList {
    fn from_suffix(&self, suffix: &str) -> Option<Arc<dyn ArchivePlugin>> {
        self.plugins
            .iter()
            .find(|plugin| {
                plugin
                    .suffixes()
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(suffix))
            })
            .cloned()
    }
}

impl fmt::Debug for ArchivePluginList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|plugin| plugin.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_resolves_nothing() {
        let list = ArchivePluginList::new();
        assert!(list.is_empty());
        assert!(list.from_suffix("zip").is_none());
    }

    #[test]
    fn test_defaults_resolve_zip() {
        let list = ArchivePluginList::with_defaults();
        assert_eq!(list.len(), 1);

        let plugin = list.from_suffix("zip").expect("zip plugin");
        assert_eq!(plugin.name(), "zip");
        assert!(list.from_suffix("ZIP").is_some());
        assert!(list.from_suffix("rar").is_none());
    }

    #[test]
    fn test_debug_lists_plugin_names() {
        let list = ArchivePluginList::with_defaults();
        assert_eq!(format!("{:?}", list), "[\"zip\"]");
    }
}
