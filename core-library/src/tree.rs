//! Arena-backed directory tree
//!
//! All nodes live in one map owned by [`DirectoryTree`]; a directory refers to
//! its children and its parent by [`DirectoryId`]. Deleting a node removes
//! its whole subtree iteratively, so arbitrarily deep archives cannot
//! overflow the stack.

use bridge_traits::join_uri;
use std::collections::{BTreeSet, HashMap};

use crate::error::{LibraryError, Result};
use crate::models::{
    validate_name, DatabaseEntry, DatabaseStats, Device, Directory, DirectoryId, Removal, Song,
};

/// What [`DirectoryTree::retain_entries`] removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Topmost removed items: a removed directory hides its contents
    pub removed: Vec<DatabaseEntry>,
    pub counts: Removal,
}

#[derive(Debug, Clone)]
pub struct DirectoryTree {
    nodes: HashMap<DirectoryId, Directory>,
    root: DirectoryId,
    next_id: u64,
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTree {
    /// Create a tree holding only the root directory
    pub fn new() -> Self {
        let root = DirectoryId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Directory::new("", None, Device::Unknown));
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> DirectoryId {
        self.root
    }

    /// Number of directories, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes
            .get(&self.root)
            .map_or(true, |root| root.is_empty())
    }

    pub fn contains(&self, id: DirectoryId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: DirectoryId) -> Option<&Directory> {
        self.nodes.get(&id)
    }

    fn node(&self, id: DirectoryId) -> Result<&Directory> {
        self.nodes
            .get(&id)
            .ok_or(LibraryError::DirectoryNotFound { id })
    }

    fn node_mut(&mut self, id: DirectoryId) -> Result<&mut Directory> {
        self.nodes
            .get_mut(&id)
            .ok_or(LibraryError::DirectoryNotFound { id })
    }

    fn allocate(&mut self) -> DirectoryId {
        let id = DirectoryId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn find_child(&self, parent: DirectoryId, name: &str) -> Option<DirectoryId> {
        self.nodes.get(&parent)?.children.get(name).copied()
    }

    /// Create a new child directory
    ///
    /// # Errors
    /// - `InvalidName` if `name` is not a single path segment
    /// - `DirectoryNotFound` if `parent` does not exist
    /// - `DuplicateName` if `parent` already has a child called `name`
    pub fn create_child(
        &mut self,
        parent: DirectoryId,
        name: &str,
        device: Device,
    ) -> Result<DirectoryId> {
        validate_name(name)?;
        if self.node(parent)?.children.contains_key(name) {
            return Err(LibraryError::DuplicateName {
                parent,
                name: name.to_string(),
            });
        }

        let id = self.allocate();
        self.node_mut(parent)?.children.insert(name.to_string(), id);
        self.nodes
            .insert(id, Directory::new(name, Some(parent), device));
        Ok(id)
    }

    /// Find or create a child directory
    ///
    /// Returns the child and whether it was created. An existing child keeps
    /// its device.
    pub fn make_child(
        &mut self,
        parent: DirectoryId,
        name: &str,
        device: Device,
    ) -> Result<(DirectoryId, bool)> {
        match self.find_child(parent, name) {
            Some(id) => Ok((id, false)),
            None => self.create_child(parent, name, device).map(|id| (id, true)),
        }
    }

    /// Find or create a child directory and force its device
    pub fn make_child_with_device(
        &mut self,
        parent: DirectoryId,
        name: &str,
        device: Device,
    ) -> Result<(DirectoryId, bool)> {
        let (id, created) = self.make_child(parent, name, device)?;
        if !created {
            self.set_device(id, device)?;
        }
        Ok((id, created))
    }

    pub fn find_song(&self, directory: DirectoryId, name: &str) -> Option<&Song> {
        self.nodes.get(&directory)?.songs.get(name)
    }

    /// Add a song; returns `false` when one with the same name already exists
    pub fn add_song(&mut self, directory: DirectoryId, song: Song) -> Result<bool> {
        song.validate()?;
        let node = self.node_mut(directory)?;
        if node.songs.contains_key(&song.name) {
            return Ok(false);
        }
        node.songs.insert(song.name.clone(), song);
        Ok(true)
    }

    pub fn remove_song(&mut self, directory: DirectoryId, name: &str) -> Result<Option<Song>> {
        Ok(self.node_mut(directory)?.songs.remove(name))
    }

    /// Delete a directory together with its whole subtree
    pub fn delete(&mut self, id: DirectoryId) -> Result<Removal> {
        if id == self.root {
            return Err(LibraryError::RootDirectory);
        }

        let node = self.node(id)?;
        let (name, parent) = (node.name.clone(), node.parent);
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.remove(&name);
        }

        let mut removal = Removal::default();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                removal.directories += 1;
                removal.songs += node.songs.len();
                stack.extend(node.children.into_values());
            }
        }

        Ok(removal)
    }

    pub fn set_mtime(&mut self, id: DirectoryId, mtime: Option<i64>) -> Result<()> {
        self.node_mut(id)?.mtime = mtime;
        Ok(())
    }

    pub fn set_device(&mut self, id: DirectoryId, device: Device) -> Result<()> {
        self.node_mut(id)?.device = device;
        Ok(())
    }

    /// Path of a directory relative to the root; the root is `""`
    pub fn path(&self, id: DirectoryId) -> Result<String> {
        let mut segments = Vec::new();
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            segments.push(current.name.as_str());
            current = self.node(parent)?;
        }
        segments.reverse();
        Ok(segments.join("/"))
    }

    /// Ids of `start` and every directory below it, in pre-order
    ///
    /// Children are ordered by name.
    pub fn descendants(&self, start: DirectoryId) -> Vec<DirectoryId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.values().rev().copied());
        }
        order
    }

    /// Pre-order traversal below `start`
    ///
    /// Reports each directory before its songs and its songs before its
    /// subdirectories. The tree root itself is not reported.
    pub fn visit<F>(&self, start: DirectoryId, mut visitor: F) -> Result<()>
    where
        F: FnMut(&DatabaseEntry),
    {
        let mut stack = vec![(start, self.path(start)?)];
        while let Some((id, path)) = stack.pop() {
            let node = self.node(id)?;
            if id != self.root {
                visitor(&DatabaseEntry::Directory { path: path.clone() });
            }
            for name in node.songs.keys() {
                visitor(&DatabaseEntry::Song {
                    uri: join_uri(&path, name),
                });
            }
            for (name, child) in node.children.iter().rev() {
                stack.push((*child, join_uri(&path, name)));
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> DatabaseStats {
        self.nodes
            .values()
            .fold(DatabaseStats::default(), |mut stats, node| {
                stats.directories += 1;
                stats.songs += node.songs.len();
                if node.device.is_in_archive() {
                    stats.archive_directories += 1;
                }
                stats
            })
    }

    /// Remove everything below `root` that `keep` does not mention
    ///
    /// `keep` holds '/'-separated paths relative to `root`. A directory
    /// survives when it is an ancestor of a kept path.
    pub fn retain_entries(
        &mut self,
        root: DirectoryId,
        keep: &BTreeSet<String>,
    ) -> Result<PruneReport> {
        let mut keep_dirs = BTreeSet::new();
        for path in keep {
            let mut end = 0;
            while let Some(offset) = path[end..].find('/') {
                end += offset;
                keep_dirs.insert(&path[..end]);
                end += 1;
            }
        }

        let root_path = self.path(root)?;
        let mut report = PruneReport::default();
        let mut stack = vec![(root, String::new())];
        while let Some((id, relative)) = stack.pop() {
            let node = self.node(id)?;
            let stale_songs: Vec<String> = node
                .songs
                .keys()
                .filter(|name| !keep.contains(&join_uri(&relative, name)))
                .cloned()
                .collect();
            let children: Vec<(String, DirectoryId)> = node
                .children
                .iter()
                .map(|(name, child)| (join_uri(&relative, name), *child))
                .collect();

            for name in stale_songs {
                self.remove_song(id, &name)?;
                report.counts.songs += 1;
                report.removed.push(DatabaseEntry::Song {
                    uri: join_uri(&root_path, &join_uri(&relative, &name)),
                });
            }

            for (child_relative, child) in children {
                if keep_dirs.contains(child_relative.as_str()) {
                    stack.push((child, child_relative));
                } else {
                    report.counts += self.delete(child)?;
                    report.removed.push(DatabaseEntry::Directory {
                        path: join_uri(&root_path, &child_relative),
                    });
                }
            }
        }

        Ok(report)
    }
}
