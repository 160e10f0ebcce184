// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! In-memory file trees and the union-mount merge between them.

use std::collections::BTreeMap;
use std::path::Path;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./tree_test.rs"]
mod tree_test;

/// Name prefix marking a deleted sibling in a layer.
pub const WHITEOUT_PREFIX: &str = ".wh.";

/// A node in a file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A directory and its entries by name.
    Directory(Tree),
    /// A regular file, fully buffered.
    Regular { data: Vec<u8>, executable: bool },
    /// A symbolic link.
    Symlink { target: String },
}

impl Node {
    /// Create an empty directory node.
    pub fn directory() -> Self {
        Self::Directory(Tree::new())
    }

    /// Create a regular, non-executable file node.
    pub fn file(data: impl Into<Vec<u8>>) -> Self {
        Self::Regular {
            data: data.into(),
            executable: false,
        }
    }

    /// Create an executable file node.
    pub fn executable(data: impl Into<Vec<u8>>) -> Self {
        Self::Regular {
            data: data.into(),
            executable: true,
        }
    }

    /// Create a symlink node.
    pub fn symlink(target: impl Into<String>) -> Self {
        Self::Symlink {
            target: target.into(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// The entries of this node if it is a directory.
    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Directory(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_tree_mut(&mut self) -> Option<&mut Tree> {
        match self {
            Self::Directory(tree) => Some(tree),
            _ => None,
        }
    }
}

/// The entries of one directory, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.entries.get_mut(name)
    }

    /// Insert an entry, returning the one it replaced.
    pub fn insert(&mut self, name: impl Into<String>, node: Node) -> Option<Node> {
        self.entries.insert(name.into(), node)
    }

    pub fn remove(&mut self, name: &str) -> Option<Node> {
        self.entries.remove(name)
    }

    /// Iterate entries in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.entries.iter()
    }

    /// Look up a slash separated path relative to this tree.
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let mut node = self.get(parts.next()?)?;
        for part in parts {
            node = node.as_tree()?.get(part)?;
        }
        Some(node)
    }

    /// Merge `other` into this tree, consuming it.
    ///
    /// Directories present on both sides are merged recursively. Any other
    /// name collision is resolved in favor of `other`, whatever the types.
    pub fn merge(&mut self, other: Tree) {
        for (name, incoming) in other.entries {
            let incoming = match incoming {
                Node::Directory(kids) => match self.entries.get_mut(&name) {
                    Some(Node::Directory(existing)) => {
                        existing.merge(kids);
                        continue;
                    }
                    _ => Node::Directory(kids),
                },
                other => other,
            };
            self.entries.insert(name, incoming);
        }
    }

    /// Apply whiteout markers at every depth of the tree.
    ///
    /// A `.wh.<name>` entry removes itself and its sibling `<name>`.
    /// Returns how many markers were applied.
    pub fn remove_whiteouts(&mut self) -> usize {
        let markers: Vec<String> = self
            .entries
            .keys()
            .filter(|name| name.starts_with(WHITEOUT_PREFIX))
            .cloned()
            .collect();

        let mut applied = markers.len();
        for marker in markers {
            self.entries.remove(&marker);
            if let Some(target) = marker.strip_prefix(WHITEOUT_PREFIX) {
                if self.entries.remove(target).is_some() {
                    tracing::trace!(name = target, "removed whited-out entry");
                }
            }
        }

        for node in self.entries.values_mut() {
            if let Node::Directory(tree) = node {
                applied += tree.remove_whiteouts();
            }
        }
        applied
    }

    /// Total number of nodes below this tree.
    pub fn count_nodes(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                Node::Directory(tree) => 1 + tree.count_nodes(),
                _ => 1,
            })
            .sum()
    }
}

impl FromIterator<(String, Node)> for Tree {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Tree {
    type Item = (String, Node);
    type IntoIter = std::collections::btree_map::IntoIter<String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Read a node from the local file system without following symlinks.
pub fn read_local_node(path: &Path) -> Result<Node> {
    let metadata = std::fs::symlink_metadata(path).map_err(|error| Error::ReadFailed {
        path: path.to_owned(),
        error,
    })?;
    let file_type = metadata.file_type();

    if file_type.is_dir() {
        Ok(Node::Directory(read_local_tree(path)?))
    } else if file_type.is_symlink() {
        let target = std::fs::read_link(path).map_err(|error| Error::ReadFailed {
            path: path.to_owned(),
            error,
        })?;
        Ok(Node::symlink(target.to_string_lossy()))
    } else if file_type.is_file() {
        let data = std::fs::read(path).map_err(|error| Error::ReadFailed {
            path: path.to_owned(),
            error,
        })?;
        Ok(Node::Regular {
            data,
            executable: is_executable(&metadata),
        })
    } else {
        Err(Error::UnsupportedFileType {
            path: path.to_owned(),
        })
    }
}

/// Read the directory at `root` into a tree.
pub fn read_local_tree(root: &Path) -> Result<Tree> {
    let read_dir = std::fs::read_dir(root).map_err(|error| Error::ReadFailed {
        path: root.to_owned(),
        error,
    })?;

    let mut tree = Tree::new();
    for entry in read_dir {
        let entry = entry.map_err(|error| Error::ReadFailed {
            path: root.to_owned(),
            error,
        })?;
        let node = read_local_node(&entry.path())?;
        tree.insert(entry.file_name().to_string_lossy().into_owned(), node);
    }
    Ok(tree)
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    false
}
