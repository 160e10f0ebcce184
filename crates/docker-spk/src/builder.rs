// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Conversion of a flat path map into a hierarchical tree.

use crate::layer::FlatMap;
use crate::{Error, Node, Result, Tree};

#[cfg(test)]
#[path = "./builder_test.rs"]
mod builder_test;

/// Builds a [`Tree`] out of a [`FlatMap`].
///
/// Missing ancestor directories are materialized as empty directories.
/// The resulting tree does not depend on the iteration order of the map.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    index: FlatMap,
}

impl TreeBuilder {
    pub fn new(flat: FlatMap) -> Self {
        Self { index: flat }
    }

    /// Add or replace the node at `path`.
    pub fn insert(&mut self, path: impl Into<String>, node: Node) -> &mut Self {
        self.index.insert(path.into(), node);
        self
    }

    /// Consume the builder, producing the root tree.
    pub fn build(mut self) -> Result<Tree> {
        let paths: Vec<String> = self.index.keys().cloned().collect();
        for path in &paths {
            self.ensure_ancestors(path)?;
        }

        // Children must be attached before their parent is moved out of
        // the index, so go deepest first. Ties are broken by name only to
        // keep the walk itself deterministic.
        let mut paths: Vec<String> = self.index.keys().cloned().collect();
        paths.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| a.cmp(b)));

        let mut root = Tree::new();
        for path in paths {
            let Some(node) = self.index.remove(&path) else {
                continue;
            };
            match path.rsplit_once('/') {
                None => {
                    root.insert(path, node);
                }
                Some((parent, name)) => match self.index.get_mut(parent) {
                    Some(Node::Directory(kids)) => {
                        kids.insert(name, node);
                    }
                    _ => return Err(Error::Conflict(parent.to_string())),
                },
            }
        }

        tracing::trace!(nodes = root.count_nodes(), "built tree");
        Ok(root)
    }

    /// Insert empty directories for every missing ancestor of `path`,
    /// up to (not including) the root.
    fn ensure_ancestors(&mut self, path: &str) -> Result<()> {
        let mut current = parent_path(path);
        while let Some(dir) = current {
            match self.index.get(dir) {
                Some(Node::Directory(_)) => {}
                Some(_) => return Err(Error::Conflict(dir.to_string())),
                None => {
                    self.index.insert(dir.to_string(), Node::directory());
                }
            }
            current = parent_path(dir);
        }
        Ok(())
    }
}

/// Build a tree from a flat map in one call.
pub fn build_tree(flat: FlatMap) -> Result<Tree> {
    TreeBuilder::new(flat).build()
}

/// The parent of a cleaned path, or `None` when the parent is the root.
fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

fn depth(path: &str) -> usize {
    path.bytes().filter(|b| *b == b'/').count()
}
