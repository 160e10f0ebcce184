// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Reading `docker save` exports and flattening their layers.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::builder::build_tree;
use crate::layer::{clean_path, read_entry_data, read_layer};
use crate::{Error, Result, Tree};

#[cfg(test)]
#[path = "./image_test.rs"]
mod image_test;

/// Name of the manifest inside an image export.
pub const MANIFEST_FILENAME: &str = "manifest.json";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Symlinks followed when resolving one layer reference.
const MAX_LINK_HOPS: usize = 8;

/// One image described by `manifest.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ManifestItem {
    #[serde(rename = "Config", default)]
    pub config: String,

    #[serde(rename = "RepoTags", default)]
    pub repo_tags: Option<Vec<String>>,

    /// Layer tarball paths, lowest layer first.
    #[serde(rename = "Layers", default)]
    pub layers: Vec<String>,
}

/// An image export: its manifest plus the raw bytes of every file in it.
#[derive(Debug, Clone, Default)]
pub struct DockerImage {
    pub manifest: Vec<ManifestItem>,
    blobs: HashMap<String, Vec<u8>>,
    /// Symlink path to cleaned target path.
    links: HashMap<String, String>,
}

impl DockerImage {
    /// Read an image export tar stream.
    ///
    /// Layer contents are buffered until the whole export has been read,
    /// since `manifest.json` may appear anywhere in the stream.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut archive = tar::Archive::new(reader);
        let mut manifest = None;
        let mut blobs = HashMap::new();
        let mut links = HashMap::new();

        for entry in archive.entries().map_err(Error::InvalidTar)? {
            let mut entry = entry.map_err(Error::InvalidTar)?;
            let entry_type = entry.header().entry_type();
            if !entry_type.is_file() && !entry_type.is_symlink() {
                continue;
            }
            let path = {
                let raw = entry.path().map_err(Error::InvalidTar)?;
                clean_path(&raw.to_string_lossy())
            };

            if entry_type.is_symlink() {
                let Some(target) = entry.link_name().map_err(Error::InvalidTar)? else {
                    continue;
                };
                let target = resolve_link(&path, &target.to_string_lossy());
                tracing::trace!(path = %path, target = %target, "recorded export symlink");
                links.insert(path, target);
                continue;
            }

            let data = read_entry_data(&mut entry)?;
            if path == MANIFEST_FILENAME {
                let items: Vec<ManifestItem> =
                    serde_json::from_slice(&data).map_err(Error::InvalidManifest)?;
                manifest = Some(items);
            } else {
                blobs.insert(path, data);
            }
        }

        let manifest = manifest.ok_or(Error::MissingManifest)?;
        tracing::debug!(
            images = manifest.len(),
            files = blobs.len(),
            links = links.len(),
            "read image export"
        );
        Ok(Self {
            manifest,
            blobs,
            links,
        })
    }

    /// Layer references in the order they must be applied.
    pub fn layer_refs(&self) -> impl Iterator<Item = &str> {
        self.manifest
            .iter()
            .flat_map(|item| item.layers.iter().map(String::as_str))
    }

    /// The raw tarball of a layer referenced by the manifest.
    ///
    /// Symlinks inside the export, which older engines write for layers
    /// shared between images, are followed.
    pub fn layer_bytes(&self, reference: &str) -> Result<&[u8]> {
        let mut path = clean_path(reference);
        for _ in 0..=MAX_LINK_HOPS {
            if let Some(data) = self.blobs.get(&path) {
                return Ok(data.as_slice());
            }
            match self.links.get(&path) {
                Some(target) => path = target.clone(),
                None => break,
            }
        }
        Err(Error::LayerNotFound(reference.to_string()))
    }

    /// Merge every layer of the image into a single tree.
    pub fn to_tree(&self) -> Result<Tree> {
        let mut assembler = ImageAssembler::new();
        for reference in self.layer_refs() {
            let bytes = self.layer_bytes(reference)?;
            tracing::debug!(layer = reference, size = bytes.len(), "applying layer");
            assembler.apply_layer_bytes(bytes)?;
        }
        tracing::info!(layers = assembler.layer_count(), "flattened image");
        Ok(assembler.finish())
    }
}

/// Accumulates layers into one tree with union-mount semantics.
#[derive(Debug, Default)]
pub struct ImageAssembler {
    tree: Tree,
    layers: usize,
}

impl ImageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a layer tarball (plain or gzip) and apply it.
    pub fn apply_layer_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let flat = if bytes.starts_with(&GZIP_MAGIC) {
            read_layer(GzDecoder::new(bytes))?
        } else {
            read_layer(bytes)?
        };
        self.apply_layer(build_tree(flat)?);
        Ok(())
    }

    /// Merge a layer on top of everything applied so far, then apply
    /// its whiteouts.
    pub fn apply_layer(&mut self, layer: Tree) {
        self.tree.merge(layer);
        let whiteouts = self.tree.remove_whiteouts();
        self.layers += 1;
        tracing::debug!(layer = self.layers, whiteouts, "merged layer");
    }

    pub fn layer_count(&self) -> usize {
        self.layers
    }

    pub fn finish(self) -> Tree {
        self.tree
    }
}

/// Resolve a symlink target against the directory holding the link.
fn resolve_link(link_path: &str, target: &str) -> String {
    if target.starts_with('/') {
        return clean_path(target);
    }
    match link_path.rsplit_once('/') {
        Some((dir, _)) => clean_path(&format!("{dir}/{target}")),
        None => clean_path(target),
    }
}
