// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Decoding of a single layer tarball into a flat path map.

use std::collections::HashMap;
use std::io::Read;

use tar::EntryType;

use crate::{Error, Node, Result};

#[cfg(test)]
#[path = "./layer_test.rs"]
mod layer_test;

/// Cleaned path (relative to the layer root) to node.
///
/// Directories in the map are always empty; they are filled in by
/// [`crate::TreeBuilder`].
pub type FlatMap = HashMap<String, Node>;

/// Canonicalize a tar entry name into a slash separated path relative
/// to the root, with no `.` or empty components and no trailing slash.
///
/// `..` pops a component and never climbs above the root. The root
/// itself cleans to `"."`.
pub fn clean_path(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in name.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Upper bound on the buffer reserved up front for one entry.
const MAX_PREALLOC: u64 = 1 << 20;

/// Read the full contents of a tar entry.
///
/// The declared size comes from the stream, so it only bounds the initial
/// reservation. An entry shorter than its header claims is `InvalidTar`.
pub(crate) fn read_entry_data<R: Read>(entry: &mut tar::Entry<'_, R>) -> Result<Vec<u8>> {
    let declared = entry.size();
    let mut data = Vec::with_capacity(declared.min(MAX_PREALLOC) as usize);
    entry.read_to_end(&mut data).map_err(Error::InvalidTar)?;
    if data.len() as u64 != declared {
        return Err(Error::InvalidTar(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("entry declares {declared} bytes but holds {}", data.len()),
        )));
    }
    Ok(data)
}

/// Decode a layer tar stream into a [`FlatMap`].
///
/// Directories, symlinks and regular files are kept; every other entry
/// type is skipped. Regular files are read fully into memory and count
/// as executable when any execute bit is set.
pub fn read_layer<R: Read>(reader: R) -> Result<FlatMap> {
    let mut archive = tar::Archive::new(reader);
    let mut map = FlatMap::new();
    let mut skipped = 0usize;

    for entry in archive.entries().map_err(Error::InvalidTar)? {
        let mut entry = entry.map_err(Error::InvalidTar)?;
        let entry_type = entry.header().entry_type();
        let path = {
            let raw = entry.path().map_err(Error::InvalidTar)?;
            clean_path(&raw.to_string_lossy())
        };
        if path == "." {
            continue;
        }

        let node = match entry_type {
            EntryType::Directory => Node::directory(),
            EntryType::Symlink => {
                let target = entry
                    .link_name()
                    .map_err(Error::InvalidTar)?
                    .map(|target| target.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Node::Symlink { target }
            }
            kind if kind.is_file() => {
                let mode = entry.header().mode().map_err(Error::InvalidTar)?;
                let data = read_entry_data(&mut entry)?;
                Node::Regular {
                    data,
                    executable: mode & 0o111 != 0,
                }
            }
            kind => {
                tracing::trace!(path = %path, ?kind, "skipping unsupported tar entry");
                skipped += 1;
                continue;
            }
        };
        map.insert(path, node);
    }

    tracing::debug!(entries = map.len(), skipped, "decoded layer");
    Ok(map)
}
