// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Helpers for building tar fixtures in memory.

use std::path::Path;

use tar::{EntryType, Header};

/// One entry of a fixture tarball.
pub(crate) enum Entry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
    Exe(&'a str, &'a [u8]),
    Symlink(&'a str, &'a str),
    Fifo(&'a str),
}

/// Build an uncompressed layer tarball.
pub(crate) fn layer_tar(entries: &[Entry<'_>]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = Header::new_gnu();
        header.set_mtime(0);
        match entry {
            Entry::Dir(path) => {
                header.set_entry_type(EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder
                    .append_data(&mut header, Path::new(path), std::io::empty())
                    .unwrap();
            }
            Entry::File(path, data) | Entry::Exe(path, data) => {
                let mode = if matches!(entry, Entry::Exe(..)) { 0o755 } else { 0o644 };
                header.set_entry_type(EntryType::Regular);
                header.set_mode(mode);
                header.set_size(data.len() as u64);
                builder.append_data(&mut header, Path::new(path), *data).unwrap();
            }
            Entry::Symlink(path, target) => {
                header.set_entry_type(EntryType::Symlink);
                header.set_mode(0o777);
                header.set_size(0);
                header.set_link_name(target).unwrap();
                builder
                    .append_data(&mut header, Path::new(path), std::io::empty())
                    .unwrap();
            }
            Entry::Fifo(path) => {
                header.set_entry_type(EntryType::Fifo);
                header.set_mode(0o644);
                header.set_size(0);
                builder
                    .append_data(&mut header, Path::new(path), std::io::empty())
                    .unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

/// Build a `docker save` style export holding `layers` (path, tarball)
/// and a manifest listing `manifest_layers` in order.
pub(crate) fn image_tar(manifest_layers: &[&str], layers: &[(&str, Vec<u8>)]) -> Vec<u8> {
    image_tar_with_links(manifest_layers, layers, &[])
}

/// Like [`image_tar`], also adding `links` as (path, target) symlinks.
pub(crate) fn image_tar_with_links(
    manifest_layers: &[&str],
    layers: &[(&str, Vec<u8>)],
    links: &[(&str, &str)],
) -> Vec<u8> {
    let manifest = serde_json::json!([{
        "Config": "config.json",
        "RepoTags": ["example/app:latest"],
        "Layers": manifest_layers,
    }]);
    let manifest = serde_json::to_vec(&manifest).unwrap();

    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in layers {
        append_file(&mut builder, path, data);
    }
    for (path, target) in links {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Symlink);
        header.set_mode(0o777);
        header.set_mtime(0);
        header.set_size(0);
        header.set_link_name(target).unwrap();
        builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
    }
    append_file(&mut builder, "config.json", b"{}");
    append_file(&mut builder, "manifest.json", &manifest);
    builder.into_inner().unwrap()
}

fn append_file(builder: &mut tar::Builder<Vec<u8>>, path: &str, data: &[u8]) {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_size(data.len() as u64);
    builder.append_data(&mut header, path, data).unwrap();
}

/// A single regular-file header that declares `declared` bytes of content
/// but is followed by only `actual` bytes and no end-of-archive marker.
pub(crate) fn oversized_entry(path: &str, declared: u64, actual: usize) -> Vec<u8> {
    let mut header = Header::new_gnu();
    header.set_path(path).unwrap();
    header.set_entry_type(EntryType::Regular);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_size(declared);
    header.set_cksum();

    let mut bytes = header.as_bytes().to_vec();
    bytes.extend(std::iter::repeat(b'x').take(actual));
    bytes
}
