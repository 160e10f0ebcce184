// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The package archive: wire messages and conversion from file trees.
//!
//! Entries of every directory are emitted in ascending byte order of
//! their names, so the same tree always encodes to the same bytes.

use prost::Message;

use crate::{Error, Node, Result, Tree};

#[cfg(test)]
#[path = "./archive_test.rs"]
mod archive_test;

/// Root of a package archive.
#[derive(Clone, PartialEq, Message)]
pub struct Archive {
    #[prost(message, repeated, tag = "1")]
    pub files: Vec<File>,
}

/// One named entry of an archive.
#[derive(Clone, PartialEq, Message)]
pub struct File {
    #[prost(string, tag = "1")]
    pub name: String,

    #[prost(oneof = "file::Content", tags = "2, 3, 4, 5")]
    pub content: Option<file::Content>,
}

/// Entries of a directory inside an archive.
#[derive(Clone, PartialEq, Message)]
pub struct Directory {
    #[prost(message, repeated, tag = "1")]
    pub files: Vec<File>,
}

pub mod file {
    /// What a [`super::File`] holds.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Content {
        #[prost(message, tag = "2")]
        Directory(super::Directory),
        #[prost(bytes, tag = "3")]
        Regular(Vec<u8>),
        #[prost(bytes, tag = "4")]
        Executable(Vec<u8>),
        #[prost(string, tag = "5")]
        Symlink(String),
    }
}

/// Convert a tree into an archive.
pub fn to_archive(tree: &Tree) -> Result<Archive> {
    Ok(Archive {
        files: directory_files(tree)?,
    })
}

/// Serialize a tree straight to archive bytes.
pub fn encode_archive(tree: &Tree) -> Result<Vec<u8>> {
    let archive = to_archive(tree)?;
    let bytes = archive.encode_to_vec();
    tracing::debug!(
        entries = tree.count_nodes(),
        size = bytes.len(),
        "serialized archive"
    );
    Ok(bytes)
}

/// Decode archive bytes.
pub fn decode_archive(bytes: &[u8]) -> Result<Archive> {
    Archive::decode(bytes).map_err(|err| Error::InvalidPackage(format!("bad archive: {err}")))
}

/// Convert an archive back into a tree.
pub fn from_archive(archive: Archive) -> Result<Tree> {
    tree_from_files(archive.files)
}

/// Entries of one directory, sized up front and in name order.
fn directory_files(tree: &Tree) -> Result<Vec<File>> {
    let mut files = Vec::with_capacity(tree.len());
    // `Tree` iterates in ascending name order.
    for (name, node) in tree.iter() {
        check_name(name)?;
        let content = match node {
            Node::Directory(kids) => file::Content::Directory(Directory {
                files: directory_files(kids)?,
            }),
            Node::Regular {
                data,
                executable: false,
            } => file::Content::Regular(data.clone()),
            Node::Regular {
                data,
                executable: true,
            } => file::Content::Executable(data.clone()),
            Node::Symlink { target } => file::Content::Symlink(target.clone()),
        };
        files.push(File {
            name: name.clone(),
            content: Some(content),
        });
    }
    Ok(files)
}

fn tree_from_files(files: Vec<File>) -> Result<Tree> {
    let mut tree = Tree::new();
    for file in files {
        check_name(&file.name)?;
        let node = match file.content {
            Some(file::Content::Directory(dir)) => Node::Directory(tree_from_files(dir.files)?),
            Some(file::Content::Regular(data)) => Node::file(data),
            Some(file::Content::Executable(data)) => Node::executable(data),
            Some(file::Content::Symlink(target)) => Node::symlink(target),
            None => {
                return Err(Error::Serialization(format!(
                    "archive entry {:?} has no content",
                    file.name
                )));
            }
        };
        if tree.insert(file.name.clone(), node).is_some() {
            return Err(Error::Serialization(format!(
                "duplicate archive entry {:?}",
                file.name
            )));
        }
    }
    Ok(tree)
}

/// Entry names are single path components.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(Error::Serialization(format!(
            "invalid archive entry name {name:?}"
        )));
    }
    Ok(())
}
