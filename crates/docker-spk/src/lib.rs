// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! docker-spk - Sandstorm packages from container images
//!
//! This crate turns the output of `docker save` into a single file tree,
//! serializes that tree into a package archive and signs it with an app key.
//!
//! # Overview
//!
//! The pipeline runs strictly in order:
//!
//! 1. each `layer.tar` is decoded into a flat path map ([`layer`])
//! 2. the flat map is turned into a tree ([`builder`])
//! 3. layer trees are merged in manifest order, later layers shadowing
//!    earlier ones, and whiteout markers are applied ([`image`], [`tree`])
//! 4. the merged tree is serialized with sorted entries ([`archive`])
//! 5. the archive bytes are digested and signed ([`sign`], [`keyring`])
//! 6. the result is written behind a magic number, xz compressed ([`package`])
//!
//! # Example
//!
//! ```yaml
//! # sandstorm-pkgdef.yaml
//! api: spk/v0
//! id: 8z7hyp5nsmnmqt3cgwsn9sjt10psrmf0jwyjrf0ypgrxu7b4rr0h
//!
//! manifest:
//!   app_title: Hello Flask
//!   app_marketing_version: "0.1.0"
//!
//! bridge_config: {}
//! ```

pub mod app_id;
pub mod archive;
pub mod builder;
pub mod error;
pub mod image;
pub mod keyring;
pub mod layer;
pub mod metadata;
pub mod package;
pub mod sign;
pub mod source;
pub mod tree;

pub use archive::{encode_archive, from_archive, to_archive, Archive};
pub use builder::{build_tree, TreeBuilder};
pub use error::{Error, Result};
pub use image::{DockerImage, ImageAssembler, ManifestItem};
pub use keyring::{KeyRecord, Keyring};
pub use layer::{read_layer, FlatMap};
pub use metadata::PackageDefinition;
pub use package::{
    build_package, default_output_path, read_package, verify_package, write_package_file, Package,
};
pub use sign::{sign, verify, Signature};
pub use source::{ContainerEngine, ImageSource};
pub use tree::{Node, Tree};

/// Well-known filename for package definitions.
pub const PKGDEF_FILENAME: &str = "sandstorm-pkgdef.yaml";

/// Well-known filename of the keyring inside the home directory.
pub const KEYRING_FILENAME: &str = ".sandstorm-keyring";

#[cfg(test)]
mod test_utils;
