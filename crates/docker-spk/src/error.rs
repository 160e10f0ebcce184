// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for docker-spk operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with docker-spk Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or verifying a package.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(docker_spk::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to write file
    #[error("Failed to write file: {path:?}")]
    #[diagnostic(code(docker_spk::write_failed))]
    WriteFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// External command exited unsuccessfully
    #[error("Command `{command}` failed ({status}): {stderr}")]
    #[diagnostic(
        code(docker_spk::subprocess_failed),
        help("Check that the command is installed and that the image exists")
    )]
    Subprocess {
        command: String,
        status: String,
        stderr: String,
    },

    /// Malformed or truncated tar stream
    #[error("Invalid tar stream: {0}")]
    #[diagnostic(code(docker_spk::invalid_tar))]
    InvalidTar(#[source] std::io::Error),

    /// Malformed manifest.json in an image export
    #[error("Invalid image manifest: {0}")]
    #[diagnostic(
        code(docker_spk::invalid_manifest),
        help("The image file should be the output of `docker save`")
    )]
    InvalidManifest(#[source] serde_json::Error),

    /// The image export has no manifest.json
    #[error("Image export does not contain a manifest.json")]
    #[diagnostic(
        code(docker_spk::missing_manifest),
        help("The image file should be the output of `docker save`")
    )]
    MissingManifest,

    /// Invalid YAML in the package definition
    #[error("Invalid package definition: {error}")]
    #[diagnostic(
        code(docker_spk::invalid_package_definition),
        help("Check YAML syntax and ensure 'api: spk/v0' is present")
    )]
    InvalidPackageDefinition {
        #[source]
        error: serde_yaml::Error,
    },

    /// App id is not valid base32 in the Sandstorm alphabet
    #[error("Invalid app id: {0:?}")]
    #[diagnostic(
        code(docker_spk::invalid_app_id),
        help("App ids are 52 characters drawn from 0-9 and a-z without b, i, l and o")
    )]
    InvalidAppId(String),

    /// Keyring file could not be decoded
    #[error("Invalid keyring {path:?}: {error}")]
    #[diagnostic(code(docker_spk::invalid_keyring))]
    InvalidKeyring {
        path: PathBuf,
        #[source]
        error: prost::DecodeError,
    },

    /// Key material of the wrong shape
    #[error("Invalid key: {0}")]
    #[diagnostic(code(docker_spk::invalid_key))]
    InvalidKey(String),

    /// Not a package file, or a damaged one
    #[error("Invalid package: {0}")]
    #[diagnostic(code(docker_spk::invalid_package))]
    InvalidPackage(String),

    /// A non-directory sits where a directory is required
    #[error("Conflict: non-directory {0:?} has child nodes")]
    #[diagnostic(code(docker_spk::conflict))]
    Conflict(String),

    /// Unsupported file type while reading a local directory
    #[error("{path:?}: unsupported file type")]
    #[diagnostic(code(docker_spk::unsupported_file_type))]
    UnsupportedFileType { path: PathBuf },

    /// Manifest references a layer that is not in the export
    #[error("Layer referenced by manifest not found in image: {0}")]
    #[diagnostic(code(docker_spk::layer_not_found))]
    LayerNotFound(String),

    /// No key matching the requested public key
    #[error("Key not found in keyring: {0}")]
    #[diagnostic(
        code(docker_spk::key_not_found),
        help("Run 'docker-spk init' to create a key, or pass --appkey with a key you own")
    )]
    KeyNotFound(String),

    /// Archive node violates the one-variant invariant
    #[error("Serialization failed: {0}")]
    #[diagnostic(code(docker_spk::serialization))]
    Serialization(String),

    /// Signature does not match the archive
    #[error("Bad package signature: {0}")]
    #[diagnostic(code(docker_spk::bad_signature))]
    BadSignature(String),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(docker_spk::io_error))]
    Io(#[from] std::io::Error),
}
