// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The `.spk` container: a magic number followed by an xz stream holding
//! the signature record and the archive bytes.

use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use prost::Message;
use tempfile::NamedTempFile;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::archive::decode_archive;
use crate::metadata::{BRIDGE_CONFIG_ENTRY, MANIFEST_ENTRY};
use crate::{
    app_id, encode_archive, from_archive, sign, verify, Error, ImageSource, KeyRecord, Node,
    PackageDefinition, Result, Signature, Tree,
};

#[cfg(test)]
#[path = "./package_test.rs"]
mod package_test;

/// Leading bytes of every package file.
pub const MAGIC_NUMBER: [u8; 8] = [0x8f, 0xc6, 0xcd, 0xef, 0x45, 0x1a, 0xea, 0x96];

/// File extension of package files.
pub const PACKAGE_EXTENSION: &str = "spk";

/// Top level directory dropped from every package.
pub const EXCLUDED_ROOT_ENTRY: &str = "var";

const XZ_PRESET: u32 = 9;

/// A signed archive, ready to be written out.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub signature: Signature,
    pub archive: Vec<u8>,
}

impl Package {
    /// App id of the key that signed this package.
    pub fn app_id(&self) -> String {
        app_id::encode(&self.signature.public_key)
    }

    /// Write the complete package file contents.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&MAGIC_NUMBER)?;
        let mut encoder = XzEncoder::new(writer, XZ_PRESET);
        encoder.write_all(&self.signature.to_framed_bytes())?;
        encoder.write_all(&self.archive)?;
        encoder.finish()?.flush()?;
        Ok(())
    }

    /// Check the signature and decode the archive into a tree.
    pub fn verify(&self) -> Result<Tree> {
        verify(&self.signature, &self.archive)?;
        from_archive(decode_archive(&self.archive)?)
    }
}

/// Add the package metadata to `tree`, serialize it and sign the result.
pub fn build_package(
    mut tree: Tree,
    definition: &PackageDefinition,
    key: &KeyRecord,
) -> Result<Package> {
    tree.insert(MANIFEST_ENTRY, Node::file(definition.manifest_bytes()?));
    tree.insert(BRIDGE_CONFIG_ENTRY, Node::file(definition.bridge_config_bytes()?));
    if tree.remove(EXCLUDED_ROOT_ENTRY).is_some() {
        tracing::debug!("dropped /{EXCLUDED_ROOT_ENTRY} from package");
    }

    let archive = encode_archive(&tree)?;
    let signature = sign(key, &archive)?;
    tracing::info!(
        app_id = %key.app_id(),
        nodes = tree.count_nodes(),
        bytes = archive.len(),
        "built package"
    );
    Ok(Package { signature, archive })
}

/// Write `package` to `path`.
///
/// The contents go to a temporary file in the same directory which is
/// renamed over `path` once complete.
pub fn write_package_file(path: &Path, package: &Package) -> Result<()> {
    let write_failed = |error| Error::WriteFailed {
        path: path.to_owned(),
        error,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    package.write_to(BufWriter::new(tmp.as_file_mut()))?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    tmp.persist(path).map_err(|err| write_failed(err.error))?;

    tracing::info!(path = %path.display(), "wrote package");
    Ok(())
}

/// Read a package file, without checking its signature.
pub fn read_package<R: Read>(mut reader: R) -> Result<Package> {
    let mut magic = [0u8; MAGIC_NUMBER.len()];
    reader
        .read_exact(&mut magic)
        .map_err(|_| Error::InvalidPackage("file is too short".to_string()))?;
    if magic != MAGIC_NUMBER {
        return Err(Error::InvalidPackage("bad magic number".to_string()));
    }

    let mut payload = Vec::new();
    XzDecoder::new(reader)
        .read_to_end(&mut payload)
        .map_err(|err| Error::InvalidPackage(format!("decompression failed: {err}")))?;

    let mut rest = payload.as_slice();
    let signature = Signature::decode_length_delimited(&mut rest)
        .map_err(|err| Error::InvalidPackage(format!("unreadable signature: {err}")))?;
    Ok(Package {
        signature,
        archive: rest.to_vec(),
    })
}

/// Read a package file and return its verified contents.
pub fn verify_package<R: Read>(reader: R) -> Result<Tree> {
    read_package(reader)?.verify()
}

/// Output path used when none is given explicitly.
///
/// Image files become `<file without .tar>.spk`. Other sources are named
/// after the app title and version in the definition, falling back to the
/// image or directory name.
pub fn default_output_path(source: &ImageSource, definition: &PackageDefinition) -> PathBuf {
    if let ImageSource::File(path) = source {
        let path = path.to_string_lossy();
        let stem = path.strip_suffix(".tar").unwrap_or(&path);
        return PathBuf::from(format!("{stem}.{PACKAGE_EXTENSION}"));
    }

    let name = match (definition.app_title(), definition.app_version()) {
        (Some(title), Some(version)) => format!("{}-{}", slug(title), slug(version)),
        (Some(title), None) => slug(title),
        _ => match source {
            ImageSource::Engine { image, .. } => slug(image),
            ImageSource::Directory(path) => path
                .canonicalize()
                .ok()
                .and_then(|path| path.file_name().map(|name| slug(&name.to_string_lossy())))
                .unwrap_or_default(),
            ImageSource::File(_) => String::new(),
        },
    };
    let name = if name.is_empty() { "app".to_string() } else { name };
    PathBuf::from(format!("{name}.{PACKAGE_EXTENSION}"))
}

fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
