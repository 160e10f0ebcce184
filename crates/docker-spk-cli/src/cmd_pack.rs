// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `docker-spk pack` command.

use std::path::PathBuf;

use clap::{ArgGroup, Args};
use colored::Colorize;
use docker_spk::{app_id, ImageSource, Keyring, PackageDefinition};
use miette::{Result, WrapErr};

/// Options shared by every command that produces a package.
#[derive(Debug, Clone, Args)]
pub struct PackFlags {
    /// Package definition file
    #[clap(long = "pkg-def", env = "SPK_PKG_DEF", default_value = docker_spk::PKGDEF_FILENAME)]
    pub pkg_def: PathBuf,

    /// Output file (default inferred from the input or package definition)
    #[clap(short, long)]
    pub out: Option<PathBuf>,

    /// Sign with this app key instead of the one in the package definition
    #[clap(long)]
    pub appkey: Option<String>,

    #[clap(flatten)]
    pub keyring: crate::KeyringFlags,

    #[clap(flatten)]
    pub engine: crate::EngineFlags,
}

/// Package an image export, engine image or directory
#[derive(Debug, Args)]
#[clap(group(
    ArgGroup::new("source")
        .required(true)
        .args(["image_file", "image", "root_dir"]),
))]
pub struct CmdPack {
    /// File containing the image to convert (output of `docker save`)
    #[clap(long = "image-file", alias = "imagefile")]
    image_file: Option<PathBuf>,

    /// Name or id of an image known to the container engine
    #[clap(long)]
    image: Option<String>,

    /// Directory to package as-is
    #[clap(long = "root-dir")]
    root_dir: Option<PathBuf>,

    #[clap(flatten)]
    flags: PackFlags,
}

impl CmdPack {
    pub fn run(&mut self) -> Result<i32> {
        let source = self.source()?;
        pack(&self.flags, source)
    }

    pub(crate) fn source(&self) -> Result<ImageSource> {
        if let Some(path) = &self.image_file {
            return Ok(ImageSource::File(path.clone()));
        }
        if let Some(image) = &self.image {
            return Ok(ImageSource::Engine {
                engine: self.flags.engine.engine(),
                image: image.clone(),
            });
        }
        if let Some(path) = &self.root_dir {
            return Ok(ImageSource::Directory(path.clone()));
        }
        Err(miette::miette!(
            "One of --image-file, --image or --root-dir is required"
        ))
    }
}

/// Run the full pipeline for `source` and write the package.
///
/// The output file is only created once the package has been signed.
pub fn pack(flags: &PackFlags, source: ImageSource) -> Result<i32> {
    let definition = PackageDefinition::load(&flags.pkg_def).wrap_err_with(|| {
        format!(
            "Failed to read package definition {}",
            flags.pkg_def.display()
        )
    })?;

    let id = flags.appkey.as_deref().unwrap_or(&definition.id);
    let public_key = app_id::decode(id).wrap_err("Failed to parse the app id")?;

    let keyring_path = flags.keyring.path()?;
    let keyring = Keyring::load(&keyring_path)
        .wrap_err_with(|| format!("Failed to load keyring {}", keyring_path.display()))?;
    let key = keyring
        .get_key(&public_key)
        .wrap_err("Failed to fetch the app private key")?;

    let tree = source
        .load_tree()
        .wrap_err_with(|| format!("Failed to read {source}"))?;
    let package =
        docker_spk::build_package(tree, &definition, key).wrap_err("Failed to build the package")?;

    let out = flags
        .out
        .clone()
        .unwrap_or_else(|| docker_spk::default_output_path(&source, &definition));
    docker_spk::write_package_file(&out, &package)
        .wrap_err_with(|| format!("Failed to write {}", out.display()))?;

    println!(
        "{} {} (app id {})",
        "Wrote".bold(),
        out.display().to_string().green(),
        package.app_id()
    );
    Ok(0)
}
