// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `docker-spk init` command.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use colored::Colorize;
use docker_spk::{KeyRecord, Keyring, PackageDefinition};
use miette::{Result, WrapErr};

/// Generate an app key and a package definition
#[derive(Debug, Args)]
pub struct CmdInit {
    /// Package definition file to create
    #[clap(long = "pkg-def", env = "SPK_PKG_DEF", default_value = docker_spk::PKGDEF_FILENAME)]
    pkg_def: PathBuf,

    #[clap(flatten)]
    keyring: crate::KeyringFlags,
}

impl CmdInit {
    pub fn run(&mut self) -> Result<i32> {
        if self.pkg_def.exists() {
            return Err(miette::miette!(
                "{} already exists, refusing to overwrite it",
                self.pkg_def.display()
            ));
        }
        let keyring_path = self.keyring.path()?;

        let key = create_app(&self.pkg_def, &keyring_path)?;
        let app_id = key.app_id();

        println!("App id: {}", app_id.green());
        println!("Key saved to {}", keyring_path.display());
        println!("Created {}", self.pkg_def.display());
        println!();
        println!("Next steps:");
        println!("  1. Edit {} to describe your app", self.pkg_def.display());
        println!("  2. Run 'docker-spk build' in the directory holding your Dockerfile");

        Ok(0)
    }
}

/// Generate a key, write the package definition naming it, then save the
/// key to the keyring.
///
/// The definition is removed again if the key cannot be saved, so neither
/// file is left referring to something that does not exist.
pub(crate) fn create_app(pkg_def: &Path, keyring_path: &Path) -> Result<KeyRecord> {
    let key = KeyRecord::generate().wrap_err("Failed to generate an app key")?;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(pkg_def)
        .map_err(|e| miette::miette!("Failed to create {}: {e}", pkg_def.display()))?;
    if let Err(e) = file.write_all(PackageDefinition::template(&key.app_id()).as_bytes()) {
        drop(file);
        let _ = std::fs::remove_file(pkg_def);
        return Err(miette::miette!("Failed to write {}: {e}", pkg_def.display()));
    }
    drop(file);

    if let Err(err) = Keyring::append_to_file(keyring_path, &key) {
        let _ = std::fs::remove_file(pkg_def);
        return Err(miette::Report::new(err))
            .wrap_err_with(|| format!("Failed to save key to {}", keyring_path.display()));
    }
    Ok(key)
}

#[cfg(test)]
#[path = "./cmd_init_test.rs"]
mod cmd_init_test;
