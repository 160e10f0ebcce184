// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `docker-spk verify` command.

use std::io::BufReader;
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::{Result, WrapErr};

/// Check a package's signature and contents
#[derive(Debug, Args)]
pub struct CmdVerify {
    /// Package file to check
    file: PathBuf,

    /// List the top level entries of the package
    #[clap(short, long)]
    list: bool,
}

impl CmdVerify {
    pub fn run(&mut self) -> Result<i32> {
        let file = std::fs::File::open(&self.file)
            .map_err(|e| miette::miette!("Failed to open {}: {e}", self.file.display()))?;

        let package = docker_spk::read_package(BufReader::new(file))
            .wrap_err_with(|| format!("Failed to read {}", self.file.display()))?;
        let tree = package
            .verify()
            .wrap_err_with(|| format!("{} failed verification", self.file.display()))?;

        println!("{} {}", "✓ Signature valid:".green(), self.file.display());
        println!("  App id:  {}", package.app_id());
        println!("  Entries: {}", tree.count_nodes());

        if self.list {
            for (name, node) in tree.iter() {
                let marker = if node.is_dir() { "/" } else { "" };
                println!("  - {}{}", name.cyan(), marker);
            }
        }
        Ok(0)
    }
}
