// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! docker-spk - build Sandstorm packages from container images

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_build;
mod cmd_init;
mod cmd_pack;
mod cmd_verify;

use cmd_build::CmdBuild;
use cmd_init::CmdInit;
use cmd_pack::CmdPack;
use cmd_verify::CmdVerify;

#[derive(Parser)]
#[clap(
    name = "docker-spk",
    about = "Build Sandstorm packages from container images",
    version,
    long_about = "Convert the output of `docker save` (or a running engine's image) into a signed .spk"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

#[derive(Parser, Clone, Debug, Default)]
pub struct KeyringFlags {
    /// Keyring holding app signing keys (default: ~/.sandstorm-keyring)
    #[clap(long, env = "SPK_KEYRING")]
    pub keyring: Option<PathBuf>,
}

impl KeyringFlags {
    pub fn path(&self) -> Result<PathBuf> {
        match &self.keyring {
            Some(path) => Ok(path.clone()),
            None => docker_spk::Keyring::default_path().ok_or_else(|| {
                miette::miette!("Cannot locate home directory, pass --keyring explicitly")
            }),
        }
    }
}

#[derive(Parser, Clone, Debug)]
pub struct EngineFlags {
    /// Container engine executable
    #[clap(long, env = "SPK_ENGINE", default_value = docker_spk::source::DEFAULT_ENGINE)]
    pub engine: String,
}

impl EngineFlags {
    pub fn engine(&self) -> docker_spk::ContainerEngine {
        docker_spk::ContainerEngine::new(&self.engine)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate an app key and a package definition
    Init(CmdInit),

    /// Package an image export, engine image or directory
    Pack(CmdPack),

    /// Build the image in a directory, then package it
    Build(CmdBuild),

    /// Check a package's signature and contents
    Verify(CmdVerify),
}

impl Opt {
    fn run(self) -> Result<i32> {
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        match self.cmd {
            Command::Init(mut cmd) => cmd.run(),
            Command::Pack(mut cmd) => cmd.run(),
            Command::Build(mut cmd) => cmd.run(),
            Command::Verify(mut cmd) => cmd.run(),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}

#[cfg(test)]
#[path = "./main_test.rs"]
mod main_test;
