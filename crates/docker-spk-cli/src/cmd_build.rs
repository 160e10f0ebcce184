// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `docker-spk build` command.

use std::path::PathBuf;

use clap::Args;
use docker_spk::ImageSource;
use miette::{Result, WrapErr};

use crate::cmd_pack::{pack, PackFlags};

/// Build the image in a directory, then package it
#[derive(Debug, Args)]
pub struct CmdBuild {
    /// Build context holding the Dockerfile
    #[clap(default_value = ".")]
    context: PathBuf,

    #[clap(flatten)]
    flags: PackFlags,
}

impl CmdBuild {
    pub fn run(&mut self) -> Result<i32> {
        let engine = self.flags.engine.engine();
        let image = engine
            .build(&self.context)
            .wrap_err_with(|| format!("Failed to build image from {}", self.context.display()))?;
        println!("Built image {image}");

        pack(&self.flags, ImageSource::Engine { engine, image })
    }
}
