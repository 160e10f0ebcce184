// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Where image contents come from: export files, a container engine, or
//! a plain directory.

use std::fmt;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::tree::read_local_tree;
use crate::{DockerImage, Error, Result, Tree};

#[cfg(test)]
#[path = "./source_test.rs"]
mod source_test;

/// Default container engine executable.
pub const DEFAULT_ENGINE: &str = "docker";

/// A container engine CLI (`docker` or anything argument compatible).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEngine {
    program: String,
}

impl Default for ContainerEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE)
    }
}

impl ContainerEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Export an image, returning the raw `save` tar stream.
    pub fn save(&self, image: &str) -> Result<Vec<u8>> {
        tracing::info!(engine = %self.program, image, "exporting image");
        run_capture(&self.program, &["save", image])
    }

    /// Build the image in `context` and return its id.
    pub fn build(&self, context: &Path) -> Result<String> {
        let context = context.to_string_lossy();
        tracing::info!(engine = %self.program, context = %context, "building image");
        let stdout = run_capture(&self.program, &["build", "-q", &context])?;
        String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(str::to_string)
            .ok_or_else(|| Error::Subprocess {
                command: format!("{} build -q {context}", self.program),
                status: "exit status: 0".to_string(),
                stderr: "could not determine the id of the built image".to_string(),
            })
    }
}

/// Run a command to completion, returning its stdout.
///
/// A non-zero exit is reported together with whatever the command
/// wrote to stderr.
pub fn run_capture(program: &str, args: &[&str]) -> Result<Vec<u8>> {
    let command_line = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|err| Error::Subprocess {
            command: command_line.clone(),
            status: "failed to start".to_string(),
            stderr: err.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::Subprocess {
            command: command_line,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    tracing::debug!(command = %command_line, bytes = output.stdout.len(), "command finished");
    Ok(output.stdout)
}

/// The input to a packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A file produced by `docker save`.
    File(PathBuf),
    /// An image known to a running container engine.
    Engine {
        engine: ContainerEngine,
        image: String,
    },
    /// A directory used verbatim as the package root.
    Directory(PathBuf),
}

impl ImageSource {
    /// Produce the flattened file tree for this source.
    pub fn load_tree(&self) -> Result<Tree> {
        match self {
            Self::File(path) => {
                let file = std::fs::File::open(path).map_err(|error| Error::ReadFailed {
                    path: path.clone(),
                    error,
                })?;
                DockerImage::read(BufReader::new(file))?.to_tree()
            }
            Self::Engine { engine, image } => {
                let export = engine.save(image)?;
                DockerImage::read(export.as_slice())?.to_tree()
            }
            Self::Directory(path) => read_local_tree(path),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "image file {}", path.display()),
            Self::Engine { engine, image } => write!(f, "{} image {image}", engine.program),
            Self::Directory(path) => write!(f, "directory {}", path.display()),
        }
    }
}
