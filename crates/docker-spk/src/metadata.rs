// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Package definition files (`sandstorm-pkgdef.yaml`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::{app_id, Error, Result};

#[cfg(test)]
#[path = "./metadata_test.rs"]
mod metadata_test;

/// Archive path of the embedded manifest.
pub const MANIFEST_ENTRY: &str = "sandstorm-manifest";

/// Archive path of the embedded bridge configuration.
pub const BRIDGE_CONFIG_ENTRY: &str = "sandstorm-http-bridge-config";

/// API version for package definitions.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub enum ApiVersion {
    #[serde(rename = "spk/v0")]
    V0,
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::V0
    }
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ApiVersion,
}

/// What gets packaged alongside the image, and which key signs it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PackageDefinition {
    /// API version identifier.
    pub api: ApiVersion,

    /// App id: the public key that signs the package.
    pub id: String,

    /// App manifest, embedded as-is.
    #[serde(default)]
    pub manifest: Mapping,

    /// HTTP bridge configuration, embedded as-is.
    #[serde(default)]
    pub bridge_config: Mapping,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl PackageDefinition {
    /// Parse a definition from YAML.
    pub fn from_yaml<S: AsRef<str>>(yaml: S) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml.as_ref())
            .map_err(|error| Error::InvalidPackageDefinition { error })?;

        let with_version: ApiVersionMapping = serde_yaml::from_value(value.clone())
            .map_err(|error| Error::InvalidPackageDefinition { error })?;

        match with_version.api {
            ApiVersion::V0 => serde_yaml::from_value(value)
                .map_err(|error| Error::InvalidPackageDefinition { error }),
        }
    }

    /// Load a definition from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|error| Error::ReadFailed {
            path: path.to_path_buf(),
            error,
        })?;

        let mut def = Self::from_yaml(yaml)?;
        def.source_path = Some(path.to_path_buf());
        Ok(def)
    }

    /// The public key named by the app id.
    pub fn public_key(&self) -> Result<Vec<u8>> {
        app_id::decode(&self.id)
    }

    /// Contents of the embedded manifest file.
    pub fn manifest_bytes(&self) -> Result<Vec<u8>> {
        to_yaml_bytes(&self.manifest)
    }

    /// Contents of the embedded bridge configuration file.
    pub fn bridge_config_bytes(&self) -> Result<Vec<u8>> {
        to_yaml_bytes(&self.bridge_config)
    }

    /// Human readable app name, if the manifest declares one.
    pub fn app_title(&self) -> Option<&str> {
        localized_text(self.manifest.get("app_title")?)
    }

    /// Marketing version, if the manifest declares one.
    pub fn app_version(&self) -> Option<&str> {
        localized_text(self.manifest.get("app_marketing_version")?)
    }

    /// A starter definition for a freshly generated app id.
    pub fn template(app_id: &str) -> String {
        format!(
            "# docker-spk package definition\n\
            \n\
            api: spk/v0\n\
            \n\
            # App id; this is the public key the package is signed with.\n\
            # The matching private key lives in your keyring.\n\
            id: {app_id}\n\
            \n\
            # Embedded as /sandstorm-manifest\n\
            manifest:\n\
            \x20 app_title: Example App\n\
            \x20 app_version: 0\n\
            \x20 app_marketing_version: \"0.0.0\"\n\
            \x20 actions:\n\
            \x20   - title: New Instance\n\
            \x20     command:\n\
            \x20       argv: [\"/sandstorm-http-bridge\", \"8000\", \"--\", \"/start.sh\"]\n\
            \n\
            # Embedded as /sandstorm-http-bridge-config\n\
            bridge_config: {{}}\n"
        )
    }
}

/// Plain strings, or a `default_text` inside a localized mapping.
fn localized_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) => Some(text.as_str()),
        Value::Mapping(map) => map.get("default_text").and_then(Value::as_str),
        _ => None,
    }
}

fn to_yaml_bytes(map: &Mapping) -> Result<Vec<u8>> {
    serde_yaml::to_string(map)
        .map(String::into_bytes)
        .map_err(|error| Error::InvalidPackageDefinition { error })
}
