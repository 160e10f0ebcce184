// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::KeyRecord;

fn some_app_id() -> String {
    KeyRecord::from_seed(&[3u8; 32]).unwrap().app_id()
}

#[rstest]
fn test_parse_minimal() {
    let yaml = format!("api: spk/v0\nid: {}\n", some_app_id());

    let def = PackageDefinition::from_yaml(yaml).expect("Should parse minimal definition");

    assert_eq!(def.api, ApiVersion::V0);
    assert!(def.manifest.is_empty());
    assert!(def.bridge_config.is_empty());
    assert!(def.app_title().is_none());
}

#[rstest]
fn test_parse_full() {
    let yaml = format!(
        r#"
api: spk/v0
id: {}
manifest:
  app_title:
    default_text: Hello Flask
  app_marketing_version: "1.2.3"
  app_version: 4
bridge_config:
  view_info:
    permissions: []
"#,
        some_app_id()
    );

    let def = PackageDefinition::from_yaml(yaml).expect("Should parse full definition");

    assert_eq!(def.app_title(), Some("Hello Flask"));
    assert_eq!(def.app_version(), Some("1.2.3"));
    assert_eq!(def.bridge_config.len(), 1);
    assert_eq!(def.public_key().unwrap().len(), 32);
}

#[rstest]
fn test_embedded_bytes_are_yaml() {
    let yaml = format!(
        "api: spk/v0\nid: {}\nmanifest:\n  app_title: Demo\n",
        some_app_id()
    );
    let def = PackageDefinition::from_yaml(yaml).unwrap();

    let bytes = def.manifest_bytes().unwrap();
    let reparsed: Mapping = serde_yaml::from_slice(&bytes).unwrap();

    assert_eq!(reparsed, def.manifest);
}

#[rstest]
fn test_missing_id() {
    let result = PackageDefinition::from_yaml("api: spk/v0\n");
    assert!(matches!(result, Err(Error::InvalidPackageDefinition { .. })));
}

#[rstest]
fn test_unknown_api() {
    let yaml = format!("api: spk/v9\nid: {}\n", some_app_id());
    let result = PackageDefinition::from_yaml(yaml);
    assert!(matches!(result, Err(Error::InvalidPackageDefinition { .. })));
}

#[rstest]
fn test_bad_app_id() {
    let def = PackageDefinition::from_yaml("api: spk/v0\nid: not-base32!\n").unwrap();
    assert!(matches!(def.public_key(), Err(Error::InvalidAppId(_))));
}

#[rstest]
fn test_template_round_trips() {
    let id = some_app_id();
    let def = PackageDefinition::from_yaml(PackageDefinition::template(&id))
        .expect("Template should parse");

    assert_eq!(def.id, id);
    assert_eq!(def.app_title(), Some("Example App"));
    assert_eq!(def.app_version(), Some("0.0.0"));
}

#[rstest]
fn test_load_sets_source_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(crate::PKGDEF_FILENAME);
    std::fs::write(&path, PackageDefinition::template(&some_app_id())).unwrap();

    let def = PackageDefinition::load(&path).unwrap();

    assert_eq!(def.source_path, Some(path));
}
