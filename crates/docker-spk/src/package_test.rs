// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::source::ContainerEngine;

#[fixture]
fn key() -> KeyRecord {
    KeyRecord::from_seed(&[7u8; 32]).unwrap()
}

fn definition(key: &KeyRecord, manifest: &str) -> PackageDefinition {
    let yaml = format!("api: spk/v0\nid: {}\nmanifest:\n{manifest}", key.app_id());
    PackageDefinition::from_yaml(yaml).unwrap()
}

fn app_tree() -> Tree {
    let mut srv = Tree::new();
    srv.insert("index.html", Node::file("hello"));
    let mut var = Tree::new();
    var.insert("cache", Node::file("stale"));

    let mut tree = Tree::new();
    tree.insert("srv", Node::Directory(srv));
    tree.insert("var", Node::Directory(var));
    tree.insert("start.sh", Node::executable("#!/bin/sh\n"));
    tree
}

#[rstest]
fn test_build_package_injects_metadata(key: KeyRecord) {
    let def = definition(&key, "  app_title: Demo\n");

    let package = build_package(app_tree(), &def, &key).expect("Should build package");
    let tree = package.verify().expect("Should verify");

    assert!(tree.get("var").is_none());
    assert!(tree.get("srv").is_some());
    assert_eq!(
        tree.get(MANIFEST_ENTRY),
        Some(&Node::file(def.manifest_bytes().unwrap()))
    );
    assert_eq!(
        tree.get(BRIDGE_CONFIG_ENTRY),
        Some(&Node::file(def.bridge_config_bytes().unwrap()))
    );
    assert_eq!(package.app_id(), key.app_id());
}

#[rstest]
fn test_build_package_is_deterministic(key: KeyRecord) {
    let def = definition(&key, "  app_title: Demo\n");

    let first = build_package(app_tree(), &def, &key).unwrap();
    let second = build_package(app_tree(), &def, &key).unwrap();

    assert_eq!(first, second);
}

#[rstest]
fn test_file_round_trip(key: KeyRecord) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("demo.spk");
    let def = definition(&key, "  app_title: Demo\n");
    let package = build_package(app_tree(), &def, &key).unwrap();

    write_package_file(&path, &package).expect("Should write package");

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..MAGIC_NUMBER.len()], &MAGIC_NUMBER);
    let read = read_package(bytes.as_slice()).expect("Should read package");
    assert_eq!(read, package);
    let tree = verify_package(bytes.as_slice()).expect("Should verify package");
    assert_eq!(tree.lookup("srv/index.html"), Some(&Node::file("hello")));
}

#[rstest]
fn test_write_leaves_no_temp_files(key: KeyRecord) {
    let tmp = TempDir::new().unwrap();
    let def = definition(&key, "  app_title: Demo\n");
    let package = build_package(Tree::new(), &def, &key).unwrap();

    write_package_file(&tmp.path().join("out.spk"), &package).unwrap();

    let names: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("out.spk")]);
}

#[rstest]
fn test_write_into_missing_directory(key: KeyRecord) {
    let tmp = TempDir::new().unwrap();
    let def = definition(&key, "  app_title: Demo\n");
    let package = build_package(Tree::new(), &def, &key).unwrap();

    let result = write_package_file(&tmp.path().join("nope/out.spk"), &package);

    assert!(matches!(result, Err(Error::WriteFailed { .. })));
}

#[rstest]
fn test_tampered_archive_fails(key: KeyRecord) {
    let def = definition(&key, "  app_title: Demo\n");
    let mut package = build_package(app_tree(), &def, &key).unwrap();
    let last = package.archive.len() - 1;
    package.archive[last] ^= 0x01;

    let mut bytes = Vec::new();
    package.write_to(&mut bytes).unwrap();

    let result = verify_package(bytes.as_slice());
    assert!(matches!(result, Err(Error::BadSignature(_))));
}

#[rstest]
#[case::empty(&[])]
#[case::short(&[0x8f, 0xc6])]
#[case::wrong_magic(b"not a package at all")]
fn test_read_rejects_non_packages(#[case] bytes: &[u8]) {
    let result = read_package(bytes);
    assert!(matches!(result, Err(Error::InvalidPackage(_))));
}

#[rstest]
fn test_read_rejects_corrupt_stream() {
    let mut bytes = MAGIC_NUMBER.to_vec();
    bytes.extend_from_slice(b"definitely not xz");

    let result = read_package(bytes.as_slice());

    assert!(matches!(result, Err(Error::InvalidPackage(_))));
}

#[rstest]
#[case("hello.tar", "hello.spk")]
#[case("out/image.tar", "out/image.spk")]
#[case("image.img", "image.img.spk")]
fn test_default_output_for_files(#[case] input: &str, #[case] expected: &str) {
    let def = PackageDefinition::default();
    let source = ImageSource::File(PathBuf::from(input));

    assert_eq!(default_output_path(&source, &def), PathBuf::from(expected));
}

#[rstest]
fn test_default_output_from_definition(key: KeyRecord) {
    let def = definition(
        &key,
        "  app_title: Hello Flask\n  app_marketing_version: \"1.2.0\"\n",
    );
    let source = ImageSource::Engine {
        engine: ContainerEngine::default(),
        image: "sha256:abc".to_string(),
    };

    assert_eq!(
        default_output_path(&source, &def),
        PathBuf::from("hello-flask-1.2.0.spk")
    );
}

#[rstest]
fn test_default_output_from_image_name() {
    let source = ImageSource::Engine {
        engine: ContainerEngine::default(),
        image: "example/app:latest".to_string(),
    };

    assert_eq!(
        default_output_path(&source, &PackageDefinition::default()),
        PathBuf::from("example-app-latest.spk")
    );
}
