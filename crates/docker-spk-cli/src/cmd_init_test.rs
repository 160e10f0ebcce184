// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
fn test_create_app_writes_both_files() {
    let tmp = TempDir::new().unwrap();
    let pkg_def = tmp.path().join(docker_spk::PKGDEF_FILENAME);
    let keyring = tmp.path().join("keyring");

    let key = create_app(&pkg_def, &keyring).expect("Should create app");

    let def = PackageDefinition::load(&pkg_def).unwrap();
    assert_eq!(def.id, key.app_id());
    let saved = Keyring::load(&keyring).unwrap();
    assert_eq!(saved.get_key(&key.public_key).unwrap(), &key);
}

#[rstest]
fn test_unwritable_pkg_def_leaves_keyring_untouched() {
    let tmp = TempDir::new().unwrap();
    let pkg_def = tmp.path().join("missing-dir").join(docker_spk::PKGDEF_FILENAME);
    let keyring = tmp.path().join("keyring");

    let result = create_app(&pkg_def, &keyring);

    assert!(result.is_err());
    assert!(!keyring.exists());
}

#[rstest]
fn test_unwritable_keyring_removes_pkg_def() {
    let tmp = TempDir::new().unwrap();
    let pkg_def = tmp.path().join(docker_spk::PKGDEF_FILENAME);
    let keyring = tmp.path().join("missing-dir").join("keyring");

    let result = create_app(&pkg_def, &keyring);

    assert!(result.is_err());
    assert!(!pkg_def.exists());
}

#[rstest]
fn test_existing_pkg_def_is_kept() {
    let tmp = TempDir::new().unwrap();
    let pkg_def = tmp.path().join(docker_spk::PKGDEF_FILENAME);
    std::fs::write(&pkg_def, "api: spk/v0\n").unwrap();
    let keyring = tmp.path().join("keyring");

    assert!(create_app(&pkg_def, &keyring).is_err());
    assert_eq!(std::fs::read_to_string(&pkg_def).unwrap(), "api: spk/v0\n");
    assert!(!keyring.exists());
}
