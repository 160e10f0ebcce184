// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use docker_spk::ImageSource;
use rstest::rstest;

use super::*;

fn parse(args: &[&str]) -> std::result::Result<Opt, clap::Error> {
    Opt::try_parse_from(std::iter::once("docker-spk").chain(args.iter().copied()))
}

#[rstest]
#[case::image_file(&["pack", "--image-file", "app.tar"], ImageSource::File(PathBuf::from("app.tar")))]
#[case::legacy_flag(&["pack", "--imagefile", "app.tar"], ImageSource::File(PathBuf::from("app.tar")))]
#[case::root_dir(&["pack", "--root-dir", "rootfs"], ImageSource::Directory(PathBuf::from("rootfs")))]
fn test_pack_source(#[case] args: &[&str], #[case] expected: ImageSource) {
    let opt = parse(args).expect("Should parse");
    let Command::Pack(cmd) = opt.cmd else {
        panic!("expected pack command");
    };
    assert_eq!(cmd.source().unwrap(), expected);
}

#[rstest]
fn test_pack_engine_source() {
    let opt = parse(&["pack", "--image", "hello:latest", "--engine", "podman"]).unwrap();
    let Command::Pack(cmd) = opt.cmd else {
        panic!("expected pack command");
    };
    match cmd.source().unwrap() {
        ImageSource::Engine { engine, image } => {
            assert_eq!(engine.program(), "podman");
            assert_eq!(image, "hello:latest");
        }
        other => panic!("unexpected source {other:?}"),
    }
}

#[rstest]
#[case::missing(&["pack"])]
#[case::conflicting(&["pack", "--image-file", "a.tar", "--image", "b"])]
#[case::verify_without_file(&["verify"])]
fn test_invalid_invocations(#[case] args: &[&str]) {
    assert!(parse(args).is_err());
}

#[rstest]
fn test_logging_flags_are_global() {
    let opt = parse(&["verify", "-vv", "out.spk"]).unwrap();
    assert_eq!(opt.logging.verbose, 2);
    assert!(!opt.logging.quiet);
}

#[rstest]
fn test_build_defaults_to_current_directory() {
    let opt = parse(&["build", "--appkey", "abc"]).unwrap();
    assert!(matches!(opt.cmd, Command::Build(_)));
}
