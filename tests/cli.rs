// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn mandeltiles() -> Command {
    Command::cargo_bin("mandeltiles").unwrap()
}

#[test]
fn renders_a_small_view() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("home.png");
    mandeltiles()
        .args(&["--size", "64x64", "--divisor", "4", "--iterations", "32", "--workers", "2"])
        .arg("--output")
        .arg(&out)
        .assert()
        .success();
    let written = image::open(&out).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (64, 64));
}

#[test]
fn renders_after_panning() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("panned.png");
    mandeltiles()
        .args(&["--size", "64x64", "--divisor", "4", "--iterations", "32"])
        .args(&["--leftlower", "-1,-1", "--rightupper", "0,0"])
        .args(&["--pan", "16,0", "--pan=-8,-8"])
        .arg("--output")
        .arg(&out)
        .assert()
        .success();
    assert!(out.exists());
}

#[test]
fn zooms_into_a_selection_then_pans() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("selected.png");
    mandeltiles()
        .args(&["--size", "64x64", "--divisor", "4", "--iterations", "32"])
        .args(&["--zoom", "16,16,48,40", "--pan", "4,4"])
        .arg("--output")
        .arg(&out)
        .assert()
        .success();
    let written = image::open(&out).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (64, 64));
}

#[test]
fn rejects_a_malformed_selection() {
    let dir = tempdir().unwrap();
    mandeltiles()
        .args(&["--zoom", "1,2,3", "--output"])
        .arg(dir.path().join("never.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse zoom selection"));
}

#[test]
fn rejects_an_out_of_range_divisor() {
    let dir = tempdir().unwrap();
    mandeltiles()
        .args(&["--divisor", "0", "--output"])
        .arg(dir.path().join("never.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Tile divisor must be between 1 and 64"));
}

#[test]
fn reports_an_empty_region() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("never.png");
    mandeltiles()
        .args(&["--size", "32x32", "--leftlower", "0,0", "--rightupper", "0,0"])
        .arg("--output")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Render failure:"));
    assert!(!out.exists());
}

#[test]
fn output_is_required() {
    mandeltiles().assert().failure();
}
