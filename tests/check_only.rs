//! Check-only mode: full report, zero writes, clean exit.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

fn gup() -> Command {
    Command::cargo_bin("gup").expect("binary builds")
}

#[test]
fn check_only_reports_without_writing() {
    let generated = assert_fs::TempDir::new().unwrap();
    let target = assert_fs::TempDir::new().unwrap();

    generated
        .child("util.ts")
        .write_str("export function add() {}\n")
        .unwrap();

    gup()
        .args(["integrate", "--check", "--no-color", "--target"])
        .arg(target.path())
        .arg(generated.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("# Integration Report"))
        .stdout(predicate::str::contains("No files were processed."));

    // Zero disk writes under the target root: no merged file, no report.
    assert_eq!(std::fs::read_dir(target.path()).unwrap().count(), 0);
}

#[test]
fn check_only_still_reports_conflicts() {
    let generated = assert_fs::TempDir::new().unwrap();
    let target = assert_fs::TempDir::new().unwrap();

    generated
        .child("util.ts")
        .write_str("export function add() { return 2; }\n")
        .unwrap();
    target
        .child("util.ts")
        .write_str("export function add() { return 1; }\n")
        .unwrap();

    gup()
        .args(["integrate", "--check", "--no-color", "--target"])
        .arg(target.path())
        .arg(generated.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("function 'add'"));

    // The existing file is untouched and no report file appears.
    target
        .child("util.ts")
        .assert("export function add() { return 1; }\n");
    assert!(!target.path().join("INTEGRATION_REPORT.md").exists());
}

#[test]
fn global_dry_run_behaves_like_check() {
    let generated = assert_fs::TempDir::new().unwrap();
    let target = assert_fs::TempDir::new().unwrap();

    generated
        .child("util.ts")
        .write_str("export function add() {}\n")
        .unwrap();

    gup()
        .args(["--dry-run", "integrate", "--no-color", "--target"])
        .arg(target.path())
        .arg(generated.path())
        .assert()
        .success();

    assert_eq!(std::fs::read_dir(target.path()).unwrap().count(), 0);
}
