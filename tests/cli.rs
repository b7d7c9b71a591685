use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn murk() -> Command {
    Command::cargo_bin("murk").unwrap()
}

#[test]
fn test_run_prints_program_output() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("hello.mrk");
    fs::write(&script, "import \"IO\"\nvar who = \"world\"\nIO.printf(\"hello {}\", who)").unwrap();

    murk()
        .arg("run")
        .arg(&script)
        .assert()
        .success()
        .stdout("hello world\n");
}

#[test]
fn test_file_shorthand() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("short.mrk");
    fs::write(&script, "import \"IO\"\nIO.print(1, 2)").unwrap();

    murk().arg(&script).assert().success().stdout("1 2\n");
}

#[test]
fn test_errors_exit_with_failure() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("bad.mrk");
    fs::write(&script, "var x = 1\nreturn x").unwrap();

    murk()
        .arg("run")
        .arg(&script)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[line 2:1] Error: cannot return outside a function"))
        .stderr(predicate::str::contains("return x"));
}

#[test]
fn test_base_dir_overrides_import_root() {
    let dir = TempDir::new().unwrap();
    let libs = dir.path().join("libs");
    fs::create_dir(&libs).unwrap();
    fs::write(libs.join("lib.mrk"), "export function answer() { return 42 }").unwrap();

    let script = dir.path().join("main.mrk");
    fs::write(
        &script,
        "import \"IO\"\nimport \"lib.mrk\"\nvar a = answer()\nIO.print(a)",
    )
    .unwrap();

    murk()
        .arg("run")
        .arg(&script)
        .arg("--base-dir")
        .arg(&libs)
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn test_missing_file() {
    murk()
        .arg("run")
        .arg("does-not-exist.mrk")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read file"));
}
