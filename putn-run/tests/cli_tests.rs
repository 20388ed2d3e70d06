//! Process-level tests: the built binary is copied into a temporary install
//! directory together with a `generated.wasm`, then run from elsewhere.

use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// errno for "text file busy".
const ETXTBSY: i32 = 26;

fn install(artifact: Option<Vec<u8>>) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("putn-run");
    std::fs::copy(env!("CARGO_BIN_EXE_putn-run"), &exe).unwrap();
    if let Some(bytes) = artifact {
        std::fs::write(dir.path().join("generated.wasm"), bytes).unwrap();
    }
    (dir, exe)
}

/// Runs from an unrelated working directory so the artifact can only be
/// found through the executable's location.
fn run(exe: &Path) -> Output {
    let elsewhere = tempfile::tempdir().unwrap();
    // A parallel test's fork may still hold the freshly copied file open.
    for _ in 0..50 {
        match Command::new(exe).current_dir(elsewhere.path()).output() {
            Err(e) if e.raw_os_error() == Some(ETXTBSY) => {
                std::thread::sleep(std::time::Duration::from_millis(20));
            }
            result => return result.unwrap(),
        }
    }
    panic!("{} stayed busy", exe.display());
}

fn wasm(wat: &str) -> Vec<u8> {
    wat::parse_str(wat).unwrap()
}

#[test]
fn prints_one_line_per_call_and_exits_zero() {
    let (_dir, exe) = install(Some(wasm(
        r#"(module
             (import "env" "js_putn" (func $putn (param i32)))
             (export "exported_main" (func $main))
             (func $main (result i32)
               i32.const 1
               call $putn
               i32.const -20
               call $putn
               i32.const 300
               call $putn
               i32.const 0))"#,
    )));

    let out = run(&exe);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(String::from_utf8(out.stdout).unwrap(), "1\n-20\n300\n");
}

#[test]
fn missing_artifact_exits_with_load_code() {
    let (_dir, exe) = install(None);
    let out = run(&exe);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("artifact not found"), "{stderr}");
}

#[test]
fn unresolved_import_exits_with_link_code() {
    let (_dir, exe) = install(Some(wasm(
        r#"(module
             (import "env" "js_putc" (func (param i32)))
             (func (export "exported_main")))"#,
    )));
    let out = run(&exe);
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("env::js_putc"), "{stderr}");
}

#[test]
fn missing_entry_point_exits_with_resolve_code() {
    let (_dir, exe) = install(Some(wasm(r#"(module (func (export "start")))"#)));
    let out = run(&exe);
    assert_eq!(out.status.code(), Some(4));
    assert!(out.stdout.is_empty());
}

#[test]
fn trap_keeps_earlier_output_and_exits_with_invoke_code() {
    let (_dir, exe) = install(Some(wasm(
        r#"(module
             (import "env" "js_putn" (func $putn (param i32)))
             (func (export "exported_main")
               i32.const 11
               call $putn
               unreachable))"#,
    )));
    let out = run(&exe);
    assert_eq!(out.status.code(), Some(5));
    assert_eq!(String::from_utf8(out.stdout).unwrap(), "11\n");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unreachable"), "{stderr}");
}
