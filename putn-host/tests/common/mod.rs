//! Shared test helpers for pipeline tests.

#![allow(dead_code)]

use putn_host::{
    ArtifactLoader, Completion, HarnessConfig, HarnessError, HostImports, RecordingSink,
};
use std::sync::Arc;
use tempfile::TempDir;

/// An install directory holding `generated.wasm` built from WAT text.
pub struct Installed {
    pub dir: TempDir,
    pub loader: ArtifactLoader,
}

pub fn install_wat(wat: &str) -> Installed {
    install_bytes(&wat::parse_str(wat).expect("bad test WAT"))
}

pub fn install_bytes(bytes: &[u8]) -> Installed {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(putn_host::ARTIFACT_FILE_NAME);
    std::fs::write(&path, bytes).unwrap();
    Installed {
        loader: ArtifactLoader::new(path),
        dir,
    }
}

/// Runs the full pipeline with a recording sink; returns the outcome and
/// everything the module printed.
pub fn run_recorded(installed: &Installed) -> (Result<Completion, HarnessError>, Vec<i32>) {
    let sink = Arc::new(RecordingSink::new());
    let result = putn_host::run(
        &installed.loader,
        HarnessConfig::default(),
        HostImports::new(sink.clone()),
    );
    (result, sink.values())
}

/// A module shaped like the compiler output: `$putn` import, `exported_main`
/// returning i32, body supplied by the caller.
pub fn generated_module(body: &str) -> String {
    format!(
        r#"(module
             (import "env" "js_putn" (func $putn (param i32)))
             (export "exported_main" (func $main))
             (func $main (result i32)
               {body}
               i32.const 0))"#
    )
}
