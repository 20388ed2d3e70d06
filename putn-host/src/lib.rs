//! Wasmtime-based host for a single precompiled module.
//!
//! Loads `generated.wasm` from the install directory, links the one host
//! import the module may call (`env::js_putn`), instantiates it and runs its
//! `exported_main` export exactly once.
//!
//! The pipeline is a chain of owned states, each produced only by the
//! successful completion of the previous step:
//! [`BinaryModule`] → [`Instantiated`] → [`EntryResolved`] → [`Completion`].

mod artifact;
mod config;
mod controller;
mod error;
mod imports;
mod limits;

pub use artifact::{ArtifactLoader, BinaryModule, install_dir};
pub use config::{ARTIFACT_FILE_NAME, ENTRY_POINT, HarnessConfig};
pub use controller::{Completion, Controller, EntryResolved, Instantiated, run, run_installed};
pub use error::{HarnessError, Stage};
pub use imports::{
    HostImportSignature, HostImports, NumberSink, PUTN_IMPORT, RecordingSink, StdoutSink,
    ValueKind,
};
pub use limits::{ResourceLimits, TrackingLimiter};
