//! Fixed harness settings.
//!
//! Nothing here is read from files, flags or the environment; the defaults
//! are the installed behavior and other values exist for embedding and tests.

use crate::limits::ResourceLimits;

/// File name of the module artifact inside the install directory.
pub const ARTIFACT_FILE_NAME: &str = "generated.wasm";

/// Export invoked once after instantiation.
pub const ENTRY_POINT: &str = "exported_main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub artifact_file_name: String,
    pub entry_point: String,
    pub limits: ResourceLimits,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            artifact_file_name: ARTIFACT_FILE_NAME.to_string(),
            entry_point: ENTRY_POINT.to_string(),
            limits: ResourceLimits::default(),
        }
    }
}
