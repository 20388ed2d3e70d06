//! Error types for the host pipeline.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Link,
    Resolve,
    Invoke,
}

impl Stage {
    /// Process exit code reported when this stage fails.
    pub fn exit_code(self) -> u8 {
        match self {
            Stage::Load => 2,
            Stage::Link => 3,
            Stage::Resolve => 4,
            Stage::Invoke => 5,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Link => "link",
            Stage::Resolve => "resolve",
            Stage::Invoke => "invoke",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("artifact not found: {}: {source}", path.display())]
    ArtifactNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read artifact {}: {source}", path.display())]
    ArtifactReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("module failed validation or instantiation: {0}")]
    InstantiationValidationError(String),

    #[error("unresolved import '{module}::{name}': {detail}")]
    ImportResolutionError {
        module: String,
        name: String,
        detail: String,
    },

    #[error("entry point '{0}' is not exported by the module")]
    EntryPointNotFound(String),

    #[error("entry point '{name}' has the wrong shape: expected a function with no parameters, found {found}")]
    EntryPointSignatureMismatch { name: String, found: String },

    #[error("execution trapped in '{entry}': {reason}")]
    ExecutionTrap { entry: String, reason: String },
}

impl HarnessError {
    pub fn stage(&self) -> Stage {
        match self {
            HarnessError::ArtifactNotFound { .. } | HarnessError::ArtifactReadError { .. } => {
                Stage::Load
            }
            HarnessError::InstantiationValidationError(_)
            | HarnessError::ImportResolutionError { .. } => Stage::Link,
            HarnessError::EntryPointNotFound(_)
            | HarnessError::EntryPointSignatureMismatch { .. } => Stage::Resolve,
            HarnessError::ExecutionTrap { .. } => Stage::Invoke,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.stage().exit_code()
    }
}
