//! Artifact loading: reads the module bytes from the install directory.
//!
//! The loader never parses the bytes; structural validation happens when the
//! controller compiles them.

use crate::error::HarnessError;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Immutable bytes of a compiled module, read in full before instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryModule {
    bytes: Vec<u8>,
}

impl BinaryModule {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Directory containing the running executable.
pub fn install_dir() -> Result<PathBuf, HarnessError> {
    let exe = std::env::current_exe().map_err(|source| HarnessError::ArtifactNotFound {
        path: PathBuf::from("<current executable>"),
        source,
    })?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| HarnessError::ArtifactNotFound {
            path: exe.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "executable has no parent directory"),
        })
}

/// Reads one artifact from a fixed path.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    path: PathBuf,
}

impl ArtifactLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loader for `file_name` inside the executable's directory, independent
    /// of the working directory.
    pub fn beside_executable(file_name: &str) -> Result<Self, HarnessError> {
        Ok(Self::new(install_dir()?.join(file_name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<BinaryModule, HarnessError> {
        debug!(path = %self.path.display(), "Opening module artifact");

        let mut file = File::open(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                HarnessError::ArtifactNotFound {
                    path: self.path.clone(),
                    source,
                }
            } else {
                HarnessError::ArtifactReadError {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|source| HarnessError::ArtifactReadError {
                path: self.path.clone(),
                source,
            })?;

        info!(path = %self.path.display(), size_bytes = bytes.len(), "Module artifact loaded");
        Ok(BinaryModule::from_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    #[test]
    fn load_returns_exact_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated.wasm");
        std::fs::write(&path, b"\0asm\x01\0\0\0").unwrap();

        let module = ArtifactLoader::new(&path).load().unwrap();
        assert_eq!(module.as_bytes(), b"\0asm\x01\0\0\0");
        assert_eq!(module.len(), 8);
    }

    #[test]
    fn missing_file_is_artifact_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactLoader::new(dir.path().join("generated.wasm"))
            .load()
            .unwrap_err();
        assert!(matches!(err, HarnessError::ArtifactNotFound { .. }));
        assert_eq!(err.stage(), Stage::Load);
    }

    #[test]
    fn directory_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactLoader::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, HarnessError::ArtifactReadError { .. }));
    }

    #[test]
    fn empty_file_loads_as_empty_module() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated.wasm");
        std::fs::write(&path, b"").unwrap();
        assert!(ArtifactLoader::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn beside_executable_resolves_against_install_dir() {
        let loader = ArtifactLoader::beside_executable("generated.wasm").unwrap();
        assert_eq!(loader.path().parent().unwrap(), install_dir().unwrap());
        assert!(loader.path().ends_with("generated.wasm"));
    }
}
