//! Mock system implementation for testing

#![expect(clippy::module_name_repetitions)]

use super::System;
use std::collections::HashMap;
use std::env::VarError;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// In-memory implementation of System trait for testing
///
/// `MockSystem` provides an in-memory filesystem and environment,
/// perfect for fast, isolated unit tests without side effects.
///
/// # Example
/// ```
/// use reposync::system::{mock::MockSystem, System};
/// use std::path::Path;
///
/// let system = MockSystem::new()
///     .with_env("GITHUB_ORG", "acme").unwrap()
///     .with_file("/work/sync.yaml", b"id: demo").unwrap();
///
/// assert_eq!(system.env_var("GITHUB_ORG").unwrap(), "acme");
/// assert!(system.exists(Path::new("/work/sync.yaml")));
/// ```
#[derive(Clone)]
pub struct MockSystem {
    state: Arc<RwLock<MockSystemState>>,
}

struct MockSystemState {
    env_vars: HashMap<String, String>,
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MockSystem {
    /// Create a new `MockSystem` with default state
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockSystemState {
                env_vars: HashMap::new(),
                files: HashMap::new(),
            })),
        }
    }

    /// Set an environment variable (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The state lock is poisoned
    #[inline]
    pub fn with_env(self, key: &str, value: &str) -> io::Result<Self> {
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;
        state.env_vars.insert(key.to_owned(), value.to_owned());
        drop(state);
        Ok(self)
    }

    /// Add a file with contents (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The state lock is poisoned
    #[inline]
    pub fn with_file<P: AsRef<Path>>(self, path: P, contents: &[u8]) -> io::Result<Self> {
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;
        state
            .files
            .insert(path.as_ref().to_path_buf(), contents.to_vec());
        drop(state);
        Ok(self)
    }
}

impl Default for MockSystem {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl System for MockSystem {
    #[inline]
    #[expect(clippy::map_err_ignore, reason = "This is for VarError")]
    fn env_var(&self, key: &str) -> Result<String, VarError> {
        let state = self.state.read().map_err(|_| VarError::NotPresent)?;
        state.env_vars.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[inline]
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let state = self
            .state
            .read()
            .map_err(|e| io::Error::other(e.to_string()))?;
        let bytes = state.files.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )
        })?;
        let result = bytes.clone();
        drop(state);
        String::from_utf8(result)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {e}")))
    }

    #[inline]
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path)
    }

    #[inline]
    fn is_file(&self, path: &Path) -> bool {
        self.state
            .read()
            .is_ok_and(|state| state.files.contains_key(path))
    }
}
