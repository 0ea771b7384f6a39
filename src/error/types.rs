//! Custom error types with exit codes

use thiserror::Error;

/// Main error type for reposync operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyncError {
    /// Configuration Error - missing or invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Base and overlay content of one file disagree on their kind
    #[error(
        "Content type mismatch for file '{file}' in repo '{repo}': base is {base}, overlay is {overlay}"
    )]
    ContentTypeMismatch {
        file: String,
        repo: String,
        base: String,
        overlay: String,
    },

    /// A required environment variable is unset
    #[error("Missing environment variable '{variable}' in file '{file}' for repo '{repo}': {detail}")]
    MissingEnvironmentVariable {
        variable: String,
        file: String,
        repo: String,
        detail: String,
    },

    /// The reserved `inherit` key was used as an entity name
    #[error("Reserved key 'inherit' used as a {kind} name in repo '{repo}'")]
    ReservedKeyCollision { kind: String, repo: String },

    /// A repo opted out of an entity that the root never defines
    #[error("Repo '{repo}' opts out of {kind} '{name}', which has no root definition")]
    InvalidOptOut {
        kind: String,
        name: String,
        repo: String,
    },

    /// Two entities would end up owning the same name
    #[error("Rename collision for '{entity}' -> '{target}': {reason}")]
    RenameCollision {
        entity: String,
        target: String,
        reason: String,
    },

    /// Filesystem Error - file operation failed
    #[error("Filesystem error: {message}")]
    Filesystem { message: String },
}

impl SyncError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Configuration { .. } => 1,
            Self::ContentTypeMismatch { .. } => 2,
            Self::MissingEnvironmentVariable { .. } => 3,
            Self::ReservedKeyCollision { .. } => 4,
            Self::InvalidOptOut { .. } => 5,
            Self::RenameCollision { .. } => 6,
            Self::Filesystem { .. } => 7,
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a filesystem error
    #[inline]
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }

    /// Create a reserved key error
    #[inline]
    pub fn reserved_key<K: Into<String>, R: Into<String>>(kind: K, repo: R) -> Self {
        Self::ReservedKeyCollision {
            kind: kind.into(),
            repo: repo.into(),
        }
    }

    /// Create an opt-out error
    #[inline]
    pub fn invalid_opt_out<K, N, R>(kind: K, name: N, repo: R) -> Self
    where
        K: Into<String>,
        N: Into<String>,
        R: Into<String>,
    {
        Self::InvalidOptOut {
            kind: kind.into(),
            name: name.into(),
            repo: repo.into(),
        }
    }

    /// Create a rename collision error
    #[inline]
    pub fn rename_collision<E, T, R>(entity: E, target: T, reason: R) -> Self
    where
        E: Into<String>,
        T: Into<String>,
        R: Into<String>,
    {
        Self::RenameCollision {
            entity: entity.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error only invalidates one repository's settings batch
    #[must_use]
    #[inline]
    pub const fn is_repo_scoped(&self) -> bool {
        matches!(*self, Self::RenameCollision { .. })
    }
}
