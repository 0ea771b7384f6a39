//! System abstraction for environment and filesystem operations
//!
//! This module provides a unified trait for all external system interactions
//! the resolver needs, allowing for easy testing with mock implementations.

use std::env::VarError;
use std::io;
use std::path::Path;

pub mod mock;
pub mod real;

pub use mock::MockSystem;
pub use real::RealSystem;

/// Unified trait for system operations (environment + filesystem)
///
/// Environment interpolation and config loading read through this trait so
/// that a whole resolution run can be replayed against in-memory state.
///
/// # Implementations
/// - `RealSystem`: Production implementation using `std::env` and `std::fs`
/// - `MockSystem`: Test implementation using in-memory storage
pub trait System: Send + Sync {
    // ==================== Environment Operations ====================

    /// Get an environment variable
    fn env_var(&self, key: &str) -> Result<String, VarError>;

    // ==================== Filesystem Operations ====================

    /// Read entire file contents as a string
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path points to a file
    fn is_file(&self, path: &Path) -> bool;
}
