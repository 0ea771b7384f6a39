//! Configuration validation logic

use crate::config::{FileEntry, RawConfig, RepoEntry};
use anyhow::{Result, anyhow};
use regex::Regex;

/// Validate a complete configuration
///
/// # Errors
///
/// Returns an error if:
/// - The configuration id is empty
/// - The configuration does not contain at least one repository
/// - A repository URL is invalid
/// - A file name is unsafe or a repository overrides an undefined file
#[inline]
pub fn validate_config(config: &RawConfig) -> Result<()> {
    if config.id.trim().is_empty() {
        return Err(anyhow!("Configuration id cannot be empty"));
    }

    if config.repos.is_empty() {
        return Err(anyhow!("Configuration must contain at least one repository"));
    }

    for name in config.files.keys() {
        validate_file_name(name)?;
    }

    for (index, repo) in config.repos.iter().enumerate() {
        validate_repo_entry(config, repo, index)?;
    }

    Ok(())
}

/// Validate a single repository entry
fn validate_repo_entry(config: &RawConfig, repo: &RepoEntry, index: usize) -> Result<()> {
    let context = format!("Repository #{}", index + 1);

    let urls = repo.git.urls();
    if urls.is_empty() {
        return Err(anyhow!("{context}: 'git' must list at least one URL"));
    }

    for url in urls {
        validate_repository_url(url).map_err(|e| anyhow!("{context}: {e}"))?;
    }

    for (name, entry) in &repo.files {
        if config.files.contains_key(name) {
            continue;
        }
        // Opting out of a file nobody defined is harmless
        if matches!(entry, FileEntry::Toggle(false)) {
            continue;
        }
        return Err(anyhow!(
            "{context}: File '{name}' is not defined in the root 'files' section"
        ));
    }

    Ok(())
}

/// Validate a repository URL format
///
/// # Errors
///
/// Returns an error if:
/// - The repository URL is invalid
#[inline]
pub fn validate_repository_url(url: &str) -> Result<()> {
    if url.starts_with("file:") {
        return Ok(());
    }

    // Patterns for valid Git repository URLs
    let patterns = [
        r"^https?://[^\s/]+/\S+$", // HTTPS: https://github.com/org/repo(.git)
        r"^git@[^\s:]+:\S+$",      // SSH: git@github.com:org/repo.git
        r"^ssh://\S+$",            // SSH URL form
    ];

    for pattern in &patterns {
        let regex = Regex::new(pattern)?;
        if regex.is_match(url) {
            return Ok(());
        }
    }

    Err(anyhow!(
        "Invalid repository URL format: '{url}'\n\
        Supported formats:\n\
        - HTTPS: https://github.com/my_organization/repo.git\n\
        - SSH: git@github.com:my_organization/repo.git\n\
        - Local: file:/path/to/repo or file:///path/to/repo"
    ))
}

/// Validate a managed file name (prevent directory traversal)
///
/// # Errors
///
/// Returns an error if:
/// - The name is empty
/// - The name contains unsafe directory traversal
/// - The name is an absolute path
#[inline]
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("File name cannot be empty"));
    }

    if name.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(anyhow!(
            "File name contains unsafe directory traversal: '{name}'"
        ));
    }

    if name.starts_with('/') {
        return Err(anyhow!(
            "Absolute paths are not allowed: '{name}'. Use paths relative to the repository root."
        ));
    }

    Ok(())
}
