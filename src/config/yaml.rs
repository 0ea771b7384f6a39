//! YAML configuration loading and parsing

use crate::config::RawConfig;
use crate::error::SyncError;
use crate::system::System;
use anyhow::{Context as _, Result};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Load and parse YAML configuration from file
pub fn load_config(system: &dyn System, path: &str) -> Result<RawConfig> {
    let path_obj = Path::new(path);

    if !system.exists(path_obj) {
        return Err(SyncError::configuration(format!(
            "Configuration file not found: {path}\n\
            Create a reposync.yaml file or specify a different path with --config"
        ))
        .into());
    }

    let content = system
        .read_to_string(path_obj)
        .with_context(|| format!("Failed to read configuration file: {path}"))?;

    let config = parse_config(&content)
        .with_context(|| format!("Invalid configuration in file: {path}"))?;

    debug!(
        "Loaded configuration '{}' with {} files and {} repositories",
        config.id,
        config.files.len(),
        config.repos.len()
    );

    Ok(config)
}

/// Load an arbitrary JSON or YAML document as a JSON value
pub fn load_document(system: &dyn System, path: &str) -> Result<Value> {
    let path_obj = Path::new(path);
    if !system.is_file(path_obj) {
        return Err(SyncError::filesystem(format!("Document not found: {path}")).into());
    }

    let content = system
        .read_to_string(path_obj)
        .with_context(|| format!("Failed to read document: {path}"))?;

    serde_yaml::from_str(&content).map_err(|e| {
        SyncError::configuration(format!("Failed to parse document {path}: {e}")).into()
    })
}

/// Parse, schema-check and validate configuration text
pub fn parse_config(content: &str) -> Result<RawConfig> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| {
        // Extract line and column information from serde_yaml error
        if let Some(location) = e.location() {
            SyncError::configuration(format!(
                "Failed to parse YAML at line {}, column {}: {}",
                location.line(),
                location.column(),
                e
            ))
        } else {
            SyncError::configuration(format!("Failed to parse YAML: {e}"))
        }
    })?;

    crate::config::schema::validate_against_schema(&value)
        .map_err(|e| SyncError::configuration(e.to_string()))?;

    let config: RawConfig = serde_json::from_value(value)
        .map_err(|e| SyncError::configuration(format!("Unexpected configuration shape: {e}")))?;

    crate::config::validation::validate_config(&config)
        .map_err(|e| SyncError::configuration(format!("Configuration validation failed: {e}")))?;

    Ok(config)
}
