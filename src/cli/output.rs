//! Rendering of command results to stdout text

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::str::FromStr;

/// Output format for printed documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// YAML document
    #[default]
    Yaml,
    /// Pretty-printed JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {s}. Use 'yaml' or 'json'")),
        }
    }
}

/// Serialize `value` in the requested format
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[inline]
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to serialize YAML"),
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to serialize JSON")
        }
    }
}
