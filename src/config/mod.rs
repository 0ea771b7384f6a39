//! Configuration management module
//!
//! Handles YAML configuration parsing, JSON schema validation, semantic
//! validation and environment interpolation.

pub mod env;
pub mod schema;
pub mod validation;
pub mod yaml;

use crate::merge::MergeStrategy;
use crate::system::System;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Root sync configuration as written by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    /// Identifier of this configuration
    pub id: String,

    /// Managed files by name
    #[serde(default)]
    pub files: BTreeMap<String, FileDefinition>,

    /// Target repositories
    pub repos: Vec<RepoEntry>,

    /// Root settings shared by every repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<RawSettings>,

    /// Global default for removing files no longer managed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_orphaned: Option<bool>,

    /// Global pull request options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_options: Option<PrOptions>,

    /// Pull request body template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_template: Option<String>,
}

impl RawConfig {
    /// Load configuration from file
    pub fn load_from_file(system: &dyn System, path: &str) -> anyhow::Result<Self> {
        yaml::load_config(system, path)
    }

    /// Validate configuration semantics
    pub fn validate(&self) -> anyhow::Result<()> {
        validation::validate_config(self)
    }
}

/// File header: one line or several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Header {
    Line(String),
    Lines(Vec<String>),
}

impl Header {
    /// Normalize to a list of lines
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        match *self {
            Self::Line(ref line) => vec![line.clone()],
            Self::Lines(ref lines) => lines.clone(),
        }
    }
}

/// Root definition of one managed file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<MergeStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_only: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_orphaned: Option<bool>,
}

/// Per-repository override of one managed file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,

    /// Ignore the root content entirely
    #[serde(default, rename = "override")]
    pub override_base: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_only: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_orphaned: Option<bool>,
}

/// Repo-level file entry: `false` excludes, `true` inherits, a map overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileEntry {
    Toggle(bool),
    Override(FileOverride),
}

/// One git URL or several sharing the same configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GitUrls {
    One(String),
    Many(Vec<String>),
}

impl GitUrls {
    /// Every URL this entry expands to
    #[must_use]
    pub fn urls(&self) -> Vec<&str> {
        match *self {
            Self::One(ref url) => vec![url.as_str()],
            Self::Many(ref urls) => urls.iter().map(String::as_str).collect(),
        }
    }
}

/// One repository entry in the root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoEntry {
    pub git: GitUrls,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, FileEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<RawSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_options: Option<PrOptions>,
}

/// Settings block, at root or per repository
///
/// Entity collections map a name to a definition object. Per repository a
/// name may instead map to `false` (opt out), and the reserved `inherit`
/// key toggles inheritance of the whole root collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rulesets: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Map<String, Value>>,

    /// Plain repository settings (features, merge buttons, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_orphaned: Option<bool>,
}

/// How the sync pull request gets merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum MergeMode {
    Manual,
    Auto,
    Force,
    Direct,
}

/// Merge method used by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum PrMergeMethod {
    Merge,
    Squash,
    Rebase,
}

/// Pull request options, resolved field by field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<PrMergeMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_branch: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl PrOptions {
    /// Layer `overlay` on top of `self`; defined overlay fields win
    #[must_use]
    pub fn layered(&self, overlay: &Self) -> Self {
        Self {
            merge: overlay.merge.or(self.merge),
            merge_strategy: overlay.merge_strategy.or(self.merge_strategy),
            delete_branch: overlay.delete_branch.or(self.delete_branch),
            bypass_reason: overlay
                .bypass_reason
                .clone()
                .or_else(|| self.bypass_reason.clone()),
            labels: overlay.labels.clone().or_else(|| self.labels.clone()),
        }
    }
}
