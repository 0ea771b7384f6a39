//! Fully resolved, per-repository desired state

use crate::config::PrOptions;
use crate::merge::FileContent;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Output of normalization: one entry per target repository
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ResolvedConfig {
    pub id: String,

    pub repos: Vec<ResolvedRepo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_orphaned: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_template: Option<String>,
}

impl ResolvedConfig {
    /// Find a repository by its git URL
    #[must_use]
    pub fn repo(&self, git: &str) -> Option<&ResolvedRepo> {
        self.repos.iter().find(|repo| repo.git == git)
    }
}

/// Desired state of one repository
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ResolvedRepo {
    pub git: String,

    pub files: Vec<ResolvedFile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_options: Option<PrOptions>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<ResolvedSettings>,
}

impl ResolvedRepo {
    /// Find a resolved file by name
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&ResolvedFile> {
        self.files.iter().find(|file| file.file_name == name)
    }
}

/// One file, merged and interpolated, ready to write
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ResolvedFile {
    pub file_name: String,

    pub content: Option<FileContent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_only: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<bool>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_orphaned: Option<bool>,
}

/// Settings of one repository after inheritance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ResolvedSettings {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rulesets: BTreeMap<String, Value>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_orphaned: Option<bool>,
}
