//! Current state read from a JSON or YAML document
//!
//! ```yaml
//! git@github.com:acme/one.git:
//!   labels:
//!     entities:
//!       - name: bug
//!         color: d73a4a
//!     managed: [bug]
//!   rulesets:
//!     entities: []
//! ```

use crate::diff::CurrentEntity;
use crate::error::SyncError;
use crate::normalize::EntityKind;
use crate::plan::{CurrentState, StateSource};
use crate::system::System;
use anyhow::{Context as _, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// One live entity: its name plus every other property
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StateEntity {
    pub name: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// Live entities of one kind
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EntityState {
    pub entities: Vec<StateEntity>,
    pub managed: Vec<String>,
}

/// Live state of one repository
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RepoState {
    pub rulesets: EntityState,
    pub labels: EntityState,
}

/// Current state of every repository, keyed by git URL
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StateDocument {
    pub repos: BTreeMap<String, RepoState>,
}

impl StateDocument {
    /// Load a state document from file
    pub fn load(system: &dyn System, path: &str) -> Result<Self> {
        let path_obj = Path::new(path);
        if !system.is_file(path_obj) {
            return Err(SyncError::filesystem(format!("State file not found: {path}")).into());
        }

        let content = system
            .read_to_string(path_obj)
            .with_context(|| format!("Failed to read state file: {path}"))?;

        let document = Self::parse(&content)
            .with_context(|| format!("Invalid state in file: {path}"))?;
        debug!("Loaded state for {} repositories", document.repos.len());
        Ok(document)
    }

    /// Parse state text; JSON is accepted as YAML
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| SyncError::configuration(format!("Failed to parse state: {e}")).into())
    }
}

impl StateSource for StateDocument {
    fn current_entities(&self, repo: &str, kind: EntityKind) -> Result<CurrentState> {
        let Some(state) = self.repos.get(repo) else {
            debug!("{repo}: no recorded state, treating as empty");
            return Ok(CurrentState::default());
        };

        let entities = match kind {
            EntityKind::Ruleset => &state.rulesets,
            EntityKind::Label => &state.labels,
        };

        Ok(CurrentState {
            entities: entities
                .entities
                .iter()
                .map(|entity| {
                    CurrentEntity::new(entity.name.as_str(), Value::Object(entity.properties.clone()))
                })
                .collect(),
            managed: entities.managed.clone(),
        })
    }
}
