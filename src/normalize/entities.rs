//! Inheritance of named entity collections (rulesets, labels)

use crate::error::SyncError;
use crate::merge::merge_values;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Reserved collection key toggling inheritance of root entities
pub const INHERIT_KEY: &str = "inherit";

/// Label used in errors for the root settings block
pub const ROOT_SCOPE: &str = "<root>";

/// Kind of a named entity collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Ruleset,
    Label,
}

impl EntityKind {
    /// Every kind, in planning order
    pub const ALL: [Self; 2] = [Self::Ruleset, Self::Label];

    /// Singular name used in messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ruleset => "ruleset",
            Self::Label => "label",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check a root collection and return its entity definitions
///
/// # Errors
///
/// Returns an error if:
/// - `inherit` holds an entity definition
/// - A root entry is not an object
pub fn root_entities(
    kind: EntityKind,
    root: Option<&Map<String, Value>>,
) -> Result<BTreeMap<String, Value>, SyncError> {
    let mut entities = BTreeMap::new();
    for (name, value) in root.into_iter().flatten() {
        if name == INHERIT_KEY {
            if value.is_object() {
                return Err(SyncError::reserved_key(kind.as_str(), ROOT_SCOPE));
            }
            warn!("'{INHERIT_KEY}' has no effect in root {kind} settings");
            continue;
        }
        if !value.is_object() {
            return Err(SyncError::configuration(format!(
                "Root {kind} '{name}' must be an object"
            )));
        }
        entities.insert(name.clone(), value.clone());
    }
    Ok(entities)
}

/// Resolve one repository's view of an entity collection
///
/// Names only at root or only in the repo pass through; names in both are
/// deep-merged with arrays replaced. A repo value of `false` drops one root
/// entity, and `inherit: false` drops every root entity the repo does not
/// redeclare.
///
/// # Errors
///
/// Returns an error if:
/// - `inherit` holds an entity definition or a non-boolean
/// - A repo opts out of a name with no root definition
/// - A repo entry is neither an object nor `false`
pub fn resolve_entities(
    kind: EntityKind,
    root: &BTreeMap<String, Value>,
    overlay: Option<&Map<String, Value>>,
    repo: &str,
) -> Result<BTreeMap<String, Value>, SyncError> {
    let Some(overlay) = overlay else {
        return Ok(root.clone());
    };

    let inherit = match overlay.get(INHERIT_KEY) {
        None => true,
        Some(&Value::Bool(flag)) => flag,
        Some(&Value::Object(_)) => return Err(SyncError::reserved_key(kind.as_str(), repo)),
        Some(other) => {
            return Err(SyncError::configuration(format!(
                "'{INHERIT_KEY}' in {kind} settings of repo '{repo}' must be a boolean, got: {other}"
            )));
        }
    };

    let mut resolved = if inherit {
        root.clone()
    } else {
        debug!("{repo}: root {kind}s not inherited");
        BTreeMap::new()
    };

    for (name, value) in overlay {
        if name == INHERIT_KEY {
            continue;
        }
        match *value {
            Value::Bool(false) => {
                if !root.contains_key(name) {
                    return Err(SyncError::invalid_opt_out(kind.as_str(), name.as_str(), repo));
                }
                debug!("{repo}: opted out of {kind} '{name}'");
                resolved.remove(name);
            }
            Value::Object(_) => {
                let merged = match root.get(name) {
                    Some(base) => merge_values(base, value),
                    None => value.clone(),
                };
                resolved.insert(name.clone(), merged);
            }
            _ => {
                return Err(SyncError::configuration(format!(
                    "{kind} '{name}' in repo '{repo}' must be an object or false"
                )));
            }
        }
    }

    Ok(resolved)
}
