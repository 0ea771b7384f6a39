//! Settings planning: keyed reconciliation of every repository's entities
//!
//! Current state comes from a `StateSource`. A rename collision stops the
//! batch of the repository it occurs in; every other repository is still
//! planned.

pub mod state_file;

pub use state_file::StateDocument;

use crate::diff::{CurrentEntity, DesiredEntity, DiffOptions, KeyedChange, ReconcileOptions, reconcile};
use crate::error::SyncError;
use crate::normalize::{EntityKind, ResolvedConfig, ResolvedRepo};
use anyhow::{Context as _, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Property carrying the name an entity should be renamed to
pub const RENAME_KEY: &str = "newName";

/// Live entities of one kind in one repository
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentState {
    pub entities: Vec<CurrentEntity>,
    /// Names created by earlier syncs
    pub managed: Vec<String>,
}

/// Supplies the current state of a repository
pub trait StateSource {
    /// Fetch the current entities of `kind` in `repo`
    fn current_entities(&self, repo: &str, kind: EntityKind) -> Result<CurrentState>;
}

/// Changes planned for one repository
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoPlan {
    pub repo: String,
    pub rulesets: Vec<KeyedChange>,
    pub labels: Vec<KeyedChange>,
}

impl RepoPlan {
    /// Changes for one entity kind
    #[must_use]
    pub fn changes(&self, kind: EntityKind) -> &[KeyedChange] {
        match kind {
            EntityKind::Ruleset => &self.rulesets,
            EntityKind::Label => &self.labels,
        }
    }
}

/// A repository whose batch could not be planned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoFailure {
    pub repo: String,
    pub message: String,
    #[serde(skip)]
    pub error: SyncError,
}

/// Outcome of planning every repository
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanReport {
    pub plans: Vec<RepoPlan>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RepoFailure>,
}

impl PlanReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Turn a resolved entity map into desired entities
///
/// A string `newName` property becomes the rename target and is removed
/// from the compared properties.
#[must_use]
pub fn desired_entities(entities: &BTreeMap<String, Value>) -> Vec<DesiredEntity> {
    entities
        .iter()
        .map(|(name, properties)| {
            let mut properties = properties.clone();
            let rename_to = match properties {
                Value::Object(ref mut map) => match map.remove(RENAME_KEY) {
                    Some(Value::String(target)) => Some(target),
                    Some(other) => {
                        map.insert(RENAME_KEY.to_owned(), other);
                        None
                    }
                    None => None,
                },
                _ => None,
            };
            DesiredEntity {
                name: name.clone(),
                rename_to,
                properties,
            }
        })
        .collect()
}

/// Plan entity changes for every repository
///
/// # Errors
///
/// Returns an error if the state source fails. Rename collisions are
/// recorded in the report instead.
pub fn plan_repositories(
    config: &ResolvedConfig,
    source: &dyn StateSource,
    diff: &DiffOptions,
) -> Result<PlanReport> {
    let mut report = PlanReport::default();

    for repo in &config.repos {
        match plan_repository(config, repo, source, diff) {
            Ok(plan) => report.plans.push(plan),
            Err(err) => match err.downcast_ref::<SyncError>() {
                Some(sync_error) if sync_error.is_repo_scoped() => {
                    warn!("{}: {sync_error}", repo.git);
                    report.failures.push(RepoFailure {
                        repo: repo.git.clone(),
                        message: sync_error.to_string(),
                        error: sync_error.clone(),
                    });
                }
                _ => return Err(err),
            },
        }
    }

    info!(
        "Planned {} repositories, {} failed",
        report.plans.len(),
        report.failures.len()
    );

    Ok(report)
}

fn plan_repository(
    config: &ResolvedConfig,
    repo: &ResolvedRepo,
    source: &dyn StateSource,
    diff: &DiffOptions,
) -> Result<RepoPlan> {
    let delete_orphaned = repo
        .settings
        .as_ref()
        .and_then(|settings| settings.delete_orphaned)
        .or(config.delete_orphaned)
        .unwrap_or(false);

    let mut plan = RepoPlan {
        repo: repo.git.clone(),
        rulesets: Vec::new(),
        labels: Vec::new(),
    };

    for kind in EntityKind::ALL {
        let desired = repo.settings.as_ref().map_or_else(Vec::new, |settings| {
            desired_entities(match kind {
                EntityKind::Ruleset => &settings.rulesets,
                EntityKind::Label => &settings.labels,
            })
        });

        let current = source
            .current_entities(&repo.git, kind)
            .with_context(|| format!("Failed to read current {kind}s of {}", repo.git))?;

        let options = ReconcileOptions {
            diff: diff.clone(),
            delete_orphaned,
            managed: current.managed,
        };
        let changes = reconcile(&current.entities, &desired, &options)?;
        debug!("{}: {} {kind} changes", repo.git, changes.len());

        match kind {
            EntityKind::Ruleset => plan.rulesets = changes,
            EntityKind::Label => plan.labels = changes,
        }
    }

    Ok(plan)
}
