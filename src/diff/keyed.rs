//! Rename-aware reconciliation of named entities

use crate::diff::structural::{DiffOptions, PropertyDiff, diff_with_options};
use crate::error::SyncError;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// An entity as it should exist after the sync
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredEntity {
    pub name: String,
    /// Name the entity should carry afterwards, if it changes
    pub rename_to: Option<String>,
    pub properties: Value,
}

impl DesiredEntity {
    /// Entity that keeps its name
    #[must_use]
    pub fn new<S: Into<String>>(name: S, properties: Value) -> Self {
        Self {
            name: name.into(),
            rename_to: None,
            properties,
        }
    }

    /// Request a rename to `target`
    #[must_use]
    pub fn renamed_to<S: Into<String>>(mut self, target: S) -> Self {
        self.rename_to = Some(target.into());
        self
    }
}

/// An entity as it exists right now
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentEntity {
    pub name: String,
    pub properties: Value,
}

impl CurrentEntity {
    #[must_use]
    pub fn new<S: Into<String>>(name: S, properties: Value) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }
}

/// What happens to one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyedAction {
    Delete,
    Update,
    Create,
    Unchanged,
}

impl fmt::Display for KeyedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Create => "create",
            Self::Unchanged => "unchanged",
        })
    }
}

/// Classified change for one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedChange {
    pub name: String,
    pub action: KeyedAction,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename_to: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diffs: Vec<PropertyDiff>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Value>,
}

/// Reconciliation behaviour for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub diff: DiffOptions,

    /// Delete managed entities that are no longer desired
    pub delete_orphaned: bool,

    /// Names a previous sync created; only these may be deleted
    pub managed: Vec<String>,
}

/// A desired entity paired with the current entity it maps to
struct Claim<'a> {
    desired: &'a DesiredEntity,
    current: Option<&'a CurrentEntity>,
    rename_to: Option<&'a str>,
}

impl Claim<'_> {
    fn final_name(&self) -> &str {
        self.rename_to.unwrap_or(match self.current {
            Some(current) if self.desired.rename_to.is_some() => current.name.as_str(),
            _ => self.desired.name.as_str(),
        })
    }
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// Classify every desired and managed entity of one batch
///
/// Renames are checked for collisions over the whole batch first, so a
/// chain such as `a -> b, b -> c` is accepted while a rename onto a name
/// that survives the batch is rejected. Within the updates, a rename comes
/// after the rename that vacates its target.
///
/// # Errors
///
/// Returns `SyncError::RenameCollision` if two desired entities end with
/// the same name or map to the same current entity, a rename target is
/// held by a surviving entity, or the renames form a cycle.
/// Returns `SyncError::Configuration` if two current entities differ only
/// by case.
pub fn reconcile(
    current: &[CurrentEntity],
    desired: &[DesiredEntity],
    options: &ReconcileOptions,
) -> Result<Vec<KeyedChange>, SyncError> {
    let mut by_name: HashMap<String, &CurrentEntity> = HashMap::with_capacity(current.len());
    for entity in current {
        if let Some(previous) = by_name.insert(fold(&entity.name), entity) {
            return Err(SyncError::configuration(format!(
                "Current state holds both '{}' and '{}', which differ only by case",
                previous.name, entity.name
            )));
        }
    }

    let desired_names: HashSet<String> = desired.iter().map(|entity| fold(&entity.name)).collect();
    let claims: Vec<Claim<'_>> = desired
        .iter()
        .map(|entity| claim(entity, &by_name, &desired_names))
        .collect();

    let mut claimed: HashMap<String, &str> = HashMap::new();
    for c in &claims {
        let Some(entity) = c.current else {
            continue;
        };
        if let Some(previous) = claimed.insert(fold(&entity.name), c.desired.name.as_str()) {
            return Err(SyncError::rename_collision(
                c.desired.name.as_str(),
                entity.name.as_str(),
                format!("'{previous}' already maps to '{}'", entity.name),
            ));
        }
    }

    let managed: HashSet<String> = options.managed.iter().map(|name| fold(name)).collect();
    let deleted: Vec<&CurrentEntity> = if options.delete_orphaned {
        current
            .iter()
            .filter(|entity| {
                let key = fold(&entity.name);
                !claimed.contains_key(&key) && managed.contains(&key)
            })
            .collect()
    } else {
        Vec::new()
    };

    check_collisions(&claims, &by_name, &deleted)?;

    let mut changes: Vec<KeyedChange> = deleted
        .iter()
        .map(|entity| KeyedChange {
            name: entity.name.clone(),
            action: KeyedAction::Delete,
            rename_to: None,
            diffs: Vec::new(),
            desired: None,
            current: Some(entity.properties.clone()),
        })
        .collect();

    let (updates, mut rest): (Vec<KeyedChange>, Vec<KeyedChange>) = claims
        .iter()
        .map(|c| classify(c, &options.diff))
        .partition(|change| change.action == KeyedAction::Update);
    rest.sort_by_key(|change| change.action);

    changes.extend(order_renames(updates)?);
    changes.extend(rest);

    Ok(changes)
}

fn claim<'a>(
    desired: &'a DesiredEntity,
    by_name: &HashMap<String, &'a CurrentEntity>,
    desired_names: &HashSet<String>,
) -> Claim<'a> {
    let target = desired
        .rename_to
        .as_deref()
        .filter(|target| *target != desired.name);

    if let Some(&current) = by_name.get(&fold(&desired.name)) {
        return Claim {
            desired,
            current: Some(current),
            rename_to: target,
        };
    }

    // Source gone but target present: the rename already happened, unless
    // another desired entity owns the target name
    if let Some(target) = target
        && !desired_names.contains(&fold(target))
        && let Some(&current) = by_name.get(&fold(target))
    {
        return Claim {
            desired,
            current: Some(current),
            rename_to: (current.name != target).then_some(target),
        };
    }

    Claim {
        desired,
        current: None,
        rename_to: target,
    }
}

fn check_collisions(
    claims: &[Claim<'_>],
    by_name: &HashMap<String, &CurrentEntity>,
    deleted: &[&CurrentEntity],
) -> Result<(), SyncError> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for c in claims {
        let final_name = c.final_name();
        if let Some(previous) = owners.insert(fold(final_name), c.desired.name.as_str()) {
            return Err(SyncError::rename_collision(
                c.desired.name.as_str(),
                final_name,
                format!("'{previous}' already ends up with that name"),
            ));
        }
    }

    let deleted: HashSet<String> = deleted.iter().map(|entity| fold(&entity.name)).collect();
    let renamed_away: HashSet<String> = claims
        .iter()
        .filter(|c| c.rename_to.is_some())
        .filter_map(|c| c.current.map(|entity| fold(&entity.name)))
        .collect();

    for c in claims {
        let Some(target) = c.rename_to else {
            continue;
        };
        let key = fold(target);
        let Some(holder) = by_name.get(&key) else {
            continue;
        };
        if c.current.is_some_and(|source| fold(&source.name) == key) {
            continue;
        }
        if deleted.contains(&key) || renamed_away.contains(&key) {
            continue;
        }
        return Err(SyncError::rename_collision(
            c.desired.name.as_str(),
            target,
            format!("'{}' already exists and is kept", holder.name),
        ));
    }

    Ok(())
}

/// Put each rename after the rename that vacates its target
fn order_renames(updates: Vec<KeyedChange>) -> Result<Vec<KeyedChange>, SyncError> {
    let vacating: HashMap<String, usize> = updates
        .iter()
        .enumerate()
        .filter(|(_, change)| change.rename_to.is_some())
        .map(|(i, change)| (fold(&change.name), i))
        .collect();
    let blocker = |i: usize| -> Option<usize> {
        let target = fold(updates[i].rename_to.as_deref()?);
        vacating.get(&target).copied().filter(|&j| j != i)
    };

    let mut placed = vec![false; updates.len()];
    let mut order = Vec::with_capacity(updates.len());
    for start in 0..updates.len() {
        let mut path = Vec::new();
        let mut next = Some(start);
        while let Some(i) = next {
            if placed[i] {
                break;
            }
            if path.contains(&i) {
                let change = &updates[i];
                return Err(SyncError::rename_collision(
                    change.name.as_str(),
                    change.rename_to.as_deref().unwrap_or_default(),
                    "the renames form a cycle",
                ));
            }
            path.push(i);
            next = blocker(i);
        }
        for &i in path.iter().rev() {
            placed[i] = true;
            order.push(i);
        }
    }

    let mut slots: Vec<Option<KeyedChange>> = updates.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

fn classify(c: &Claim<'_>, options: &DiffOptions) -> KeyedChange {
    let desired = c.desired;
    let Some(current) = c.current else {
        return KeyedChange {
            name: c.final_name().to_owned(),
            action: KeyedAction::Create,
            rename_to: None,
            diffs: Vec::new(),
            desired: Some(desired.properties.clone()),
            current: None,
        };
    };

    let diffs = diff_with_options(&current.properties, &desired.properties, options);
    let action = if c.rename_to.is_some() || !diffs.is_empty() {
        KeyedAction::Update
    } else {
        KeyedAction::Unchanged
    };

    KeyedChange {
        name: current.name.clone(),
        action,
        rename_to: c.rename_to.map(str::to_owned),
        diffs,
        desired: Some(desired.properties.clone()),
        current: Some(current.properties.clone()),
    }
}
