//! Structural diff between a current and a desired JSON tree

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Past this depth a differing subtree is reported as one `change`
const MAX_DIFF_DEPTH: usize = 128;

/// Kind of one property-level difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    Add,
    Change,
    Remove,
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Remove => "remove",
        })
    }
}

/// One difference at one path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDiff {
    /// Object keys and array segments from the root to the property
    ///
    /// Array elements appear as `[i]`, or `[i](value)` when matched by
    /// discriminator.
    pub path: Vec<String>,

    pub action: DiffAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

impl PropertyDiff {
    fn add(path: Vec<String>, value: &Value) -> Self {
        Self {
            path,
            action: DiffAction::Add,
            old_value: None,
            new_value: Some(value.clone()),
        }
    }

    fn remove(path: Vec<String>, value: &Value) -> Self {
        Self {
            path,
            action: DiffAction::Remove,
            old_value: Some(value.clone()),
            new_value: None,
        }
    }

    fn change(path: Vec<String>, old: &Value, new: &Value) -> Self {
        Self {
            path,
            action: DiffAction::Change,
            old_value: Some(old.clone()),
            new_value: Some(new.clone()),
        }
    }

    /// Dotted form of the path, for display
    #[must_use]
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Display for PropertyDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.path_string())?;
        match (&self.old_value, &self.new_value) {
            (Some(old), Some(new)) => write!(f, ": {old} -> {new}"),
            (None, Some(new)) => write!(f, ": {new}"),
            (Some(old), None) => write!(f, ": {old}"),
            (None, None) => Ok(()),
        }
    }
}

/// Knobs for one diff run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// Field used to match array elements across both trees
    pub discriminator: String,

    /// Keys excluded from comparison at every depth
    pub ignored_keys: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            discriminator: "type".to_owned(),
            ignored_keys: Vec::new(),
        }
    }
}

impl DiffOptions {
    /// Use `field` to match array elements
    #[must_use]
    pub fn with_discriminator<S: Into<String>>(mut self, field: S) -> Self {
        self.discriminator = field.into();
        self
    }

    /// Exclude `keys` from comparison
    #[must_use]
    pub fn ignoring<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    fn is_ignored(&self, key: &str) -> bool {
        self.ignored_keys.iter().any(|ignored| ignored == key)
    }
}

/// Diff two trees with default options
#[must_use]
pub fn diff(current: &Value, desired: &Value) -> Vec<PropertyDiff> {
    diff_with_options(current, desired, &DiffOptions::default())
}

/// Diff two trees
///
/// Objects are compared key by key, arrays of objects element by element,
/// and anything else as a whole value. Shapes that cannot be descended
/// into degrade to a single `change`.
#[must_use]
pub fn diff_with_options(current: &Value, desired: &Value, options: &DiffOptions) -> Vec<PropertyDiff> {
    let mut walker = DiffWalker {
        options,
        changes: Vec::new(),
    };
    walker.diff_value(current, desired, &[], 0);
    walker.changes
}

/// Deep equality with ignored keys left out at every depth
#[must_use]
pub fn equivalent(current: &Value, desired: &Value, options: &DiffOptions) -> bool {
    match (current, desired) {
        (&Value::Object(ref a), &Value::Object(ref b)) => {
            let keys_a = a.keys().filter(|k| !options.is_ignored(k));
            let keys_b = b.keys().filter(|k| !options.is_ignored(k));
            keys_a.count() == keys_b.count()
                && a.iter()
                    .filter(|&(k, _)| !options.is_ignored(k))
                    .all(|(k, v)| b.get(k).is_some_and(|other| equivalent(v, other, options)))
        }
        (&Value::Array(ref a), &Value::Array(ref b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equivalent(x, y, options))
        }
        _ => current == desired,
    }
}

struct DiffWalker<'opts> {
    options: &'opts DiffOptions,
    changes: Vec<PropertyDiff>,
}

impl DiffWalker<'_> {
    fn diff_value(&mut self, current: &Value, desired: &Value, path: &[String], depth: usize) {
        if equivalent(current, desired, self.options) {
            return;
        }
        if depth > MAX_DIFF_DEPTH {
            self.changes
                .push(PropertyDiff::change(path.to_vec(), current, desired));
            return;
        }

        match (current, desired) {
            (&Value::Object(ref a), &Value::Object(ref b)) => self.diff_objects(a, b, path, depth),
            (&Value::Array(ref a), &Value::Array(ref b)) if is_object_array(a) && is_object_array(b) => {
                self.diff_arrays(a, b, path, depth);
            }
            _ => self
                .changes
                .push(PropertyDiff::change(path.to_vec(), current, desired)),
        }
    }

    fn diff_objects(
        &mut self,
        current: &Map<String, Value>,
        desired: &Map<String, Value>,
        path: &[String],
        depth: usize,
    ) {
        let keys: BTreeSet<&String> = current
            .keys()
            .chain(desired.keys())
            .filter(|key| !self.options.is_ignored(key))
            .collect();

        for key in keys {
            let child = extend(path, key.clone());
            match (current.get(key), desired.get(key)) {
                (None, Some(value)) => self.changes.push(PropertyDiff::add(child, value)),
                (Some(value), None) => self.changes.push(PropertyDiff::remove(child, value)),
                (Some(old), Some(new)) => self.diff_value(old, new, &child, depth + 1),
                (None, None) => {}
            }
        }
    }

    fn diff_arrays(&mut self, current: &[Value], desired: &[Value], path: &[String], depth: usize) {
        match discriminated(current, desired, &self.options.discriminator) {
            Some((current_keys, desired_keys)) => {
                self.diff_by_discriminator(current, desired, &current_keys, &desired_keys, path, depth);
            }
            None => self.diff_by_position(current, desired, path, depth),
        }
    }

    fn diff_by_discriminator(
        &mut self,
        current: &[Value],
        desired: &[Value],
        current_keys: &[Option<&str>],
        desired_keys: &[&str],
        path: &[String],
        depth: usize,
    ) {
        let lookup: HashMap<&str, usize> = current_keys
            .iter()
            .enumerate()
            .filter_map(|(index, key)| key.map(|k| (k, index)))
            .collect();

        let mut matched = HashSet::new();
        for (index, (element, key)) in desired.iter().zip(desired_keys).enumerate() {
            let child = extend(path, format!("[{index}]({key})"));
            match lookup.get(key) {
                Some(&current_index) => {
                    matched.insert(current_index);
                    if let Some(old) = current.get(current_index) {
                        self.diff_value(old, element, &child, depth + 1);
                    }
                }
                None => self.changes.push(PropertyDiff::add(child, element)),
            }
        }

        for (index, element) in current.iter().enumerate() {
            if matched.contains(&index) {
                continue;
            }
            let segment = match current_keys.get(index).copied().flatten() {
                Some(key) => format!("[{index}]({key})"),
                None => format!("[{index}]"),
            };
            self.changes
                .push(PropertyDiff::remove(extend(path, segment), element));
        }
    }

    fn diff_by_position(&mut self, current: &[Value], desired: &[Value], path: &[String], depth: usize) {
        for index in 0..current.len().max(desired.len()) {
            let child = extend(path, format!("[{index}]"));
            match (current.get(index), desired.get(index)) {
                (Some(old), Some(new)) => self.diff_value(old, new, &child, depth + 1),
                (None, Some(new)) => self.changes.push(PropertyDiff::add(child, new)),
                (Some(old), None) => self.changes.push(PropertyDiff::remove(child, old)),
                (None, None) => {}
            }
        }
    }
}

fn extend(path: &[String], segment: String) -> Vec<String> {
    let mut child = Vec::with_capacity(path.len() + 1);
    child.extend_from_slice(path);
    child.push(segment);
    child
}

fn is_object_array(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(Value::is_object)
}

fn discriminator_of<'v>(element: &'v Value, field: &str) -> Option<&'v str> {
    element.get(field).and_then(Value::as_str)
}

/// Discriminator values of both arrays, if every desired element has a
/// unique one and the current values present are unique
fn discriminated<'v>(
    current: &'v [Value],
    desired: &'v [Value],
    field: &str,
) -> Option<(Vec<Option<&'v str>>, Vec<&'v str>)> {
    let desired_keys = desired
        .iter()
        .map(|element| discriminator_of(element, field))
        .collect::<Option<Vec<_>>>()?;
    if !all_unique(desired_keys.iter().copied()) {
        return None;
    }

    let current_keys: Vec<Option<&str>> = current
        .iter()
        .map(|element| discriminator_of(element, field))
        .collect();
    if !all_unique(current_keys.iter().copied().flatten()) {
        return None;
    }

    Some((current_keys, desired_keys))
}

fn all_unique<'v, I: Iterator<Item = &'v str>>(mut keys: I) -> bool {
    let mut seen = HashSet::new();
    keys.all(|key| seen.insert(key))
}
