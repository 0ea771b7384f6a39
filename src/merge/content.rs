//! Content trees for managed files
//!
//! File content is one of three kinds: a single text blob, a list of text
//! lines, or a structured object tree. Structured trees may carry inline
//! merge directives until they pass through the resolver.

use crate::error::SyncError;
use serde::ser::{SerializeMap as _, SerializeSeq as _};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Key that marks an object as a merge directive
pub const DIRECTIVE_KEY: &str = "$arrayMerge";

/// Key holding the values carried by a merge directive
pub const DIRECTIVE_VALUES_KEY: &str = "values";

/// Object level of a structured tree
pub type Tree = BTreeMap<String, Node>;

/// Strategy used when two lists meet during a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    #[default]
    Replace,
    Append,
    Prepend,
}

impl MergeStrategy {
    /// Combine two lists according to this strategy
    #[must_use]
    pub fn combine<T>(self, base: Vec<T>, overlay: Vec<T>) -> Vec<T> {
        match self {
            Self::Replace => overlay,
            Self::Append => base.into_iter().chain(overlay).collect(),
            Self::Prepend => overlay.into_iter().chain(base).collect(),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Replace => f.write_str("replace"),
            Self::Append => f.write_str("append"),
            Self::Prepend => f.write_str("prepend"),
        }
    }
}

impl FromStr for MergeStrategy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            "prepend" => Ok(Self::Prepend),
            _ => Err(SyncError::configuration(format!(
                "Invalid merge strategy '{s}'. Must be 'replace', 'append' or 'prepend'"
            ))),
        }
    }
}

/// A per-field request to merge an array with a non-default strategy
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub strategy: MergeStrategy,
    pub values: Vec<Node>,
}

/// One node of a structured content tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Node>),
    Object(Tree),
    Directive(Directive),
}

impl Node {
    /// Build a node from JSON, recognising merge directives
    ///
    /// # Errors
    ///
    /// Returns an error if an object uses the directive key but is not a
    /// well-formed directive.
    pub fn parse(value: Value) -> Result<Self, SyncError> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            Value::Object(map) if map.contains_key(DIRECTIVE_KEY) => parse_directive(map),
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| Ok((key, Self::parse(value)?)))
                .collect::<Result<Tree, SyncError>>()
                .map(Self::Object),
            scalar => Ok(Self::from(scalar)),
        }
    }

    /// Whether this subtree still holds a directive anywhere
    #[must_use]
    pub fn has_directive(&self) -> bool {
        match *self {
            Self::Directive(_) => true,
            Self::Array(ref items) => items.iter().any(Self::has_directive),
            Self::Object(ref tree) => tree.values().any(Self::has_directive),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => false,
        }
    }

    /// Replace every directive with the plain list of its values
    #[must_use]
    pub fn strip_directives(self) -> Self {
        match self {
            Self::Directive(directive) => Self::Array(
                directive
                    .values
                    .into_iter()
                    .map(Self::strip_directives)
                    .collect(),
            ),
            Self::Array(items) => Self::Array(items.into_iter().map(Self::strip_directives).collect()),
            Self::Object(tree) => Self::Object(strip_tree(tree)),
            scalar => scalar,
        }
    }
}

/// Strip directives from every node of an object level
#[must_use]
pub fn strip_tree(tree: Tree) -> Tree {
    tree.into_iter()
        .map(|(key, node)| (key, node.strip_directives()))
        .collect()
}

fn parse_directive(mut map: serde_json::Map<String, Value>) -> Result<Node, SyncError> {
    let strategy = match map.remove(DIRECTIVE_KEY) {
        Some(Value::String(name)) => name.parse::<MergeStrategy>()?,
        other => {
            return Err(SyncError::configuration(format!(
                "'{DIRECTIVE_KEY}' must name a merge strategy, got: {other:?}"
            )));
        }
    };
    let values = match map.remove(DIRECTIVE_VALUES_KEY) {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(Node::parse)
            .collect::<Result<Vec<_>, _>>()?,
        other => {
            return Err(SyncError::configuration(format!(
                "'{DIRECTIVE_KEY}' requires a '{DIRECTIVE_VALUES_KEY}' list, got: {other:?}"
            )));
        }
    };
    if let Some(extra) = map.keys().next() {
        return Err(SyncError::configuration(format!(
            "Unexpected key '{extra}' next to '{DIRECTIVE_KEY}'"
        )));
    }
    Ok(Node::Directive(Directive { strategy, values }))
}

/// Plain conversion: objects are never read as directives
impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Null => Self::Null,
            Node::Bool(b) => Self::Bool(b),
            Node::Number(n) => Self::Number(n),
            Node::String(s) => Self::String(s),
            Node::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Node::Object(tree) => {
                Self::Object(tree.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
            Node::Directive(directive) => {
                let mut map = serde_json::Map::new();
                map.insert(
                    DIRECTIVE_KEY.to_owned(),
                    Self::String(directive.strategy.to_string()),
                );
                map.insert(
                    DIRECTIVE_VALUES_KEY.to_owned(),
                    Self::Array(directive.values.into_iter().map(Self::from).collect()),
                );
                Self::Object(map)
            }
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(b),
            Self::Number(ref n) => n.serialize(serializer),
            Self::String(ref s) => serializer.serialize_str(s),
            Self::Array(ref items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(ref tree) => {
                let mut map = serializer.serialize_map(Some(tree.len()))?;
                for (key, value) in tree {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Directive(ref directive) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(DIRECTIVE_KEY, &directive.strategy)?;
                map.serialize_entry(DIRECTIVE_VALUES_KEY, &directive.values)?;
                map.end()
            }
        }
    }
}

/// Coarse kind of a piece of file content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Structured,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Text => f.write_str("text"),
            Self::Structured => f.write_str("structured"),
        }
    }
}

/// Content of one managed file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FileContent {
    /// A single text blob
    Text(String),
    /// A list of text lines
    Lines(Vec<String>),
    /// An object tree written as JSON or YAML
    Structured(Tree),
}

impl FileContent {
    /// Classify raw configuration content
    ///
    /// Returns `None` for null content.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The value is a scalar other than a string
    /// - The value is an array holding anything but strings
    /// - A structured tree holds a malformed directive
    pub fn from_value(value: Value) -> Result<Option<Self>, SyncError> {
        match value {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(Self::Text(text))),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(line) => Ok(line),
                    other => Err(SyncError::configuration(format!(
                        "Text list content may only hold strings, got: {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|lines| Some(Self::Lines(lines))),
            Value::Object(_) => match Node::parse(value)? {
                Node::Object(tree) => Ok(Some(Self::Structured(tree))),
                Node::Directive(_) => Err(SyncError::configuration(
                    "A merge directive cannot be the whole file content",
                )),
                _ => Err(SyncError::configuration("Structured content must be an object")),
            },
            Value::Bool(_) | Value::Number(_) => Err(SyncError::configuration(format!(
                "Unsupported file content: {value}"
            ))),
        }
    }

    /// Coarse kind used for base/overlay compatibility checks
    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        match *self {
            Self::Text(_) | Self::Lines(_) => ContentKind::Text,
            Self::Structured(_) => ContentKind::Structured,
        }
    }

    /// Remove every directive marker from structured content
    #[must_use]
    pub fn strip_directives(self) -> Self {
        match self {
            Self::Structured(tree) => Self::Structured(strip_tree(tree)),
            text => text,
        }
    }

    /// Whether any directive marker remains in this content
    #[must_use]
    pub fn has_directive(&self) -> bool {
        match *self {
            Self::Structured(ref tree) => tree.values().any(Node::has_directive),
            Self::Text(_) | Self::Lines(_) => false,
        }
    }
}
