//! Base/overlay merge for one unit of content
//!
//! Every function here takes its inputs by reference and builds a fresh
//! result, so one base can be merged against any number of overlays.

use crate::merge::content::{ContentKind, FileContent, MergeStrategy, Node, Tree, strip_tree};
use serde_json::Value;
use thiserror::Error;

/// Settings for a single merge call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct MergeContext {
    /// Strategy applied where two lists meet without a directive
    pub strategy: MergeStrategy,

    /// Apply directive strategies; when off, a directive simply replaces
    pub honor_directives: bool,
}

impl MergeContext {
    /// Context for file content with the file's declared strategy
    #[must_use]
    #[inline]
    pub const fn new(strategy: MergeStrategy) -> Self {
        Self {
            strategy,
            honor_directives: true,
        }
    }

    /// Context for named entities: whole-array replace, no directives
    #[must_use]
    #[inline]
    pub const fn entities() -> Self {
        Self {
            strategy: MergeStrategy::Replace,
            honor_directives: false,
        }
    }
}

impl Default for MergeContext {
    fn default() -> Self {
        Self::new(MergeStrategy::Replace)
    }
}

/// Base and overlay content are of different kinds
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot merge {overlay} content onto {base} content")]
pub struct ContentKindMismatch {
    pub base: ContentKind,
    pub overlay: ContentKind,
}

/// Merge overlay content onto base content
///
/// The result never contains a directive marker.
///
/// # Errors
///
/// Returns an error if:
/// - One side is text and the other is structured
pub fn merge_content(
    base: &FileContent,
    overlay: &FileContent,
    context: &MergeContext,
) -> Result<FileContent, ContentKindMismatch> {
    let merged = match (base, overlay) {
        (&FileContent::Lines(ref base_lines), &FileContent::Lines(ref overlay_lines)) => {
            FileContent::Lines(
                context
                    .strategy
                    .combine(base_lines.clone(), overlay_lines.clone()),
            )
        }
        (&FileContent::Text(_) | &FileContent::Lines(_), &FileContent::Text(_))
        | (&FileContent::Text(_), &FileContent::Lines(_)) => overlay.clone(),
        (&FileContent::Structured(ref base_tree), &FileContent::Structured(ref overlay_tree)) => {
            FileContent::Structured(merge_tree(base_tree.clone(), overlay_tree.clone(), context))
        }
        _ => {
            return Err(ContentKindMismatch {
                base: base.kind(),
                overlay: overlay.kind(),
            });
        }
    };
    Ok(merged.strip_directives())
}

/// Deep merge two object levels
///
/// Overlay-only keys are added, shared objects recurse, everything else
/// takes the overlay value. Lists follow the context strategy unless the
/// overlay wraps them in a directive.
#[must_use]
pub fn merge_tree(mut base: Tree, overlay: Tree, context: &MergeContext) -> Tree {
    for (key, overlay_node) in overlay {
        let merged = match base.remove(&key) {
            Some(base_node) => merge_node(base_node, overlay_node, context),
            None => overlay_node.strip_directives(),
        };
        base.insert(key, merged);
    }
    strip_tree(base)
}

fn merge_node(base: Node, overlay: Node, context: &MergeContext) -> Node {
    match (base, overlay) {
        (Node::Object(base_tree), Node::Object(overlay_tree)) => {
            Node::Object(merge_tree(base_tree, overlay_tree, context))
        }
        (base_node, Node::Directive(directive)) => {
            let values: Vec<Node> = directive
                .values
                .into_iter()
                .map(Node::strip_directives)
                .collect();
            match base_node {
                Node::Array(base_items) if context.honor_directives => {
                    Node::Array(directive.strategy.combine(strip_items(base_items), values))
                }
                _ => Node::Array(values),
            }
        }
        (Node::Array(base_items), Node::Array(overlay_items)) => Node::Array(
            context
                .strategy
                .combine(strip_items(base_items), strip_items(overlay_items)),
        ),
        (_, overlay_node) => overlay_node.strip_directives(),
    }
}

fn strip_items(items: Vec<Node>) -> Vec<Node> {
    items.into_iter().map(Node::strip_directives).collect()
}

/// Deep merge two plain JSON values with whole-array replace
///
/// Used for named entities and repository settings, where inline
/// directives are not recognised.
#[must_use]
pub fn merge_values(base: &Value, overlay: &Value) -> Value {
    let context = MergeContext::entities();
    Value::from(merge_node(
        Node::from(base.clone()),
        Node::from(overlay.clone()),
        &context,
    ))
}
