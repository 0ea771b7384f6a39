//! Content merge resolver
//!
//! Merges one base value with one overlay value, honouring the declared
//! strategy and any inline directives.

pub mod content;
pub mod resolver;

pub use content::{
    DIRECTIVE_KEY, DIRECTIVE_VALUES_KEY, ContentKind, Directive, FileContent, MergeStrategy, Node, Tree,
};
pub use resolver::{ContentKindMismatch, MergeContext, merge_content, merge_tree, merge_values};
