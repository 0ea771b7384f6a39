//! Environment variable interpolation for resolved content
//!
//! Supported placeholders:
//! - `${NAME}`: value of `NAME`, required in strict mode
//! - `${NAME:-default}`: value of `NAME`, or `default` when unset or empty
//! - `${NAME:?message}`: value of `NAME`, failing with `message` when unset or empty
//! - `$${NAME}`: the literal text `${NAME}`

use crate::error::SyncError;
use crate::merge::{FileContent, Node, Tree};
use crate::system::System;
use regex::{Captures, Regex};
use thiserror::Error;

const PLACEHOLDER_PATTERN: &str = r"\$?\$\{([A-Za-z_][A-Za-z0-9_]*)(?:(:-|:\?)([^}]*))?\}";

/// Interpolation behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpolationOptions {
    /// Fail on unset `${NAME}` placeholders instead of leaving them in place
    pub strict: bool,
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// A required variable had no value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("environment variable '{name}': {}", .message.as_deref().unwrap_or("is not set"))]
pub struct UnsetVariable {
    pub name: String,
    pub message: Option<String>,
}

/// Expands placeholders against the environment of a `System`
pub struct EnvInterpolator<'src> {
    system: &'src dyn System,
    pattern: Regex,
    options: InterpolationOptions,
}

impl<'src> EnvInterpolator<'src> {
    /// Create an interpolator reading variables from `system`
    ///
    /// # Errors
    ///
    /// Returns an error if the placeholder pattern fails to compile.
    pub fn new(system: &'src dyn System, options: InterpolationOptions) -> Result<Self, SyncError> {
        let pattern = Regex::new(PLACEHOLDER_PATTERN).map_err(|e| {
            SyncError::configuration(format!("Failed to compile placeholder pattern: {e}"))
        })?;
        Ok(Self {
            system,
            pattern,
            options,
        })
    }

    /// Expand every placeholder in one string
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A required variable is unset (strict mode)
    /// - A `${NAME:?message}` variable is unset or empty
    pub fn interpolate_str(&self, input: &str) -> Result<String, UnsetVariable> {
        let mut output = String::with_capacity(input.len());
        let mut last = 0;
        for captures in self.pattern.captures_iter(input) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            output.push_str(&input[last..whole.start()]);
            output.push_str(&self.expand(&captures, whole.as_str())?);
            last = whole.end();
        }
        output.push_str(&input[last..]);
        Ok(output)
    }

    fn expand(&self, captures: &Captures<'_>, matched: &str) -> Result<String, UnsetVariable> {
        if let Some(literal) = matched.strip_prefix('$')
            && literal.starts_with('$')
        {
            return Ok(literal.to_owned());
        }

        let name = captures.get(1).map_or("", |m| m.as_str());
        let operator = captures.get(2).map(|m| m.as_str());
        let argument = captures.get(3).map_or("", |m| m.as_str());
        let value = self.system.env_var(name).ok();

        match operator {
            Some(":-") => Ok(value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| argument.to_owned())),
            Some(_) => value.filter(|v| !v.is_empty()).ok_or_else(|| UnsetVariable {
                name: name.to_owned(),
                message: (!argument.is_empty()).then(|| argument.to_owned()),
            }),
            None => match value {
                Some(v) => Ok(v),
                None if self.options.strict => Err(UnsetVariable {
                    name: name.to_owned(),
                    message: None,
                }),
                None => Ok(matched.to_owned()),
            },
        }
    }

    /// Expand placeholders in every string leaf of file content
    ///
    /// # Errors
    ///
    /// Returns the first unset required variable.
    pub fn interpolate_content(&self, content: FileContent) -> Result<FileContent, UnsetVariable> {
        match content {
            FileContent::Text(text) => self.interpolate_str(&text).map(FileContent::Text),
            FileContent::Lines(lines) => lines
                .iter()
                .map(|line| self.interpolate_str(line))
                .collect::<Result<Vec<_>, _>>()
                .map(FileContent::Lines),
            FileContent::Structured(tree) => self.interpolate_tree(tree).map(FileContent::Structured),
        }
    }

    fn interpolate_tree(&self, tree: Tree) -> Result<Tree, UnsetVariable> {
        tree.into_iter()
            .map(|(key, node)| Ok((key, self.interpolate_node(node)?)))
            .collect()
    }

    fn interpolate_node(&self, node: Node) -> Result<Node, UnsetVariable> {
        match node {
            Node::String(s) => self.interpolate_str(&s).map(Node::String),
            Node::Array(items) => items
                .into_iter()
                .map(|item| self.interpolate_node(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Node::Array),
            Node::Object(tree) => self.interpolate_tree(tree).map(Node::Object),
            Node::Directive(mut directive) => {
                directive.values = directive
                    .values
                    .into_iter()
                    .map(|item| self.interpolate_node(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Node::Directive(directive))
            }
            scalar @ (Node::Null | Node::Bool(_) | Node::Number(_)) => Ok(scalar),
        }
    }
}
