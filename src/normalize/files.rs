//! Per-repository file resolution

use crate::config::env::EnvInterpolator;
use crate::config::{FileDefinition, FileOverride};
use crate::error::SyncError;
use crate::merge::{FileContent, MergeContext, merge_content};
use crate::normalize::resolved::ResolvedFile;
use tracing::debug;

/// Root file definition with its content parsed once per run
#[derive(Debug, Clone)]
pub struct BaseFile<'cfg> {
    pub name: &'cfg str,
    pub definition: &'cfg FileDefinition,
    pub content: Option<FileContent>,
}

impl<'cfg> BaseFile<'cfg> {
    /// Parse the root content of a file definition
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not text, a text list or an object.
    pub fn new(name: &'cfg str, definition: &'cfg FileDefinition) -> Result<Self, SyncError> {
        let content = match definition.content.clone() {
            Some(value) => FileContent::from_value(value).map_err(|e| {
                SyncError::configuration(format!("File '{name}': {e}"))
            })?,
            None => None,
        };
        Ok(Self {
            name,
            definition,
            content,
        })
    }
}

/// Inputs that apply to every file of one repository
pub struct FileScope<'run> {
    pub repo: &'run str,
    pub global_delete_orphaned: Option<bool>,
    pub interpolator: &'run EnvInterpolator<'run>,
}

/// Resolve one root file against one repository's override
///
/// # Errors
///
/// Returns an error if:
/// - The override content is malformed
/// - Base and override content kinds differ
/// - A required environment variable is unset
pub fn resolve_file(
    base: &BaseFile<'_>,
    overlay: Option<&FileOverride>,
    scope: &FileScope<'_>,
) -> Result<ResolvedFile, SyncError> {
    let overlay_content = match overlay.and_then(|o| o.content.clone()) {
        Some(value) => FileContent::from_value(value).map_err(|e| {
            SyncError::configuration(format!(
                "File '{}' in repo '{}': {e}",
                base.name, scope.repo
            ))
        })?,
        None => None,
    };

    let content = resolve_content(base, overlay, overlay_content, scope)?;

    let content = match content {
        Some(content) => Some(scope.interpolator.interpolate_content(content).map_err(|e| {
            SyncError::MissingEnvironmentVariable {
                variable: e.name.clone(),
                file: base.name.to_owned(),
                repo: scope.repo.to_owned(),
                detail: e.message.unwrap_or_else(|| "is not set".to_owned()),
            }
        })?),
        None => None,
    };

    let definition = base.definition;
    let header = overlay
        .and_then(|o| o.header.as_ref())
        .or(definition.header.as_ref())
        .map(crate::config::Header::to_lines);

    let mut vars = definition.vars.clone().unwrap_or_default();
    if let Some(overlay_vars) = overlay.and_then(|o| o.vars.as_ref()) {
        vars.extend(overlay_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    Ok(ResolvedFile {
        file_name: base.name.to_owned(),
        content,
        create_only: overlay.and_then(|o| o.create_only).or(definition.create_only),
        executable: overlay.and_then(|o| o.executable).or(definition.executable),
        header,
        schema_url: overlay
            .and_then(|o| o.schema_url.clone())
            .or_else(|| definition.schema_url.clone()),
        template: overlay.and_then(|o| o.template).or(definition.template),
        vars,
        delete_orphaned: overlay
            .and_then(|o| o.delete_orphaned)
            .or(definition.delete_orphaned)
            .or(scope.global_delete_orphaned),
    })
}

/// Pick the content of one file; first matching rule wins
fn resolve_content(
    base: &BaseFile<'_>,
    overlay: Option<&FileOverride>,
    overlay_content: Option<FileContent>,
    scope: &FileScope<'_>,
) -> Result<Option<FileContent>, SyncError> {
    if overlay.is_some_and(|o| o.override_base) {
        debug!("{} [{}]: override, root content ignored", base.name, scope.repo);
        return Ok(overlay_content.map(FileContent::strip_directives));
    }

    match (base.content.as_ref(), overlay_content) {
        (None, overlay_content) => Ok(overlay_content.map(FileContent::strip_directives)),
        (Some(base_content), None) => Ok(Some(base_content.clone().strip_directives())),
        (Some(base_content), Some(overlay_content)) => {
            let strategy = base.definition.merge_strategy.unwrap_or_default();
            debug!("{} [{}]: merging with {strategy}", base.name, scope.repo);
            merge_content(base_content, &overlay_content, &MergeContext::new(strategy))
                .map(Some)
                .map_err(|mismatch| SyncError::ContentTypeMismatch {
                    file: base.name.to_owned(),
                    repo: scope.repo.to_owned(),
                    base: mismatch.base.to_string(),
                    overlay: mismatch.overlay.to_string(),
                })
        }
    }
}
