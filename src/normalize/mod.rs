//! Configuration normalization
//!
//! Turns a raw, layered configuration into one fully resolved desired state
//! per target repository: files merged and interpolated, settings inherited,
//! pull request options layered.

pub mod entities;
pub mod files;
pub mod resolved;

pub use entities::{EntityKind, resolve_entities, root_entities};
pub use files::{BaseFile, FileScope, resolve_file};
pub use resolved::{ResolvedConfig, ResolvedFile, ResolvedRepo, ResolvedSettings};

use crate::config::env::{EnvInterpolator, InterpolationOptions};
use crate::config::{FileEntry, RawConfig, RawSettings, RepoEntry};
use crate::error::SyncError;
use crate::merge::merge_values;
use crate::system::System;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Root settings checked once and shared by every repository
struct RootSettings<'cfg> {
    rulesets: BTreeMap<String, Value>,
    labels: BTreeMap<String, Value>,
    raw: Option<&'cfg RawSettings>,
}

/// Resolves a `RawConfig` into a `ResolvedConfig`
pub struct Normalizer<'src> {
    system: &'src dyn System,
    options: InterpolationOptions,
}

impl<'src> Normalizer<'src> {
    /// Create a normalizer with strict interpolation
    #[must_use]
    pub fn new(system: &'src dyn System) -> Self {
        Self {
            system,
            options: InterpolationOptions::default(),
        }
    }

    /// Override interpolation behaviour
    #[must_use]
    pub const fn with_options(mut self, options: InterpolationOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve every repository of the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Base and override content kinds differ for any file
    /// - A required environment variable is unset
    /// - `inherit` is used as an entity name
    /// - A repository opts out of an entity with no root definition
    pub fn normalize(&self, raw: &RawConfig) -> Result<ResolvedConfig, SyncError> {
        let interpolator = EnvInterpolator::new(self.system, self.options)?;

        let bases = raw
            .files
            .iter()
            .map(|(name, definition)| BaseFile::new(name, definition))
            .collect::<Result<Vec<_>, _>>()?;

        let root_settings = raw.settings.as_ref();
        let root = RootSettings {
            rulesets: root_entities(
                EntityKind::Ruleset,
                root_settings.and_then(|s| s.rulesets.as_ref()),
            )?,
            labels: root_entities(EntityKind::Label, root_settings.and_then(|s| s.labels.as_ref()))?,
            raw: root_settings,
        };

        let mut repos = Vec::new();
        for entry in &raw.repos {
            for git in entry.git.urls() {
                let scope = FileScope {
                    repo: git,
                    global_delete_orphaned: raw.delete_orphaned,
                    interpolator: &interpolator,
                };
                repos.push(resolve_repo(raw, entry, &bases, &root, &scope)?);
            }
        }

        info!("Resolved {} repositories for '{}'", repos.len(), raw.id);

        Ok(ResolvedConfig {
            id: raw.id.clone(),
            repos,
            delete_orphaned: raw.delete_orphaned,
            pr_template: raw.pr_template.clone(),
        })
    }
}

/// Resolve a configuration with strict interpolation against `system`
///
/// # Errors
///
/// Returns any error `Normalizer::normalize` reports.
pub fn normalize_config(system: &dyn System, raw: &RawConfig) -> Result<ResolvedConfig, SyncError> {
    Normalizer::new(system).normalize(raw)
}

fn resolve_repo(
    raw: &RawConfig,
    entry: &RepoEntry,
    bases: &[BaseFile<'_>],
    root: &RootSettings<'_>,
    scope: &FileScope<'_>,
) -> Result<ResolvedRepo, SyncError> {
    let mut files = Vec::with_capacity(bases.len());
    for base in bases {
        let overlay = match entry.files.get(base.name) {
            Some(&FileEntry::Toggle(false)) => {
                debug!("{} [{}]: excluded", base.name, scope.repo);
                continue;
            }
            Some(&FileEntry::Toggle(true)) | None => None,
            Some(&FileEntry::Override(ref file)) => Some(file),
        };
        files.push(resolve_file(base, overlay, scope)?);
    }

    let pr_options = match (raw.pr_options.as_ref(), entry.pr_options.as_ref()) {
        (Some(root_options), Some(repo_options)) => Some(root_options.layered(repo_options)),
        (root_options, repo_options) => repo_options.or(root_options).cloned(),
    };

    let settings = resolve_settings(root, entry.settings.as_ref(), scope.repo)?;

    debug!("{}: {} files resolved", scope.repo, files.len());

    Ok(ResolvedRepo {
        git: scope.repo.to_owned(),
        files,
        pr_options,
        settings,
    })
}

fn resolve_settings(
    root: &RootSettings<'_>,
    overlay: Option<&RawSettings>,
    repo: &str,
) -> Result<Option<ResolvedSettings>, SyncError> {
    if root.raw.is_none() && overlay.is_none() {
        return Ok(None);
    }

    let rulesets = resolve_entities(
        EntityKind::Ruleset,
        &root.rulesets,
        overlay.and_then(|s| s.rulesets.as_ref()),
        repo,
    )?;
    let labels = resolve_entities(
        EntityKind::Label,
        &root.labels,
        overlay.and_then(|s| s.labels.as_ref()),
        repo,
    )?;

    let root_repo = root.raw.and_then(|s| s.repo.as_ref());
    let repo_settings = match (root_repo, overlay.and_then(|s| s.repo.as_ref())) {
        (Some(base), Some(value)) => Some(merge_values(base, value)),
        (base, value) => value.or(base).cloned(),
    };

    Ok(Some(ResolvedSettings {
        rulesets,
        labels,
        repo: repo_settings,
        delete_orphaned: overlay
            .and_then(|s| s.delete_orphaned)
            .or_else(|| root.raw.and_then(|s| s.delete_orphaned)),
    }))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::config::yaml::parse_config;
    use crate::config::{MergeMode, PrMergeMethod};
    use crate::merge::FileContent;
    use crate::system::MockSystem;
    use serde_json::json;

    fn resolve(yaml: &str) -> ResolvedConfig {
        let raw = parse_config(yaml).unwrap();
        normalize_config(&MockSystem::new(), &raw).unwrap()
    }

    fn content(config: &ResolvedConfig, git: &str, file: &str) -> Value {
        let file = config.repo(git).unwrap().file(file).unwrap();
        serde_json::to_value(&file.content).unwrap()
    }

    #[test]
    fn false_excludes_and_true_inherits() {
        let config = resolve(
            r#"
id: demo
files:
  a.txt:
    content: "A"
  b.txt:
    content: "B"
repos:
  - git: git@github.com:acme/one.git
    files:
      a.txt: false
      b.txt: true
"#,
        );
        let repo = config.repo("git@github.com:acme/one.git").unwrap();
        assert!(repo.file("a.txt").is_none());
        assert_eq!(
            repo.file("b.txt").unwrap().content,
            Some(FileContent::Text("B".to_owned()))
        );
    }

    #[test]
    fn override_ignores_root_content() {
        let config = resolve(
            r#"
id: demo
files:
  package.json:
    content:
      name: base
      scripts: {test: jest}
repos:
  - git: git@github.com:acme/one.git
    files:
      package.json:
        override: true
        content:
          name: custom
"#,
        );
        assert_eq!(
            content(&config, "git@github.com:acme/one.git", "package.json"),
            json!({"name": "custom"})
        );
    }

    #[test]
    fn override_without_content_is_null() {
        let config = resolve(
            r#"
id: demo
files:
  x.json:
    content: {a: 1}
repos:
  - git: git@github.com:acme/one.git
    files:
      x.json:
        override: true
"#,
        );
        assert_eq!(content(&config, "git@github.com:acme/one.git", "x.json"), Value::Null);
    }

    #[test]
    fn missing_base_content_takes_overlay() {
        let config = resolve(
            r#"
id: demo
files:
  .gitignore:
    executable: false
repos:
  - git: git@github.com:acme/one.git
    files:
      .gitignore:
        content: [target/]
  - git: git@github.com:acme/two.git
"#,
        );
        assert_eq!(
            content(&config, "git@github.com:acme/one.git", ".gitignore"),
            json!(["target/"])
        );
        assert_eq!(content(&config, "git@github.com:acme/two.git", ".gitignore"), Value::Null);
    }

    #[test]
    fn text_lists_use_declared_strategy() {
        let config = resolve(
            r#"
id: demo
files:
  .gitignore:
    content: [a, b]
    mergeStrategy: append
repos:
  - git: git@github.com:acme/one.git
    files:
      .gitignore:
        content: [c, d]
"#,
        );
        assert_eq!(
            content(&config, "git@github.com:acme/one.git", ".gitignore"),
            json!(["a", "b", "c", "d"])
        );
    }

    #[test]
    fn kind_mismatch_names_file_and_repo() {
        let raw = parse_config(
            r#"
id: demo
files:
  x.json:
    content: {a: 1}
repos:
  - git: git@github.com:acme/one.git
    files:
      x.json:
        content: "plain"
"#,
        )
        .unwrap();
        let err = normalize_config(&MockSystem::new(), &raw).unwrap_err();
        assert!(matches!(err, SyncError::ContentTypeMismatch { .. }));
        let message = err.to_string();
        assert!(message.contains("x.json"), "got: {message}");
        assert!(message.contains("acme/one"), "got: {message}");
    }

    #[test]
    fn scalars_resolve_overlay_then_base() {
        let config = resolve(
            r#"
id: demo
deleteOrphaned: true
files:
  run.sh:
    content: "echo hi"
    executable: true
    header: "generated"
    vars: {a: "1", b: "2"}
repos:
  - git: git@github.com:acme/one.git
    files:
      run.sh:
        createOnly: true
        vars: {b: "3"}
        deleteOrphaned: false
"#,
        );
        let file = config
            .repo("git@github.com:acme/one.git")
            .unwrap()
            .file("run.sh")
            .unwrap();
        assert_eq!(file.executable, Some(true));
        assert_eq!(file.create_only, Some(true));
        assert_eq!(file.header, Some(vec!["generated".to_owned()]));
        assert_eq!(file.vars.get("a").map(String::as_str), Some("1"));
        assert_eq!(file.vars.get("b").map(String::as_str), Some("3"));
        assert_eq!(file.delete_orphaned, Some(false));
        assert_eq!(file.template, None);
    }

    #[test]
    fn delete_orphaned_falls_back_to_global() {
        let config = resolve(
            r#"
id: demo
deleteOrphaned: true
files:
  a.txt:
    content: "A"
repos:
  - git: git@github.com:acme/one.git
"#,
        );
        let file = config
            .repo("git@github.com:acme/one.git")
            .unwrap()
            .file("a.txt")
            .unwrap();
        assert_eq!(file.delete_orphaned, Some(true));
    }

    #[test]
    fn git_list_expands_to_independent_repos() {
        let config = resolve(
            r#"
id: demo
files:
  a.json:
    content: {k: v}
repos:
  - git: [git@github.com:acme/one.git, git@github.com:acme/two.git]
"#,
        );
        assert_eq!(config.repos.len(), 2);
        assert_eq!(
            content(&config, "git@github.com:acme/one.git", "a.json"),
            content(&config, "git@github.com:acme/two.git", "a.json")
        );
    }

    #[test]
    fn interpolation_reads_the_system_environment() {
        let raw = parse_config(
            r#"
id: demo
files:
  owner.txt:
    content: "owner=${OWNER}"
repos:
  - git: git@github.com:acme/one.git
"#,
        )
        .unwrap();
        let system = MockSystem::new().with_env("OWNER", "platform").unwrap();
        let config = normalize_config(&system, &raw).unwrap();
        assert_eq!(
            content(&config, "git@github.com:acme/one.git", "owner.txt"),
            json!("owner=platform")
        );

        let err = normalize_config(&MockSystem::new(), &raw).unwrap_err();
        match err {
            SyncError::MissingEnvironmentVariable { variable, file, repo, .. } => {
                assert_eq!(variable, "OWNER");
                assert_eq!(file, "owner.txt");
                assert_eq!(repo, "git@github.com:acme/one.git");
            }
            other => panic!("Expected missing variable, got {other:?}"),
        }

        let lenient = Normalizer::new(&MockSystem::new())
            .with_options(InterpolationOptions { strict: false })
            .normalize(&raw)
            .unwrap();
        assert_eq!(
            content(&lenient, "git@github.com:acme/one.git", "owner.txt"),
            json!("owner=${OWNER}")
        );
    }

    #[test]
    fn pr_options_layer_over_root() {
        let config = resolve(
            r#"
id: demo
prOptions:
  merge: auto
  mergeStrategy: squash
prTemplate: "Sync {{id}}"
repos:
  - git: git@github.com:acme/one.git
    prOptions:
      merge: manual
  - git: git@github.com:acme/two.git
"#,
        );
        let one = config.repo("git@github.com:acme/one.git").unwrap();
        let options = one.pr_options.as_ref().unwrap();
        assert_eq!(options.merge, Some(MergeMode::Manual));
        assert_eq!(options.merge_strategy, Some(PrMergeMethod::Squash));

        let two = config.repo("git@github.com:acme/two.git").unwrap();
        assert_eq!(two.pr_options.as_ref().unwrap().merge, Some(MergeMode::Auto));
        assert_eq!(config.pr_template.as_deref(), Some("Sync {{id}}"));
    }

    #[test]
    fn settings_inherit_and_merge() {
        let config = resolve(
            r#"
id: demo
settings:
  deleteOrphaned: true
  labels:
    bug: {color: d73a4a}
  repo:
    hasWiki: false
    topics: [a, b]
repos:
  - git: git@github.com:acme/one.git
    settings:
      labels:
        bug: {description: broken}
      repo:
        topics: [c]
  - git: git@github.com:acme/two.git
    settings:
      deleteOrphaned: false
      labels:
        inherit: false
"#,
        );
        let one = config
            .repo("git@github.com:acme/one.git")
            .unwrap()
            .settings
            .as_ref()
            .unwrap();
        assert_eq!(
            one.labels.get("bug"),
            Some(&json!({"color": "d73a4a", "description": "broken"}))
        );
        assert_eq!(one.repo, Some(json!({"hasWiki": false, "topics": ["c"]})));
        assert_eq!(one.delete_orphaned, Some(true));

        let two = config
            .repo("git@github.com:acme/two.git")
            .unwrap()
            .settings
            .as_ref()
            .unwrap();
        assert!(two.labels.is_empty());
        assert_eq!(two.delete_orphaned, Some(false));
    }

    #[test]
    fn no_settings_anywhere_resolves_to_none() {
        let config = resolve(
            r#"
id: demo
repos:
  - git: git@github.com:acme/one.git
"#,
        );
        assert!(config.repos[0].settings.is_none());
    }

    #[test]
    fn opt_out_of_undefined_entity_is_fatal() {
        let raw = parse_config(
            r#"
id: demo
repos:
  - git: git@github.com:acme/one.git
    settings:
      rulesets:
        main-protection: false
"#,
        )
        .unwrap();
        let err = normalize_config(&MockSystem::new(), &raw).unwrap_err();
        assert_eq!(
            err,
            SyncError::invalid_opt_out("ruleset", "main-protection", "git@github.com:acme/one.git")
        );
    }
}
