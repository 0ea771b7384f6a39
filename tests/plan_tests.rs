//! Settings planning across repositories

use anyhow::{Result, anyhow};
use reposync::config::yaml::parse_config;
use reposync::diff::{CurrentEntity, DiffOptions, KeyedAction};
use reposync::error::SyncError;
use reposync::normalize::{EntityKind, ResolvedConfig, normalize_config};
use reposync::plan::{CurrentState, StateDocument, StateSource, plan_repositories};
use reposync::system::MockSystem;
use serde_json::json;
use std::collections::HashMap;

const ONE: &str = "git@github.com:acme/one.git";
const TWO: &str = "git@github.com:acme/two.git";

/// State source backed by a map, for tests
#[derive(Default)]
struct FixedState {
    labels: HashMap<String, CurrentState>,
    failing_repo: Option<String>,
}

impl FixedState {
    fn with_labels(mut self, repo: &str, entities: Vec<CurrentEntity>, managed: &[&str]) -> Self {
        self.labels.insert(
            repo.to_owned(),
            CurrentState {
                entities,
                managed: managed.iter().map(|name| (*name).to_owned()).collect(),
            },
        );
        self
    }
}

impl StateSource for FixedState {
    fn current_entities(&self, repo: &str, kind: EntityKind) -> Result<CurrentState> {
        if self.failing_repo.as_deref() == Some(repo) {
            return Err(anyhow!("API unavailable"));
        }
        Ok(match kind {
            EntityKind::Label => self.labels.get(repo).cloned().unwrap_or_default(),
            EntityKind::Ruleset => CurrentState::default(),
        })
    }
}

fn resolved(yaml: &str) -> ResolvedConfig {
    normalize_config(&MockSystem::new(), &parse_config(yaml).unwrap()).unwrap()
}

const CONFIG: &str = r#"
id: demo
settings:
  deleteOrphaned: true
  labels:
    bug: {color: d73a4a}
    enhancement: {color: a2eeef, newName: feature}
repos:
  - git: [git@github.com:acme/one.git, git@github.com:acme/two.git]
"#;

#[test]
fn test_plans_every_repository() {
    let state = FixedState::default()
        .with_labels(
            ONE,
            vec![
                CurrentEntity::new("bug", json!({"color": "d73a4a"})),
                CurrentEntity::new("enhancement", json!({"color": "a2eeef"})),
                CurrentEntity::new("wontfix", json!({"color": "ffffff"})),
            ],
            &["wontfix"],
        );

    let report = plan_repositories(&resolved(CONFIG), &state, &DiffOptions::default()).unwrap();
    assert!(!report.has_failures());
    assert_eq!(report.plans.len(), 2);

    let one = &report.plans[0];
    assert_eq!(one.repo, ONE);
    let actions: Vec<(&str, KeyedAction)> = one
        .changes(EntityKind::Label)
        .iter()
        .map(|c| (c.name.as_str(), c.action))
        .collect();
    assert_eq!(
        actions,
        vec![
            ("wontfix", KeyedAction::Delete),
            ("enhancement", KeyedAction::Update),
            ("bug", KeyedAction::Unchanged),
        ]
    );

    // Nothing exists yet in the second repository
    let two = &report.plans[1];
    assert!(two.labels.iter().all(|c| c.action == KeyedAction::Create));
    let created: Vec<&str> = two.labels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(created, vec!["bug", "feature"]);
}

#[test]
fn test_rename_collision_is_isolated_to_one_repository() {
    let state = FixedState::default()
        .with_labels(
            ONE,
            vec![
                CurrentEntity::new("enhancement", json!({"color": "a2eeef"})),
                CurrentEntity::new("feature", json!({"color": "000000"})),
            ],
            &[],
        )
        .with_labels(
            TWO,
            vec![CurrentEntity::new("enhancement", json!({"color": "a2eeef"}))],
            &[],
        );

    let report = plan_repositories(&resolved(CONFIG), &state, &DiffOptions::default()).unwrap();
    assert!(report.has_failures());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].repo, ONE);
    assert!(matches!(
        report.failures[0].error,
        SyncError::RenameCollision { .. }
    ));

    assert_eq!(report.plans.len(), 1);
    assert_eq!(report.plans[0].repo, TWO);
}

#[test]
fn test_state_source_errors_abort_planning() {
    let state = FixedState {
        failing_repo: Some(TWO.to_owned()),
        ..FixedState::default()
    };
    let err = plan_repositories(&resolved(CONFIG), &state, &DiffOptions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("API unavailable"));
}

#[test]
fn test_delete_orphaned_off_keeps_managed_entities() {
    let config = resolved(
        r#"
id: demo
settings:
  labels:
    bug: {color: d73a4a}
repos:
  - git: git@github.com:acme/one.git
"#,
    );
    let state = FixedState::default().with_labels(
        ONE,
        vec![CurrentEntity::new("stale", json!({"color": "111111"}))],
        &["stale"],
    );
    let report = plan_repositories(&config, &state, &DiffOptions::default()).unwrap();
    assert!(
        report.plans[0]
            .labels
            .iter()
            .all(|c| c.action != KeyedAction::Delete)
    );
}

#[test]
fn test_state_document_as_source() {
    let document = StateDocument::parse(
        r"
git@github.com:acme/one.git:
  labels:
    entities:
      - name: bug
        color: d73a4a
        id: 1
",
    )
    .unwrap();
    let options = DiffOptions::default().ignoring(["id"]);
    let report = plan_repositories(&resolved(CONFIG), &document, &options).unwrap();
    let bug = report.plans[0]
        .labels
        .iter()
        .find(|c| c.name == "bug")
        .unwrap();
    assert_eq!(bug.action, KeyedAction::Unchanged);
}
