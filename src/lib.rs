//! `reposync` - Declarative configuration sync across many Git repositories
//!
//! This library resolves one layered configuration into the exact desired
//! state of every target repository: managed files merged and interpolated,
//! labels and rulesets inherited. It also compares desired state against
//! current state, following entity renames.

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod plan;
pub mod system;

use anyhow::{Context as _, Result};
use cli::{Args, Command, OutputFormat, render};
use config::RawConfig;
use config::env::InterpolationOptions;
use diff::{DiffOptions, PropertyDiff};
use normalize::{Normalizer, ResolvedConfig};
use plan::{PlanReport, StateDocument};
use system::System;

/// Main entry point: run one subcommand and print its result
pub fn run(args: &Args, system: &dyn System) -> Result<()> {
    match args.command {
        Command::Resolve(ref resolve) => {
            let format = resolve
                .format
                .parse::<OutputFormat>()
                .map_err(error::SyncError::configuration)?;
            let options = InterpolationOptions {
                strict: !resolve.lenient,
            };
            let resolved = run_resolve(system, &resolve.config, options)?;
            print!("{}", with_newline(render(&resolved, format)?));
        }
        Command::Diff(ref diff_args) => {
            let options = diff_options(&diff_args.discriminator, &diff_args.ignore_keys);
            let changes = run_diff(system, &diff_args.current, &diff_args.desired, &options)?;
            println!("{}", render(&changes, OutputFormat::Json)?);
        }
        Command::Plan(ref plan_args) => {
            let options = diff_options(&plan_args.discriminator, &plan_args.ignore_keys);
            let report = run_plan(system, &plan_args.config, &plan_args.state, &options)?;
            println!("{}", render(&report, OutputFormat::Json)?);
            if let Some(failure) = report.failures.first() {
                return Err(anyhow::Error::new(failure.error.clone()).context(format!(
                    "{} of {} repositories could not be planned",
                    report.failures.len(),
                    report.failures.len() + report.plans.len()
                )));
            }
        }
    }
    Ok(())
}

/// Load, validate and resolve a configuration file
pub fn run_resolve(
    system: &dyn System,
    config_path: &str,
    options: InterpolationOptions,
) -> Result<ResolvedConfig> {
    let raw = RawConfig::load_from_file(system, config_path)?;
    let resolved = Normalizer::new(system)
        .with_options(options)
        .normalize(&raw)
        .with_context(|| format!("Failed to resolve configuration: {config_path}"))?;
    Ok(resolved)
}

/// Diff two JSON or YAML documents
pub fn run_diff(
    system: &dyn System,
    current_path: &str,
    desired_path: &str,
    options: &DiffOptions,
) -> Result<Vec<PropertyDiff>> {
    let current = config::yaml::load_document(system, current_path)?;
    let desired = config::yaml::load_document(system, desired_path)?;
    Ok(diff::diff_with_options(&current, &desired, options))
}

/// Resolve a configuration and plan entity changes against a state file
pub fn run_plan(
    system: &dyn System,
    config_path: &str,
    state_path: &str,
    options: &DiffOptions,
) -> Result<PlanReport> {
    let resolved = run_resolve(system, config_path, InterpolationOptions::default())?;
    let state = StateDocument::load(system, state_path)?;
    plan::plan_repositories(&resolved, &state, options)
}

fn diff_options(discriminator: &str, ignore_keys: &[String]) -> DiffOptions {
    DiffOptions::default()
        .with_discriminator(discriminator)
        .ignoring(ignore_keys.iter().cloned())
}

fn with_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
