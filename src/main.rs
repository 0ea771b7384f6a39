//! # `reposync`
//!
//! `reposync` keeps configuration files, labels and rulesets consistent across
//! many Git repositories from one declarative YAML file.
//!
//! ## Usage
//!
//! **Resolve the desired state of every repository:**
//! ```sh
//! reposync resolve --config reposync.yaml --format json
//! ```
//!
//! **Compare two documents:**
//! ```sh
//! reposync diff --current live.json --desired wanted.yaml
//! ```
//!
//! **Plan label and ruleset changes:**
//! ```sh
//! reposync plan --config reposync.yaml --state state.yaml
//! ```
//!
//! See `reposync --help` for more options and details.

use clap::Parser as _;
use reposync::cli::Args;
use reposync::error::SyncError;
use reposync::system::RealSystem;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let args = Args::parse();

    // stdout carries the command output, so logs stay quiet unless asked for
    let log_level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let system = RealSystem::new();
    match reposync::run(&args, &system) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(
                err.downcast_ref::<SyncError>()
                    .map_or(1, SyncError::exit_code),
            );
        }
    }
}
