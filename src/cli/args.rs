use clap::{Args as ClapArgs, Parser, Subcommand};

/// Command-line arguments for reposync
#[derive(Parser, Debug, Clone)]
#[command(name = "reposync")]
#[command(about = "Declarative configuration sync across many Git repositories")]
#[command(long_about = None)]
#[command(version)]
pub struct Args {
    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the fully resolved configuration of every repository
    Resolve(ResolveArgs),

    /// Compare two JSON or YAML documents property by property
    Diff(DiffArgs),

    /// Plan label and ruleset changes against a current-state document
    Plan(PlanArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ResolveArgs {
    /// Configuration file path
    #[arg(long, value_name = "PATH", default_value = "./reposync.yaml")]
    pub config: String,

    /// Output format: yaml or json
    #[arg(long, value_name = "FORMAT", default_value = "yaml", value_parser = ["yaml", "json"])]
    pub format: String,

    /// Leave unresolved ${NAME} placeholders in place instead of failing
    #[arg(long)]
    pub lenient: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DiffArgs {
    /// Document describing the current state
    #[arg(long, value_name = "PATH")]
    pub current: String,

    /// Document describing the desired state
    #[arg(long, value_name = "PATH")]
    pub desired: String,

    /// Field used to match array elements
    #[arg(long, value_name = "FIELD", default_value = "type")]
    pub discriminator: String,

    /// Keys to leave out of the comparison (can be specified multiple times)
    #[arg(long = "ignore-key", value_name = "KEY")]
    pub ignore_keys: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    /// Configuration file path
    #[arg(long, value_name = "PATH", default_value = "./reposync.yaml")]
    pub config: String,

    /// Current-state document (JSON or YAML)
    #[arg(long, value_name = "PATH")]
    pub state: String,

    /// Field used to match array elements
    #[arg(long, value_name = "FIELD", default_value = "type")]
    pub discriminator: String,

    /// Keys to leave out of the comparison (can be specified multiple times)
    #[arg(long = "ignore-key", value_name = "KEY")]
    pub ignore_keys: Vec<String>,
}
