//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Modswap - swap module source dependencies for cached artifacts
///
/// Reads a workspace manifest, checks which configured modules have an
/// up-to-date cached artifact, and rewrites the dependency graph to use them.
#[derive(Parser, Debug)]
#[command(name = "modswap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "MODSWAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip modswap.toml discovery next to the workspace
    #[arg(long, global = true)]
    pub no_local: bool,
}

impl Cli {
    /// Directory local config discovery starts from
    pub fn discovery_dir(&self) -> Option<&Path> {
        match &self.command {
            Commands::Plan(args) => args.workspace.parent(),
            Commands::Status(args) => args.workspace.parent(),
            Commands::Record(args) => args.workspace.parent(),
            Commands::Init(_) | Commands::Config(_) => None,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe caches and rewrite the workspace graph
    Plan(PlanArgs),

    /// Show cache validity of every configured module
    Status(StatusArgs),

    /// Install a built artifact and record its fingerprint
    Record(RecordArgs),

    /// Write a starter modswap.toml
    Init(InitArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Workspace manifest (TOML or JSON)
    pub workspace: PathBuf,

    /// Requested build tasks, matched against general.detect_launcher
    #[arg(short, long, value_delimiter = ',')]
    pub tasks: Vec<String>,

    /// Write the rewritten manifest here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Workspace manifest (TOML or JSON)
    pub workspace: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the record command
#[derive(Parser, Debug)]
pub struct RecordArgs {
    /// Workspace manifest (TOML or JSON)
    pub workspace: PathBuf,

    /// Module the artifact was built from, e.g. :feature:login
    #[arg(short, long, required_unless_present = "root", requires = "artifact")]
    pub module: Option<String>,

    /// Artifact produced by the build
    #[arg(short, long, requires = "module")]
    pub artifact: Option<PathBuf>,

    /// Record the root project tree (annotation processing ran)
    #[arg(long)]
    pub root: bool,
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite existing modswap.toml
    #[arg(short, long)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the global config file path
    Path,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}
