//! Status command - per-module cache validity

use crate::cli::args::{OutputFormat, StatusArgs};
use crate::config::Config;
use crate::error::ModswapResult;
use crate::model::Workspace;
use crate::registry::{ModuleNode, Validity};
use crate::session::Session;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ModuleStatus {
    module: String,
    enabled: bool,
    cache: String,
    variant: String,
    artifact: String,
    fingerprint: Option<String>,
}

impl From<&ModuleNode> for ModuleStatus {
    fn from(node: &ModuleNode) -> Self {
        Self {
            module: node.path().to_string(),
            enabled: node.enabled(),
            cache: node.validity().to_string(),
            variant: node.variant(),
            artifact: node.artifact_file().display().to_string(),
            fingerprint: node.fingerprint().map(ToString::to_string),
        }
    }
}

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config) -> ModswapResult<()> {
    let workspace = Workspace::load(&args.workspace)?;
    let mut session = Session::open(config.clone(), workspace.base_dir());
    let outcome = session.prepare(&workspace).await;

    let statuses: Vec<ModuleStatus> = session.registry().iter().map(ModuleStatus::from).collect();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&statuses)?),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            if statuses.is_empty() {
                ui::step_warn_hint(&ctx, "No modules configured", "add [[modules]] entries to modswap.toml");
                return Ok(());
            }
            print_table(session.registry().iter());
            println!();
            println!(
                "{} cached, {} stale",
                outcome.valid.len(),
                outcome.invalid.len()
            );
        }
    }

    Ok(())
}

fn print_table<'a>(nodes: impl Iterator<Item = &'a ModuleNode>) {
    println!(
        "{:<28} {:<9} {:<9} {:<16} {}",
        style("MODULE").bold(),
        style("ENABLED").bold(),
        style("CACHE").bold(),
        style("VARIANT").bold(),
        style("ARTIFACT").bold()
    );
    println!("{}", "-".repeat(90));

    for node in nodes {
        let cache = match node.validity() {
            Validity::Valid => style("valid").green(),
            Validity::Invalid => style("stale").yellow(),
            Validity::Unknown => style("unknown").dim(),
        };
        let enabled = if node.enabled() {
            style("yes")
        } else {
            style("no").dim()
        };
        println!(
            "{:<28} {:<9} {:<9} {:<16} {}",
            node.path(),
            enabled,
            cache,
            node.variant(),
            node.artifact_name()
        );
    }
}
