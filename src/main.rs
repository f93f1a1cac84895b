//! Modswap CLI entry point

use clap::Parser;
use console::style;
use modswap::cli::{Cli, Commands};
use modswap::config::{Config, ConfigManager};
use modswap::error::{ModswapError, ModswapResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ModswapResult<()> {
    let cli = Cli::parse();

    // Init command doesn't need config loading
    if let Commands::Init(args) = cli.command {
        init_logging(cli.verbose, &Config::default());
        return modswap::cli::commands::init(args).await;
    }

    let config = load_config(&cli).await?;
    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Init(_) => unreachable!("Init handled above"),
        Commands::Plan(args) => modswap::cli::commands::plan(args, &config).await,
        Commands::Status(args) => modswap::cli::commands::status(args, &config).await,
        Commands::Record(args) => modswap::cli::commands::record(args, &config).await,
        Commands::Config(args) => modswap::cli::commands::config(args, &config).await,
    }
}

/// Explicit --config, else modswap.toml next to the workspace, else the global file
async fn load_config(cli: &Cli) -> ModswapResult<Config> {
    if let Some(path) = &cli.config {
        if !path.is_file() {
            return Err(ModswapError::ConfigNotFound(path.clone()));
        }
        return ConfigManager::with_path(path.clone()).load().await;
    }

    if !cli.no_local {
        let start = match cli.discovery_dir() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::env::current_dir()
                .map_err(|e| ModswapError::io("getting current directory", e))?,
        };
        if let Some(path) = ConfigManager::find_local_config(&start) {
            debug!("Found local config: {}", path.display());
            return ConfigManager::with_path(path).load().await;
        }
    }

    ConfigManager::new().load().await
}

/// 0 = warn, 1 = info, 2+ = debug; `general.log_enabled` raises 0 to info
fn init_logging(verbose: u8, config: &Config) {
    let level = match verbose {
        0 if config.general.log_enabled => "info",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::new(format!("modswap={}", level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format.eq_ignore_ascii_case("json") {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }
}
