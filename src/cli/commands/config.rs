//! Config command - show configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::ModswapResult;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config) -> ModswapResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", ConfigManager::new().path().display()),
    }
    Ok(())
}

fn show_config(config: &Config) -> ModswapResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
