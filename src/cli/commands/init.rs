//! Init command - create a workspace-local modswap.toml

use crate::cli::args::InitArgs;
use crate::config::LOCAL_CONFIG_FILE;
use crate::error::{ModswapError, ModswapResult};
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;

/// Template for the workspace config
const INIT_TEMPLATE: &str = r#"# modswap configuration
# Modules listed here are replaced by their cached artifact whenever the
# artifact is present and the module's sources are unchanged.

[general]
enabled = true
# log_enabled = false
# log_format = "text"                    # text, json
# detect_launcher = "^:app:assemble"     # only run for matching tasks

[output]
# dir = "build/modswap"
# module_artifacts_dir = "build/modswap/modules"
# third_party_artifacts_dir = "build/modswap/third_party"

[probe]
# workers = 0                            # 0 = available parallelism
# exclude_dirs = ["build", ".gradle", ".cxx", ".git", ".idea"]
# annotation_processing = false

[substitution]
# artifact_extension = "aar"
# bucket_suffixes = ["api", "runtimeOnly", "implementation"]

# [[modules]]
# path = ":core"

# [[modules]]
# path = ":feature:login"
# use_debug = false
# flavor = "tiya"
# enable = true
"#;

/// Execute the init command
pub async fn execute(args: InitArgs) -> ModswapResult<()> {
    let ctx = UiContext::detect();

    let target_dir = match args.path {
        Some(ref p) => p.clone(),
        None => std::env::current_dir()
            .map_err(|e| ModswapError::io("getting current directory", e))?,
    };

    let config_path = target_dir.join(LOCAL_CONFIG_FILE);

    if config_path.exists() && !args.force {
        return Err(ModswapError::User(format!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        )));
    }

    ensure_dir(&target_dir).await?;

    fs::write(&config_path, INIT_TEMPLATE)
        .await
        .map_err(|e| ModswapError::io(format!("writing {}", config_path.display()), e))?;

    ui::step_ok_detail(
        &ctx,
        "Created workspace config",
        &config_path.display().to_string(),
    );

    Ok(())
}

async fn ensure_dir(dir: &Path) -> ModswapResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| ModswapError::io(format!("creating directory {}", dir.display()), e))?;
    }
    Ok(())
}
