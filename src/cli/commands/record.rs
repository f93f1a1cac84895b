//! Record command - collect a built artifact

use crate::cli::args::RecordArgs;
use crate::config::Config;
use crate::error::ModswapResult;
use crate::model::Workspace;
use crate::session::Session;
use crate::ui::{self, UiContext};

/// Execute the record command
pub async fn execute(args: RecordArgs, config: &Config) -> ModswapResult<()> {
    let ctx = UiContext::detect();
    let workspace = Workspace::load(&args.workspace)?;
    let mut session = Session::open(config.clone(), workspace.base_dir());
    session.register(&workspace);

    if let (Some(module), Some(artifact)) = (&args.module, &args.artifact) {
        let installed = session.record_build(module, artifact)?;
        ui::step_ok_detail(
            &ctx,
            &format!("Recorded {}", module),
            &installed.display().to_string(),
        );
    }

    if args.root {
        session.record_root(&workspace)?;
        ui::step_ok(&ctx, &format!("Recorded root project {}", workspace.root));
    }

    session.persist()
}
