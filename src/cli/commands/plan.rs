//! Plan command - run a session against a workspace manifest

use crate::cli::args::{OutputFormat, PlanArgs};
use crate::config::Config;
use crate::error::ModswapResult;
use crate::model::Workspace;
use crate::session::{Session, SessionReport};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the plan command
pub async fn execute(args: PlanArgs, config: &Config) -> ModswapResult<()> {
    let mut workspace = Workspace::load(&args.workspace)?;
    let mut session = Session::open(config.clone(), workspace.base_dir());
    let report = session.run(&mut workspace, args.tasks.as_slice()).await?;

    if let Some(output) = &args.output {
        workspace.save(output)?;
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            print_report(&report, &workspace);
            if let Some(output) = &args.output {
                let ctx = UiContext::detect();
                ui::step_ok_detail(&ctx, "Wrote rewritten workspace", &output.display().to_string());
            }
        }
    }

    Ok(())
}

fn print_report(report: &SessionReport, workspace: &Workspace) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Substitution plan");

    if !report.triggered {
        ui::step_warn_hint(
            &ctx,
            "Substitution not triggered",
            "check general.enabled and general.detect_launcher",
        );
        return;
    }

    if let Some(probe) = &report.probe {
        ui::section(&ctx, "Cache");
        for module in &probe.valid {
            ui::step_ok(&ctx, &format!("{} cached", module));
        }
        for module in &probe.invalid {
            ui::step_warn(&ctx, &format!("{} stale", module));
        }
        if let Some(skippable) = probe.annotation_processing_skippable {
            ui::key_value(
                &ctx,
                "annotation processing",
                if skippable { "skippable" } else { "required" },
            );
        }
    }

    if !report.builds.is_empty() {
        ui::section(&ctx, "Build from source");
        for request in &report.builds {
            ui::step_info(
                &ctx,
                &format!("{} ({})", request.module, style(request.assemble_task()).dim()),
            );
        }
    }

    if let Some(rewrite) = &report.rewrite {
        if !rewrite.substituted.is_empty() {
            ui::section(&ctx, "Substituted");
            for sub in &rewrite.substituted {
                ui::step_ok(
                    &ctx,
                    &format!("{}:{} {} -> {}", sub.consumer, sub.bucket, sub.module, sub.artifact),
                );
            }
        }
        if !rewrite.normalized.is_empty() {
            ui::section(&ctx, "Local files");
            for file in &rewrite.normalized {
                ui::step_ok(
                    &ctx,
                    &format!("{}:{} {} -> {}", file.project, file.bucket, file.file.display(), file.artifact),
                );
            }
        }
        for abandoned in &rewrite.abandoned {
            ui::step_warn_hint(
                &ctx,
                &format!("{}:{} {}", abandoned.project, abandoned.bucket, abandoned.operation),
                &abandoned.reason,
            );
        }

        ui::section(&ctx, "Rewritten graph");
        print_graph(workspace);

        println!();
        println!(
            "{} substituted, {} leak copies, {} declaration change(s) in {}ms",
            rewrite.substituted.len(),
            rewrite.leaked.len(),
            rewrite.mutations,
            report.duration_ms
        );
    }
}

fn print_graph(workspace: &Workspace) {
    for (path, project) in &workspace.projects {
        if project.buckets.values().all(|b| b.dependencies.is_empty()) {
            continue;
        }
        println!("  {}", style(path).bold());
        for (name, bucket) in &project.buckets {
            for dependency in &bucket.dependencies {
                println!("    {:<28} {}", style(name).dim(), dependency);
            }
        }
    }
}
