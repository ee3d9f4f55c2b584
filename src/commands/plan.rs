//! `edgepush plan`: scan and diff without touching the namespace.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::application::DeployOptions;
use crate::error::DeployError;
use crate::presentation::cli::TargetArgs;
use crate::presentation::factory::create_deploy_use_case;
use crate::presentation::output::plan_to_json;

use super::{CommandContext, EXIT_FATAL};

pub async fn run_plan(
    ctx: &CommandContext,
    args: &TargetArgs,
    cancel: &CancellationToken,
) -> Result<i32> {
    let options = ctx.deploy_options(args, true)?;
    print_plan(ctx, &options, cancel).await
}

/// Plan and print; shared with `deploy --dry-run`.
pub(super) async fn print_plan(
    ctx: &CommandContext,
    options: &DeployOptions,
    cancel: &CancellationToken,
) -> Result<i32> {
    let use_case = create_deploy_use_case(&ctx.config, &ctx.cwd)?;

    match use_case.plan(options, cancel).await {
        Ok(outcome) => {
            ctx.emit(&plan_to_json(&outcome, options));
            ctx.print(&ctx.renderer.render_plan(&outcome, options));
            Ok(0)
        }
        Err(err) => {
            report_failure(ctx, "plan", &err);
            Ok(EXIT_FATAL)
        }
    }
}

pub(super) fn report_failure(ctx: &CommandContext, command: &str, err: &DeployError) {
    tracing::error!(kind = %err.kind(), error = %err, "{} aborted", command);
    if ctx.json {
        ctx.emit(&serde_json::json!({
            "event": "error",
            "command": command,
            "kind": err.kind(),
            "message": err.to_string(),
        }));
    } else {
        eprintln!("Error: {}", err);
    }
}
