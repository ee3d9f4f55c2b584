//! `edgepush deploy`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::application::{DeployOptions, DeployUseCase};
use crate::domain::entities::DeploymentResult;
use crate::domain::ports::{DeployEventSink, MultiEventSink};
use crate::infrastructure::{JsonEventSink, TracingEventSink};
use crate::presentation::cli::DeployArgs;
use crate::presentation::factory::create_deploy_use_case;
use crate::presentation::output::wait_to_json;
use crate::runtime_state::{LastDeploy, RuntimeState};

use super::plan::print_plan;
use super::CommandContext;

pub async fn run_deploy(
    ctx: &CommandContext,
    args: &DeployArgs,
    cancel: &CancellationToken,
) -> Result<i32> {
    let options = ctx.deploy_options(&args.target, args.dry_run)?;
    if options.dry_run {
        return print_plan(ctx, &options, cancel).await;
    }

    let use_case = create_deploy_use_case(&ctx.config, &ctx.cwd)?;
    let result = use_case.execute(&options, event_sink(ctx), cancel).await;

    if !ctx.json {
        ctx.print(&ctx.renderer.render_result(&result, &options));
    }

    RuntimeState::load(&ctx.cwd).record_deploy(
        LastDeploy::from_result(&options.namespace, &options.distribution, &result),
        &ctx.cwd,
    );

    if args.wait {
        wait_for_invalidation(
            ctx,
            &use_case,
            &options,
            &result,
            Duration::from_secs(args.wait_timeout),
            cancel,
        )
        .await;
    }

    Ok(result.exit_code())
}

fn event_sink(ctx: &CommandContext) -> Arc<dyn DeployEventSink> {
    let tracing_sink = TracingEventSink::new().detailed(ctx.verbose > 1);
    if ctx.json {
        let sinks: Vec<Arc<dyn DeployEventSink>> =
            vec![Arc::new(JsonEventSink::stdout()), Arc::new(tracing_sink)];
        Arc::new(MultiEventSink::new(sinks))
    } else {
        Arc::new(tracing_sink)
    }
}

/// Wait on the run's batches; not completing in time only warns.
async fn wait_for_invalidation(
    ctx: &CommandContext,
    use_case: &DeployUseCase,
    options: &DeployOptions,
    result: &DeploymentResult,
    timeout: Duration,
    cancel: &CancellationToken,
) {
    let Some(receipt) = &result.invalidation else {
        tracing::debug!("no invalidation to wait for");
        return;
    };
    let Some(coordinator) = use_case.coordinator(options) else {
        return;
    };

    match coordinator
        .wait(&receipt.distribution, &receipt.batch_ids, timeout, cancel)
        .await
    {
        Ok(outcome) => {
            ctx.emit(&wait_to_json("deploy", &receipt.distribution, &outcome));
            ctx.print(&ctx.renderer.render_wait(&outcome));
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not poll invalidation status");
            ctx.emit(&serde_json::json!({
                "event": "warning",
                "command": "deploy",
                "message": format!("could not poll invalidation status: {}", err),
            }));
            if !ctx.json {
                eprintln!("warning: could not poll invalidation status: {}", err);
            }
        }
    }
}
