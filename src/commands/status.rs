//! `edgepush status`: poll invalidation batches.
//!
//! Without flags it checks the batches recorded by the last deploy in this
//! directory.

use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::config::ConfigError;
use crate::error::DeployError;
use crate::presentation::cli::StatusArgs;
use crate::presentation::factory::create_invalidation_coordinator;
use crate::presentation::output::{status_to_json, wait_to_json};
use crate::runtime_state::RuntimeState;

use super::plan::report_failure;
use super::{CommandContext, EXIT_FATAL};

/// Distribution and batches to check
#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusTarget {
    distribution: String,
    batch_ids: Vec<String>,
}

/// Flags first, then the last recorded deploy.
fn resolve_target(args: &StatusArgs, state: &RuntimeState) -> Result<StatusTarget, ConfigError> {
    let last = state.last_deploy.as_ref();

    let distribution = args
        .distribution
        .clone()
        .or_else(|| last.map(|d| d.distribution.clone()))
        .filter(|d| !d.is_empty())
        .ok_or_else(|| {
            ConfigError::Missing("--distribution (no deploy recorded here)".to_string())
        })?;

    let batch_ids = if !args.batches.is_empty() {
        args.batches.clone()
    } else {
        last.filter(|d| d.distribution == distribution)
            .map(|d| d.batch_ids.clone())
            .unwrap_or_default()
    };

    Ok(StatusTarget {
        distribution,
        batch_ids,
    })
}

pub async fn run_status(
    ctx: &CommandContext,
    args: &StatusArgs,
    cancel: &CancellationToken,
) -> Result<i32> {
    let state = RuntimeState::load(&ctx.cwd);
    let target = resolve_target(args, &state)?;

    if target.batch_ids.is_empty() {
        ctx.emit(&status_to_json(&target.distribution, &[]));
        ctx.print(&format!(
            "No invalidation batches recorded for '{}'\n",
            target.distribution
        ));
        return Ok(0);
    }

    let coordinator = create_invalidation_coordinator(&ctx.config, &ctx.cwd).ok_or_else(|| {
        ConfigError::Unsupported("cdn.backend = \"none\" has no invalidation status".to_string())
    })?;

    if args.wait {
        let outcome = coordinator
            .wait(
                &target.distribution,
                &target.batch_ids,
                Duration::from_secs(args.timeout),
                cancel,
            )
            .await;
        match outcome {
            Ok(outcome) => {
                ctx.emit(&wait_to_json("status", &target.distribution, &outcome));
                ctx.print(&ctx.renderer.render_wait(&outcome));
            }
            Err(err) => {
                report_failure(ctx, "status", &DeployError::Cdn(err));
                return Ok(EXIT_FATAL);
            }
        }
    }

    match coordinator
        .status(&target.distribution, &target.batch_ids, cancel)
        .await
    {
        Ok(statuses) => {
            ctx.emit(&status_to_json(&target.distribution, &statuses));
            ctx.print(&ctx.renderer.render_status(&target.distribution, &statuses));
            Ok(0)
        }
        Err(err) => {
            report_failure(ctx, "status", &DeployError::Cdn(err));
            Ok(EXIT_FATAL)
        }
    }
}
