//! Output Rendering
//!
//! Text renderers return strings so commands decide where they go and tests
//! can snapshot them. JSON renderers build `serde_json::Value`s in the same
//! shape as the NDJSON deploy events.

use std::fmt::Write as _;

use crossterm::style::{Color, Stylize};

use crate::application::{DeployOptions, PlanOutcome, WaitOutcome};
use crate::config::ConfigWarning;
use crate::domain::entities::DeploymentResult;
use crate::domain::ports::InvalidationStatus;
use crate::domain::value_objects::{DeployStatus, InvalidationPaths, ObjectKey};

/// Status glyphs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Success,
    Error,
    Warning,
    Pending,
    Upload,
    Delete,
}

impl Icon {
    pub fn render(&self, unicode: bool) -> &'static str {
        match (unicode, self) {
            (true, Icon::Success) => "✓",
            (true, Icon::Error) => "✗",
            (true, Icon::Warning) => "⚠",
            (true, Icon::Pending) => "○",
            (false, Icon::Success) => "[OK]",
            (false, Icon::Error) => "[FAIL]",
            (false, Icon::Warning) => "[WARN]",
            (false, Icon::Pending) => "[..]",
            (_, Icon::Upload) => "+",
            (_, Icon::Delete) => "-",
        }
    }

    fn color(&self) -> Color {
        match self {
            Icon::Success | Icon::Upload => Color::Green,
            Icon::Error | Icon::Delete => Color::Red,
            Icon::Warning => Color::Yellow,
            Icon::Pending => Color::DarkGrey,
        }
    }
}

/// Human-readable renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRenderer {
    pub color: bool,
    pub unicode: bool,
    pub verbose: u8,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            color: false,
            unicode: true,
            verbose: 0,
        }
    }
}

impl TextRenderer {
    pub fn new(color: bool, unicode: bool, verbose: u8) -> Self {
        Self {
            color,
            unicode,
            verbose,
        }
    }

    fn icon(&self, icon: Icon) -> String {
        let s = icon.render(self.unicode);
        if self.color {
            format!("{}", s.with(icon.color()))
        } else {
            s.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            format!("{}", text.bold())
        } else {
            text.to_string()
        }
    }

    fn key_list(&self, out: &mut String, title: &str, icon: Icon, keys: &[&ObjectKey]) {
        if keys.is_empty() {
            return;
        }
        let _ = writeln!(out, "  {} ({}):", title, keys.len());
        for key in keys {
            let _ = writeln!(out, "    {} {}", self.icon(icon), key);
        }
    }

    /// Dry-run plan.
    pub fn render_plan(&self, outcome: &PlanOutcome, options: &DeployOptions) -> String {
        let plan = &outcome.plan;
        let mut out = String::new();

        let _ = writeln!(
            out,
            "{} {} -> {}",
            self.bold("Plan"),
            options.source.display(),
            options.namespace
        );
        let _ = writeln!(
            out,
            "  {} local, {} remote, prune {}",
            outcome.assets.len(),
            outcome.remote.len(),
            if plan.prune { "on" } else { "off" }
        );
        let _ = writeln!(out);

        let upload: Vec<&ObjectKey> = plan.to_upload.iter().collect();
        let delete: Vec<&ObjectKey> = plan.to_delete.iter().collect();
        self.key_list(&mut out, "Upload", Icon::Upload, &upload);
        self.key_list(&mut out, "Delete", Icon::Delete, &delete);
        let _ = writeln!(out, "  Unchanged: {}", plan.unchanged.len());
        if !plan.retained.is_empty() {
            let _ = writeln!(out, "  Retained (prune off): {}", plan.retained.len());
            if self.verbose > 0 {
                for key in &plan.retained {
                    let _ = writeln!(out, "    {}", key);
                }
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  Invalidate on '{}': {}",
            options.distribution,
            describe_paths(&plan.invalidation)
        );

        if !outcome.duplicates.is_empty() {
            let _ = writeln!(
                out,
                "  {} {} group(s) of identical files",
                self.icon(Icon::Warning),
                outcome.duplicates.len()
            );
            if self.verbose > 0 {
                for group in &outcome.duplicates {
                    let keys: Vec<&str> = group.keys.iter().map(ObjectKey::as_str).collect();
                    let _ = writeln!(out, "    {}: {}", group.fingerprint.short(), keys.join(", "));
                }
            }
        }

        if plan.is_noop() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{} Already up to date", self.icon(Icon::Success));
        }
        out
    }

    /// Summary of a finished deploy.
    pub fn render_result(&self, result: &DeploymentResult, options: &DeployOptions) -> String {
        let mut out = String::new();

        let (icon, headline) = match result.status {
            DeployStatus::Succeeded if !result.has_changes() => (Icon::Success, "Already up to date"),
            DeployStatus::Succeeded => (Icon::Success, "Deploy complete"),
            DeployStatus::PartiallyFailed => (Icon::Warning, "Deploy partially failed"),
            DeployStatus::Failed => (Icon::Error, "Deploy failed"),
            DeployStatus::Cancelled => (Icon::Error, "Deploy cancelled"),
        };
        let _ = writeln!(out, "{} {}", self.icon(icon), self.bold(headline));
        let _ = writeln!(
            out,
            "  {} -> {}",
            options.source.display(),
            options.namespace
        );
        let _ = writeln!(
            out,
            "  {} uploaded, {} deleted, {} unchanged, {} retained ({:.1}s)",
            result.uploaded_count(),
            result.deleted_count(),
            result.skipped,
            result.retained,
            result.elapsed.as_secs_f64()
        );

        if self.verbose > 0 {
            let uploaded: Vec<&ObjectKey> = result.uploaded.iter().collect();
            let deleted: Vec<&ObjectKey> = result.deleted.iter().collect();
            self.key_list(&mut out, "Uploaded", Icon::Upload, &uploaded);
            self.key_list(&mut out, "Deleted", Icon::Delete, &deleted);
        }

        if let Some(receipt) = &result.invalidation {
            let _ = writeln!(
                out,
                "  Invalidation {} on '{}' ({} path(s))",
                receipt.batch_ids.join(", "),
                receipt.distribution,
                receipt.paths.len()
            );
        }

        if let Some(failure) = &result.failure {
            let _ = writeln!(
                out,
                "  {} {} during {}: {}",
                self.icon(Icon::Error),
                failure.kind.as_str(),
                failure.phase,
                failure.message
            );
        }

        if !result.errors.is_empty() {
            let _ = writeln!(out, "  Errors ({}):", result.errors.len());
            for error in &result.errors {
                let _ = writeln!(
                    out,
                    "    {} {} {} [{}] after {} attempt(s): {}",
                    self.icon(Icon::Error),
                    error.operation.as_str(),
                    error.key,
                    error.kind.as_str(),
                    error.attempts,
                    error.message
                );
            }
        }

        for warning in &result.warnings {
            let _ = writeln!(out, "  {} {}", self.icon(Icon::Warning), warning);
        }
        out
    }

    /// One line per batch.
    pub fn render_status(
        &self,
        distribution: &str,
        statuses: &[(String, InvalidationStatus)],
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Distribution {}", distribution);
        for (batch_id, status) in statuses {
            let icon = match status {
                InvalidationStatus::Completed => Icon::Success,
                InvalidationStatus::Pending => Icon::Pending,
            };
            let _ = writeln!(out, "  {} {} {}", self.icon(icon), batch_id, status);
        }
        out
    }

    pub fn render_wait(&self, outcome: &WaitOutcome) -> String {
        match outcome {
            WaitOutcome::Completed => {
                format!("{} Invalidation completed\n", self.icon(Icon::Success))
            }
            WaitOutcome::TimedOut { pending } => format!(
                "{} Still propagating: {}\n",
                self.icon(Icon::Warning),
                pending.join(", ")
            ),
            WaitOutcome::Cancelled { pending } => format!(
                "{} Stopped waiting: {}\n",
                self.icon(Icon::Warning),
                pending.join(", ")
            ),
        }
    }

    pub fn render_config_warnings(&self, warnings: &[ConfigWarning]) -> String {
        let mut out = String::new();
        for warning in warnings {
            let _ = writeln!(out, "{} {}", self.icon(Icon::Warning), warning);
        }
        out
    }
}

fn describe_paths(paths: &InvalidationPaths) -> String {
    match paths {
        InvalidationPaths::Nothing => "nothing".to_string(),
        InvalidationPaths::Wildcard => "/* (wildcard)".to_string(),
        InvalidationPaths::Explicit(paths) => paths.join(" "),
    }
}

/// Plan as a single JSON object.
pub fn plan_to_json(outcome: &PlanOutcome, options: &DeployOptions) -> serde_json::Value {
    let plan = &outcome.plan;
    serde_json::json!({
        "event": "plan",
        "command": "plan",
        "source": options.source.display().to_string(),
        "namespace": options.namespace,
        "distribution": options.distribution,
        "prune": plan.prune,
        "local_count": outcome.assets.len(),
        "remote_count": outcome.remote.len(),
        "to_upload": plan.to_upload,
        "to_delete": plan.to_delete,
        "unchanged": plan.unchanged,
        "retained": plan.retained,
        "invalidation": plan.invalidation.to_paths(),
        "duplicates": outcome.duplicates,
    })
}

pub fn status_to_json(
    distribution: &str,
    statuses: &[(String, InvalidationStatus)],
) -> serde_json::Value {
    let batches: Vec<serde_json::Value> = statuses
        .iter()
        .map(|(id, status)| serde_json::json!({ "batch_id": id, "status": status }))
        .collect();
    serde_json::json!({
        "event": "status",
        "command": "status",
        "distribution": distribution,
        "batches": batches,
    })
}

pub fn wait_to_json(command: &str, distribution: &str, outcome: &WaitOutcome) -> serde_json::Value {
    let (state, pending): (&str, &[String]) = match outcome {
        WaitOutcome::Completed => ("completed", &[]),
        WaitOutcome::TimedOut { pending } => ("timed_out", pending),
        WaitOutcome::Cancelled { pending } => ("cancelled", pending),
    };
    serde_json::json!({
        "event": "wait",
        "command": command,
        "distribution": distribution,
        "outcome": state,
        "pending": pending,
    })
}

/// Write one NDJSON line.
pub fn write_event(out: &mut impl std::io::Write, event: &serde_json::Value) -> std::io::Result<()> {
    let line = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}
