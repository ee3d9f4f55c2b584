use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::entities::{DeploymentResult, InvalidationReceipt};
use crate::domain::value_objects::DeployStatus;

/// Directory holding local run state (always excluded from scans)
pub const STATE_DIR: &str = ".edgepush";

const STATE_FILE: &str = "state.json";

/// Runtime state persisted between runs
/// Stored in .edgepush/state.json under the working directory
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeState {
    #[serde(default)]
    pub last_deploy: Option<LastDeploy>,
}

/// Summary of the most recent non-dry-run deploy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastDeploy {
    pub finished_at: DateTime<Utc>,
    pub namespace: String,
    pub distribution: String,
    pub status: DeployStatus,
    /// Invalidation batches submitted by that run
    #[serde(default)]
    pub batch_ids: Vec<String>,
}

impl LastDeploy {
    pub fn from_result(namespace: &str, distribution: &str, result: &DeploymentResult) -> Self {
        Self {
            finished_at: Utc::now(),
            namespace: namespace.to_string(),
            distribution: distribution.to_string(),
            status: result.status,
            batch_ids: result
                .invalidation
                .as_ref()
                .map(|r: &InvalidationReceipt| r.batch_ids.clone())
                .unwrap_or_default(),
        }
    }
}

impl RuntimeState {
    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(STATE_DIR).join(STATE_FILE)
    }

    /// Load state from .edgepush/state.json; missing or corrupt state is empty.
    pub fn load(base_dir: &Path) -> Self {
        let state_file = Self::path(base_dir);
        if state_file.exists() {
            if let Ok(content) = fs::read_to_string(&state_file) {
                if let Ok(state) = serde_json::from_str(&content) {
                    return state;
                }
            }
            tracing::warn!(path = %state_file.display(), "ignoring unreadable run state");
        }
        Self::default()
    }

    /// Save state to .edgepush/state.json
    pub fn save(&self, base_dir: &Path) -> std::io::Result<()> {
        let state_dir = base_dir.join(STATE_DIR);
        fs::create_dir_all(&state_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        let mut tmp = NamedTempFile::new_in(&state_dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(state_dir.join(STATE_FILE))
            .map_err(|e| e.error)?;
        Ok(())
    }

    /// Record a finished deploy and save; failures only warn.
    pub fn record_deploy(&mut self, deploy: LastDeploy, base_dir: &Path) {
        self.last_deploy = Some(deploy);
        if let Err(e) = self.save(base_dir) {
            tracing::warn!(error = %e, "could not save run state");
        }
    }
}
