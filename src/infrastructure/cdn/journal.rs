//! File-journal CDN control plane
//!
//! Records invalidations to `<dir>/<distribution>.json` instead of calling a
//! real CDN. Pairs with the local directory store for previews and CI runs
//! where the "edge" is a directory served by a plain web server.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::ports::{CdnControlPlane, CdnError, CdnFuture, InvalidationStatus};

use super::memory::DEFAULT_MAX_PATHS;

/// One recorded invalidation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalBatch {
    pub id: String,
    pub submitted_at: DateTime<Utc>,
    pub paths: Vec<String>,
}

/// On-disk journal for one distribution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub distribution: String,
    #[serde(default)]
    pub batches: Vec<JournalBatch>,
}

/// Settled batches kept per distribution before the oldest are dropped
pub const DEFAULT_RETAINED_BATCHES: usize = 100;

/// CDN backend that journals invalidations to disk
#[derive(Debug, Clone)]
pub struct JournalCdn {
    dir: PathBuf,
    settle: Duration,
    max_paths: usize,
    retained: usize,
}

impl JournalCdn {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            settle: Duration::ZERO,
            max_paths: DEFAULT_MAX_PATHS,
            retained: DEFAULT_RETAINED_BATCHES,
        }
    }

    /// Report batches as pending until they are this old.
    pub fn with_settle_time(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths.max(1);
        self
    }

    /// Cap on journaled batches; only settled batches are ever dropped.
    pub fn with_retained_batches(mut self, retained: usize) -> Self {
        self.retained = retained.max(1);
        self
    }

    pub fn journal_path(&self, distribution: &str) -> Result<PathBuf, CdnError> {
        validate_distribution(distribution)?;
        Ok(self.dir.join(format!("{}.json", distribution)))
    }

    /// Load the journal of a distribution (empty if never written).
    pub fn load(&self, distribution: &str) -> Result<Journal, CdnError> {
        let path = self.journal_path(distribution)?;
        load_journal(&path, distribution)
    }

    fn append(&self, distribution: &str, paths: &[String]) -> Result<String, CdnError> {
        let path = self.journal_path(distribution)?;
        fs::create_dir_all(&self.dir).map_err(io_error)?;

        let lock_path = self.dir.join(format!("{}.lock", distribution));
        let lock_file = fs::File::create(&lock_path).map_err(io_error)?;
        lock_file.lock_exclusive().map_err(io_error)?;

        let result = (|| -> Result<String, CdnError> {
            let mut journal = load_journal(&path, distribution)?;
            let id = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
            journal.batches.push(JournalBatch {
                id: id.clone(),
                submitted_at: Utc::now(),
                paths: paths.to_vec(),
            });
            self.trim_settled(&mut journal);
            save_journal(&path, &journal)?;
            Ok(id)
        })();

        let _ = lock_file.unlock();
        result
    }

    fn is_settled(&self, batch: &JournalBatch, now: DateTime<Utc>) -> bool {
        let age = now
            .signed_duration_since(batch.submitted_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age >= self.settle
    }

    /// Drop the oldest batches beyond the cap, stopping at the first pending one.
    fn trim_settled(&self, journal: &mut Journal) {
        let now = Utc::now();
        let excess = journal.batches.len().saturating_sub(self.retained);
        let droppable = journal
            .batches
            .iter()
            .take(excess)
            .take_while(|b| self.is_settled(b, now))
            .count();
        if droppable > 0 {
            journal.batches.drain(..droppable);
            tracing::debug!(
                distribution = %journal.distribution,
                dropped = droppable,
                "trimmed journal"
            );
        }
    }

    fn status(&self, distribution: &str, batch_id: &str) -> Result<InvalidationStatus, CdnError> {
        let journal = self.load(distribution)?;
        let batch = journal
            .batches
            .iter()
            .find(|b| b.id == batch_id)
            .ok_or_else(|| CdnError::UnknownBatch(batch_id.to_string()))?;

        if self.is_settled(batch, Utc::now()) {
            Ok(InvalidationStatus::Completed)
        } else {
            Ok(InvalidationStatus::Pending)
        }
    }
}

fn validate_distribution(distribution: &str) -> Result<(), CdnError> {
    let valid = !distribution.is_empty()
        && !distribution.starts_with('.')
        && distribution
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CdnError::UnknownDistribution(distribution.to_string()))
    }
}

fn io_error(err: std::io::Error) -> CdnError {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => CdnError::PermissionDenied(err.to_string()),
        _ => CdnError::Io(err.to_string()),
    }
}

fn load_journal(path: &Path, distribution: &str) -> Result<Journal, CdnError> {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)
            .map_err(|e| CdnError::Io(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Journal {
            distribution: distribution.to_string(),
            batches: Vec::new(),
        }),
        Err(e) => Err(io_error(e)),
    }
}

fn save_journal(path: &Path, journal: &Journal) -> Result<(), CdnError> {
    let dir = path
        .parent()
        .ok_or_else(|| CdnError::Io(format!("{} has no parent", path.display())))?;
    let content = serde_json::to_vec_pretty(journal).map_err(|e| CdnError::Io(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;
    tmp.write_all(&content).map_err(io_error)?;
    tmp.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}

impl CdnControlPlane for JournalCdn {
    fn describe(&self) -> String {
        format!("journal:{}", self.dir.display())
    }

    fn max_paths_per_request(&self) -> usize {
        self.max_paths
    }

    fn invalidate<'a>(
        &'a self,
        distribution: &'a str,
        paths: &'a [String],
    ) -> CdnFuture<'a, String> {
        Box::pin(async move {
            if paths.len() > self.max_paths {
                return Err(CdnError::TooManyPaths {
                    count: paths.len(),
                    limit: self.max_paths,
                });
            }
            let cdn = self.clone();
            let distribution = distribution.to_string();
            let paths = paths.to_vec();
            tokio::task::spawn_blocking(move || cdn.append(&distribution, &paths))
                .await
                .map_err(|e| CdnError::Io(e.to_string()))?
        })
    }

    fn invalidation_status<'a>(
        &'a self,
        distribution: &'a str,
        batch_id: &'a str,
    ) -> CdnFuture<'a, InvalidationStatus> {
        let cdn = self.clone();
        let distribution = distribution.to_string();
        let batch_id = batch_id.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || cdn.status(&distribution, &batch_id))
                .await
                .map_err(|e| CdnError::Io(e.to_string()))?
        })
    }
}
