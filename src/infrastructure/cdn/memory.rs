//! In-memory CDN control plane for tests

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::ports::{CdnControlPlane, CdnError, CdnFuture, InvalidationStatus};

/// Paths accepted per request when no limit is configured
pub const DEFAULT_MAX_PATHS: usize = 3000;

#[derive(Debug, Clone)]
struct Batch {
    distribution: String,
    paths: Vec<String>,
    polls: u32,
}

#[derive(Debug, Default)]
struct State {
    batches: HashMap<String, Batch>,
    next_id: u64,
    requests: usize,
    failures_left: u32,
    denied: bool,
}

/// CDN double that records every request
pub struct MemoryCdn {
    state: Mutex<State>,
    max_paths: usize,
    complete_after_polls: u32,
}

impl Default for MemoryCdn {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCdn {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_paths: DEFAULT_MAX_PATHS,
            complete_after_polls: 0,
        }
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths.max(1);
        self
    }

    /// Fail the next `times` submissions with a transient error.
    pub fn fail_next(self, times: u32) -> Self {
        self.state.lock().failures_left = times;
        self
    }

    /// Reject every submission with permission denied.
    pub fn deny(self) -> Self {
        self.state.lock().denied = true;
        self
    }

    /// Report batches as pending for the first `polls` status checks.
    pub fn complete_after_polls(mut self, polls: u32) -> Self {
        self.complete_after_polls = polls;
        self
    }

    /// Accepted submissions.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests
    }

    /// Every path accepted for a distribution, in submission order.
    pub fn invalidated_paths(&self, distribution: &str) -> Vec<String> {
        let state = self.state.lock();
        let mut batches: Vec<(&String, &Batch)> = state
            .batches
            .iter()
            .filter(|(_, b)| b.distribution == distribution)
            .collect();
        batches.sort_by(|a, b| a.0.cmp(b.0));
        batches
            .into_iter()
            .flat_map(|(_, b)| b.paths.iter().cloned())
            .collect()
    }
}

impl CdnControlPlane for MemoryCdn {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn max_paths_per_request(&self) -> usize {
        self.max_paths
    }

    fn invalidate<'a>(
        &'a self,
        distribution: &'a str,
        paths: &'a [String],
    ) -> CdnFuture<'a, String> {
        let result = {
            let mut state = self.state.lock();
            if state.denied {
                Err(CdnError::PermissionDenied(distribution.to_string()))
            } else if state.failures_left > 0 {
                state.failures_left -= 1;
                Err(CdnError::Transient("throttled".to_string()))
            } else if paths.len() > self.max_paths {
                Err(CdnError::TooManyPaths {
                    count: paths.len(),
                    limit: self.max_paths,
                })
            } else {
                state.next_id += 1;
                state.requests += 1;
                let id = format!("INV{:06}", state.next_id);
                state.batches.insert(
                    id.clone(),
                    Batch {
                        distribution: distribution.to_string(),
                        paths: paths.to_vec(),
                        polls: 0,
                    },
                );
                Ok(id)
            }
        };
        Box::pin(async move { result })
    }

    fn invalidation_status<'a>(
        &'a self,
        distribution: &'a str,
        batch_id: &'a str,
    ) -> CdnFuture<'a, InvalidationStatus> {
        let result = {
            let mut state = self.state.lock();
            match state.batches.get_mut(batch_id) {
                Some(batch) if batch.distribution == distribution => {
                    batch.polls += 1;
                    if batch.polls > self.complete_after_polls {
                        Ok(InvalidationStatus::Completed)
                    } else {
                        Ok(InvalidationStatus::Pending)
                    }
                }
                _ => Err(CdnError::UnknownBatch(batch_id.to_string())),
            }
        };
        Box::pin(async move { result })
    }
}
