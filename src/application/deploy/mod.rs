//! Deploy Use Case Module
//!
//! Orchestrates a deployment run: scan and list in parallel, diff, sync,
//! invalidate.

mod options;
mod use_case;

pub use options::DeployOptions;
pub use use_case::{DeployUseCase, PlanOutcome};

#[cfg(test)]
mod tests;
