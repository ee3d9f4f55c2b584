//! Common test utilities for edgepush CLI tests.
//!
//! This module provides:
//! - `TestEnv`: isolated project with a local-directory store and a journal CDN
//! - `TestResult`: captured output of one CLI run

pub mod env;

pub use env::*;
