//! Presentation Layer
//!
//! This layer handles:
//! - CLI argument parsing (via clap)
//! - Creating use cases with infrastructure dependencies
//! - Output formatting (text/JSON)
//!
//! ## Structure
//!
//! - `cli` - Command line definition
//! - `factory` - Wires configured adapters into use cases
//! - `output` - Text and JSON renderers
//! - `terminal` - Color and unicode detection

pub mod cli;
pub mod factory;
pub mod output;
pub mod terminal;

pub use cli::{Cli, ColorWhen, Commands, DeployArgs, StatusArgs, TargetArgs};
pub use factory::{create_deploy_use_case, create_invalidation_coordinator};
pub use output::TextRenderer;
