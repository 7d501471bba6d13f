//! Tooling & Integration Layer
//!
//! Command-line access to a layered configuration.

pub mod cli;

pub use cli::{Cli, CliContext, Commands, ProfileCommands};
