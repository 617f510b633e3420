//! CLI module for tablegrid
//!
//! Provides command-line interface for:
//! - serve: Serve configured grid views over HTTP
//! - check: Validate configuration and data

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
