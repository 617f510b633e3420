//! CLI argument definitions using clap
//!
//! Commands:
//! - tablegrid serve --config <path>
//! - tablegrid check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tablegrid - server-side processing for tabular grid views
#[derive(Parser, Debug)]
#[command(name = "tablegrid")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the configured grid views over HTTP
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./tablegrid.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Build every configured view and report configuration errors
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./tablegrid.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["tablegrid", "serve"]).unwrap();
        match cli.command {
            Command::Serve { config, port } => {
                assert_eq!(config, PathBuf::from("./tablegrid.json"));
                assert_eq!(port, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_check_with_config() {
        let cli = Cli::try_parse_from(["tablegrid", "check", "--config", "/etc/grid.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Check { config } if config == PathBuf::from("/etc/grid.json")
        ));
    }
}
