//! tablegrid CLI entry point
//!
//! Installs logging, then hands off to `cli::run`. Errors are printed to
//! stderr and the process exits non-zero.

use tablegrid::cli;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
