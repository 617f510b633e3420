//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::http::GridServer;
use crate::store::{GridStore, MemoryStore, StoreError};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::Check { config } => check(&config),
    }
}

/// Load config and data, then serve until the process exits
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = AppConfig::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let views = config.build_views()?;
    let store = MemoryStore::load(&config.data)?;
    let server = GridServer::new(config.server.clone(), Arc::new(store), views);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::serve_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Build every view and confirm its collection exists in the data file
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;
    let views = config.build_views()?;
    let store = MemoryStore::load(&config.data)?;

    let mut resources: Vec<_> = views.keys().collect();
    resources.sort();

    let mut missing = Vec::new();
    for resource in resources {
        let view = &views[resource];
        match store.count(view.collection(), None) {
            Ok(rows) => info!(
                resource = %resource,
                collection = view.collection(),
                columns = view.mapping().len(),
                rows,
                "view ok"
            ),
            Err(StoreError::CollectionNotFound(collection)) => {
                warn!(resource = %resource, %collection, "collection missing from data file");
                missing.push(collection);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if !missing.is_empty() {
        return Err(CliError::data_error(format!(
            "collections missing from {}: {}",
            config.data.display(),
            missing.join(", ")
        )));
    }

    println!("{} view(s) ok", views.len());
    Ok(())
}
