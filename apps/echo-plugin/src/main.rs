use echo_plugin::echo::EchoObject;
use echo_plugin::error::PluginError;
use echo_plugin::logger::{
    LOG_DIR_ENV, LOG_LEVEL_ENV, initialize as LoggerInitialize, level_from,
};

use plugin_core::PluginServer;
use plugin_core::args::PluginArgs;

use common::ErrorLocation;

use std::env::var;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use log::{error, info};

#[tokio::main]
async fn main() {
    let status = match run().await {
        Ok(status) => status,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            1
        }
    };

    exit(status);
}

async fn run() -> Result<i32, PluginError> {
    let level = level_from(var(LOG_LEVEL_ENV).ok().as_deref());
    let log_dir = var(LOG_DIR_ENV).ok().map(PathBuf::from);

    // Initialize logger FIRST
    LoggerInitialize(level, log_dir.as_deref())?;

    let config = PluginArgs::from_env()
        .map_err(|e| PluginError::Config {
            message: format!("Invalid plugin arguments: {e}"),
            location: ErrorLocation::caller(),
        })?
        .into_config()
        .map_err(|e| PluginError::Config {
            message: e.to_string(),
            location: ErrorLocation::caller(),
        })?;

    info!("Echo plugin starting");

    let mut server = PluginServer::new(config);
    server.register(Arc::new(EchoObject));

    let shutdown = server.run().await.map_err(|e| PluginError::Server {
        message: e.to_string(),
        location: ErrorLocation::caller(),
    })?;

    info!("Echo plugin exiting with status {}", shutdown.status);
    Ok(shutdown.status)
}
