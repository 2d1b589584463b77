//! Main entry point for the stitchtrack service.
//!
//! This binary serves the garments order-tracking API: order placement,
//! the one-shot approval decision, fulfillment checkpoint recording,
//! and the user/product administration around them. Storage backends
//! are pluggable and selected by configuration.

use clap::Parser;
use stitchtrack_config::Config;
use stitchtrack_core::TrackerEngine;
use stitchtrack_storage::{StorageFactory, StorageService};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the stitchtrack service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the stitchtrack service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Wires the configured storage backend into the engine
/// 5. Serves the API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started stitchtrack");

	// Load configuration
	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path)?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	// Wire up the configured storage backend
	let storage = Arc::new(build_storage(&config)?);
	let engine = Arc::new(TrackerEngine::new(config.clone(), storage));

	// Log lifecycle events as they happen
	tokio::spawn(log_events(Arc::clone(&engine)));

	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);

	if api_enabled {
		let api_config = config.api.as_ref().unwrap().clone();

		tokio::select! {
			result = server::start_server(api_config, Arc::clone(&engine)) => {
				tracing::info!("API server finished");
				result?;
			}
			_ = tokio::signal::ctrl_c() => {}
		}
	} else {
		tracing::warn!("API server disabled - nothing is being served");
		tokio::signal::ctrl_c().await?;
	}

	tracing::info!("Stopped stitchtrack");
	Ok(())
}

/// Creates the storage service named by the configuration.
///
/// The backend is constructed through the registered factory for the
/// configured primary implementation, and its configuration table is
/// validated against the backend's schema before use.
fn build_storage(config: &Config) -> Result<StorageService, Box<dyn std::error::Error>> {
	let factories: HashMap<&'static str, StorageFactory> =
		stitchtrack_storage::get_all_implementations()
			.into_iter()
			.collect();

	let name = config.storage.primary.as_str();
	let factory = factories
		.get(name)
		.ok_or_else(|| format!("Unknown storage backend '{}'", name))?;

	let backend_config = config
		.storage
		.implementations
		.get(name)
		.cloned()
		.unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()));

	let backend = factory(&backend_config)?;
	backend.config_schema().validate(&backend_config)?;

	tracing::info!(component = "storage", implementation = %name, "Loaded");
	Ok(StorageService::new(backend))
}

/// Logs lifecycle events published on the engine's event bus.
async fn log_events(engine: Arc<TrackerEngine>) {
	use tokio::sync::broadcast::error::RecvError;

	let mut receiver = engine.event_bus().subscribe();
	loop {
		match receiver.recv().await {
			Ok(event) => tracing::debug!(event = ?event, "Lifecycle event"),
			Err(RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Event logger fell behind");
			}
			Err(RecvError::Closed) => break,
		}
	}
}
