//! Main entry point for the forwarder service.
//!
//! Loads a configuration, builds a forwarding engine over the in-memory
//! call host, registers the configured domains and request types and
//! serves the HTTP API until interrupted.

use clap::Parser;
use forwarder_config::Config;
use forwarder_core::{ForwardingEngine, InMemoryHost, SystemClock};
use forwarder_types::{ExecutionEvent, ForwarderEvent, RegistryEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

mod apis;
mod server;

/// Command-line arguments for the forwarder service.
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

	tracing::info!("Started forwarder");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.forwarder.id);

	let engine = build_engine(&config).await?;
	tokio::spawn(log_events(engine.subscribe()));

	match config.api.clone() {
		Some(api_config) if api_config.enabled => {
			tokio::select! {
				result = server::start_server(api_config, engine) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Received interrupt");
				}
			}
		},
		_ => {
			tracing::info!("API disabled; running engine only");
			tokio::signal::ctrl_c().await?;
		},
	}

	tracing::info!("Stopped forwarder");
	Ok(())
}

/// Builds the engine described by `config` over a fresh in-memory host.
async fn build_engine(config: &Config) -> Result<Arc<ForwardingEngine>, Box<dyn std::error::Error>> {
	let host = Arc::new(InMemoryHost::with_balances(
		config.host.initial_balances()?,
	));
	let engine = ForwardingEngine::from_config(config, host, Arc::new(SystemClock)).await?;

	tracing::info!(
		address = %engine.address(),
		chain_id = %engine.chain_id(),
		"Forwarder ready with {} domain(s) and {} request type(s)",
		engine.domains().await.len(),
		engine.types().await.len()
	);

	Ok(Arc::new(engine))
}

/// Logs every event published by the engine until the bus closes.
async fn log_events(mut events: broadcast::Receiver<ForwarderEvent>) {
	loop {
		match events.recv().await {
			Ok(ForwarderEvent::Registry(RegistryEvent::RequestTypeRegistered {
				type_hash,
				type_str,
			})) => {
				tracing::info!(%type_hash, "RequestTypeRegistered {}", type_str);
			},
			Ok(ForwarderEvent::Registry(RegistryEvent::DomainRegistered {
				domain_separator,
				..
			})) => {
				tracing::info!(%domain_separator, "DomainRegistered");
			},
			Ok(ForwarderEvent::Execution(ExecutionEvent::RequestForwarded {
				from,
				to,
				nonce,
				success,
			})) => {
				tracing::info!(%from, %to, %nonce, success, "RequestForwarded");
			},
			Err(broadcast::error::RecvError::Lagged(skipped)) => {
				tracing::warn!("Event logger lagged; skipped {} events", skipped);
			},
			Err(broadcast::error::RecvError::Closed) => break,
		}
	}
}
