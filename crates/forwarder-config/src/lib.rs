//! Configuration module for the forwarder service.
//!
//! Loads the forwarder identity (chain id and verifying-contract address),
//! the domains and request types to register at startup, the gas reserves
//! enforced before dispatch, initial balances for the in-memory host and the
//! HTTP API settings. Configuration is TOML with `${VAR}` / `${VAR:-default}`
//! environment substitution and is validated on parse.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use forwarder_types::{Address, U256};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the forwarder.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this forwarder deployment.
	pub forwarder: ForwarderConfig,
	/// Domains registered at startup.
	#[serde(default)]
	pub domains: Vec<DomainEntry>,
	/// Request types registered at startup, in addition to `ForwardRequest`.
	#[serde(default)]
	pub request_types: Vec<RequestTypeEntry>,
	/// In-memory call host settings.
	#[serde(default)]
	pub host: HostConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Identity and gas policy of the forwarder.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForwarderConfig {
	/// Unique identifier for this forwarder instance, used in logs.
	pub id: String,
	/// Chain id bound into every domain separator.
	pub chain_id: u64,
	/// Address of the forwarder; the `verifyingContract` of its domains.
	pub address: Address,
	/// Gas kept back for bookkeeping after the relayed call returns.
	#[serde(default = "default_post_call_reserve")]
	pub post_call_reserve: u64,
	/// Extra gas required when the request forwards value.
	#[serde(default = "default_value_transfer_reserve")]
	pub value_transfer_reserve: u64,
}

fn default_post_call_reserve() -> u64 {
	10_000
}

fn default_value_transfer_reserve() -> u64 {
	40_000
}

/// A domain to register at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainEntry {
	pub name: String,
	pub version: String,
}

/// A request type to register at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestTypeEntry {
	pub name: String,
	/// Extension suffix, e.g. `bool extra)`; empty for no extensions.
	#[serde(default)]
	pub suffix: String,
}

/// Settings for the in-memory call host.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HostConfig {
	/// Initial native balances as address -> decimal amount.
	#[serde(default)]
	pub balances: HashMap<String, String>,
}

impl HostConfig {
	/// Parses the configured balances.
	pub fn initial_balances(&self) -> Result<Vec<(Address, U256)>, ConfigError> {
		self.balances
			.iter()
			.map(|(address, amount)| {
				let address = address.parse::<Address>().map_err(|e| {
					ConfigError::Validation(format!("Invalid balance address '{}': {}", address, e))
				})?;
				let amount = U256::from_str_radix(amount, 10).map_err(|e| {
					ConfigError::Validation(format!(
						"Invalid balance for {}: '{}' ({})",
						address, amount, e
					))
				})?;
				Ok((address, amount))
			})
			.collect()
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// Accounts whose host balance API callers may attach to an execution.
	/// Executions without attached value are open to any caller.
	#[serde(default)]
	pub relayers: Vec<Address>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};
		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration:
	/// - forwarder id is not empty, chain id is non-zero, address is non-zero
	/// - domains have a name and version and are unique per (name, version)
	/// - request type entries have a name
	/// - host balances parse
	/// - an enabled API binds to a non-zero port
	fn validate(&self) -> Result<(), ConfigError> {
		if self.forwarder.id.is_empty() {
			return Err(ConfigError::Validation("Forwarder ID cannot be empty".into()));
		}
		if self.forwarder.chain_id == 0 {
			return Err(ConfigError::Validation(
				"Forwarder chain_id must be greater than 0".into(),
			));
		}
		if self.forwarder.address == Address::ZERO {
			return Err(ConfigError::Validation(
				"Forwarder address cannot be the zero address".into(),
			));
		}

		let mut seen = HashSet::new();
		for domain in &self.domains {
			if domain.name.is_empty() || domain.version.is_empty() {
				return Err(ConfigError::Validation(
					"Domain entries must have a name and a version".into(),
				));
			}
			if !seen.insert((domain.name.as_str(), domain.version.as_str())) {
				return Err(ConfigError::Validation(format!(
					"Duplicate domain '{}' version '{}'",
					domain.name, domain.version
				)));
			}
		}

		if self.request_types.iter().any(|t| t.name.is_empty()) {
			return Err(ConfigError::Validation(
				"Request type entries must have a name".into(),
			));
		}

		self.host.initial_balances()?;

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation(
					"API port must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating
/// the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
