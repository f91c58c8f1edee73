//! Account management for forward request signers.
//!
//! This module provides the client side of the forwarder: accounts that can
//! produce the 65-byte `r || s || v` signatures the forwarding engine
//! recovers, and a request signer that computes the EIP-712 signing hash of
//! a forward request under a registered domain and request type.

use async_trait::async_trait;
use forwarder_types::{Address, Bytes, B256};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

mod signer;

pub use signer::RequestSigner;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when interacting with the account implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for account implementations.
///
/// Implementations sign raw 32-byte digests; the digest is computed by the
/// caller (see [`RequestSigner`]), so an account never needs to know about
/// request types or domains.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Retrieves the address associated with this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a prehashed digest, returning `r || s || v` with `v` in {27, 28}.
	async fn sign_hash(&self, hash: &B256) -> Result<Bytes, AccountError>;
}

/// Type alias for account factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Get all registered account implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::NAME, local::create_account)]
}

/// Service that manages account operations.
///
/// Wraps an underlying account implementation.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Creates an AccountService from a named implementation and its
	/// TOML configuration.
	pub fn from_config(name: &str, config: &toml::Value) -> Result<Self, AccountError> {
		let factory = get_all_implementations()
			.into_iter()
			.find(|(implementation, _)| *implementation == name)
			.map(|(_, factory)| factory)
			.ok_or_else(|| {
				AccountError::Implementation(format!("Unknown account implementation: {}", name))
			})?;
		Ok(Self::new(factory(config)?))
	}

	/// Retrieves the address associated with the managed account.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs a prehashed digest with the managed account.
	pub async fn sign_hash(&self, hash: &B256) -> Result<Bytes, AccountError> {
		self.implementation.sign_hash(hash).await
	}
}
