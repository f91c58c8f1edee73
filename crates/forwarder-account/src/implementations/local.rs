//! Local private-key account.
//!
//! Keys live in process memory; suitable for development, tests and
//! relayer-side tooling.

use crate::{AccountError, AccountInterface};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use forwarder_types::{Address, Bytes, SecretString, B256};

/// Implementation name used by [`crate::get_all_implementations`].
pub const NAME: &str = "local";

/// Account backed by an in-memory secp256k1 key.
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a wallet from a hex private key, with or without 0x prefix.
	pub fn new(private_key: &str) -> Result<Self, AccountError> {
		let signer = private_key
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(e.to_string()))?;
		Ok(Self { signer })
	}

	/// Creates a wallet with a freshly generated key.
	pub fn random() -> Self {
		Self {
			signer: PrivateKeySigner::random(),
		}
	}

	/// Address of the wallet.
	pub fn address(&self) -> Address {
		self.signer.address()
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Bytes, AccountError> {
		let signature = self
			.signer
			.sign_hash_sync(hash)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;

		let mut bytes = signature.as_bytes();
		// Some signature encodings carry the bare parity bit
		if bytes[64] < 27 {
			bytes[64] += 27;
		}
		Ok(Bytes::copy_from_slice(&bytes))
	}
}

/// Factory function to create a local account from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 key
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".into()))?;

	Ok(Box::new(LocalWallet::new(private_key.expose_secret())?))
}
