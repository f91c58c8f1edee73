//! Per-signer replay protection.
//!
//! Each signer has a sequential nonce starting at zero. A request is
//! accepted only with the signer's current nonce, which then advances by
//! one. The counter sits behind a per-signer mutex so that a check, the
//! dispatched call and the increment form one unit for that signer while
//! different signers proceed independently.

use crate::ForwarderError;
use dashmap::DashMap;
use forwarder_types::{Address, U256};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Sequential nonces keyed by signer.
#[derive(Debug, Default)]
pub struct NonceTracker {
	nonces: DashMap<Address, Arc<Mutex<U256>>>,
}

/// Exclusive access to one signer's nonce.
pub struct NonceGuard {
	signer: Address,
	nonce: OwnedMutexGuard<U256>,
}

impl NonceGuard {
	pub fn current(&self) -> U256 {
		*self.nonce
	}

	/// Fails with `NonceMismatch` unless `provided` is the current nonce.
	pub fn check(&self, provided: U256) -> Result<(), ForwarderError> {
		if provided != *self.nonce {
			return Err(ForwarderError::NonceMismatch {
				signer: self.signer,
				expected: *self.nonce,
				provided,
			});
		}
		Ok(())
	}

	/// Checks `provided` and advances the nonce, returning the new value.
	pub fn consume(&mut self, provided: U256) -> Result<U256, ForwarderError> {
		self.check(provided)?;
		*self.nonce = provided + U256::from(1);
		Ok(*self.nonce)
	}
}

impl NonceTracker {
	pub fn new() -> Self {
		Self::default()
	}

	fn slot(&self, signer: &Address) -> Arc<Mutex<U256>> {
		self.nonces
			.entry(*signer)
			.or_insert_with(|| Arc::new(Mutex::new(U256::ZERO)))
			.clone()
	}

	/// Takes the signer's exclusive guard, waiting for any holder to finish.
	pub async fn lock(&self, signer: &Address) -> NonceGuard {
		let slot = self.slot(signer);
		NonceGuard {
			signer: *signer,
			nonce: slot.lock_owned().await,
		}
	}

	/// Next nonce expected from `signer`; zero for unseen signers.
	pub async fn current_nonce(&self, signer: &Address) -> U256 {
		let slot = match self.nonces.get(signer) {
			Some(slot) => slot.clone(),
			None => return U256::ZERO,
		};
		let nonce = *slot.lock().await;
		nonce
	}

	/// Checks and advances the signer's nonce in one step.
	pub async fn consume_nonce(
		&self,
		signer: &Address,
		provided: U256,
	) -> Result<U256, ForwarderError> {
		self.lock(signer).await.consume(provided)
	}
}
