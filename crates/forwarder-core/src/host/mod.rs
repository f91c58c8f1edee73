//! Call substrate the forwarder dispatches through.
//!
//! The engine does not execute target code itself. It hands a
//! [`RelayedCall`] to a [`CallHost`], which moves value, runs the target and
//! reports whether the target succeeded. A target failing is a normal
//! outcome; a [`HostError`] means the substrate itself could not serve the
//! request.

pub mod memory;

use async_trait::async_trait;
use forwarder_types::{Address, Bytes, U256};
use thiserror::Error;

/// Errors raised by the call substrate.
#[derive(Debug, Error)]
pub enum HostError {
	#[error("Insufficient balance for {account}: required {required}, available {available}")]
	InsufficientBalance {
		account: Address,
		required: U256,
		available: U256,
	},
	#[error("Host unavailable: {0}")]
	Unavailable(String),
}

/// A call made by the forwarder on behalf of a signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedCall {
	/// Immediate caller as seen by the target; the forwarder address.
	pub caller: Address,
	pub target: Address,
	pub value: U256,
	/// Gas bound for the call.
	pub gas: U256,
	/// `data || from`.
	pub payload: Bytes,
}

/// What the target returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallOutcome {
	pub success: bool,
	pub return_data: Bytes,
}

impl CallOutcome {
	pub fn success(return_data: impl Into<Bytes>) -> Self {
		Self {
			success: true,
			return_data: return_data.into(),
		}
	}

	pub fn revert(return_data: impl Into<Bytes>) -> Self {
		Self {
			success: false,
			return_data: return_data.into(),
		}
	}
}

/// Contract code reachable through a host.
pub trait CallTarget: Send + Sync {
	fn call(&self, call: &RelayedCall) -> CallOutcome;
}

/// Trait defining the interface for call substrates.
#[async_trait]
pub trait CallHost: Send + Sync {
	/// Executes `call`, moving `call.value` from caller to target.
	///
	/// If the target fails, the value transfer is undone and the outcome
	/// reports `success == false`.
	async fn call(&self, call: RelayedCall) -> Result<CallOutcome, HostError>;

	/// Native balance of `account`.
	async fn balance_of(&self, account: &Address) -> Result<U256, HostError>;

	/// Moves `amount` of native value between accounts.
	async fn transfer(&self, from: &Address, to: &Address, amount: U256) -> Result<(), HostError>;
}
