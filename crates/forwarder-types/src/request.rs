//! Forward request and registry record types.
//!
//! A forward request is the message a signer authorizes off-chain; the
//! registry records describe the request types and domains an engine has
//! accepted so far.

use crate::api::u256_serde;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A caller-signed request to be relayed to `to` on behalf of `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
	/// Signer of the request; must match the recovered address.
	pub from: Address,
	/// Target of the relayed call.
	pub to: Address,
	/// Native value forwarded with the call.
	#[serde(with = "u256_serde")]
	pub value: U256,
	/// Gas budget for the relayed call.
	#[serde(with = "u256_serde")]
	pub gas: U256,
	/// Signer nonce this request consumes.
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	/// Call payload, before the signer address is appended.
	pub data: Bytes,
	/// Expiry timestamp in seconds; zero means the request never expires.
	#[serde(with = "u256_serde")]
	pub valid_until_time: U256,
}

impl ForwardRequest {
	/// Whether the request is expired at `now` (seconds).
	///
	/// A request is valid strictly before its `valid_until_time`.
	pub fn is_expired_at(&self, now: u64) -> bool {
		!self.valid_until_time.is_zero() && self.valid_until_time <= U256::from(now)
	}

	/// Payload delivered to the target: `data || from`.
	pub fn relayed_calldata(&self) -> Bytes {
		let mut payload = Vec::with_capacity(self.data.len() + 20);
		payload.extend_from_slice(&self.data);
		payload.extend_from_slice(self.from.as_slice());
		payload.into()
	}
}

/// A request type accepted by the type registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredType {
	/// Full canonical schema string, base fields included.
	pub full_schema: String,
	/// keccak256 of `full_schema`.
	pub schema_hash: B256,
}

/// A domain accepted by the domain registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredDomain {
	pub name: String,
	pub version: String,
	#[serde(with = "u256_serde")]
	pub chain_id: U256,
	pub verifying_contract: Address,
	pub domain_separator: B256,
}

/// Outcome of a dispatched request.
///
/// `success == false` means the target itself reverted; the request was
/// still authorized and its nonce consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
	pub success: bool,
	pub return_data: Bytes,
	/// Signer nonce after the request was consumed.
	#[serde(with = "u256_serde")]
	pub nonce: U256,
}
