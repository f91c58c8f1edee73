//! Event types published by the forwarding engine.
//!
//! Registration records are the observable side effect of registering a
//! request type or a domain; consumers subscribe to them through the
//! engine's event bus instead of reading the registries directly.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all forwarder events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwarderEvent {
	/// Events from the type and domain registries.
	Registry(RegistryEvent),
	/// Events from request execution.
	Execution(ExecutionEvent),
}

/// Registration records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
	/// A request type was registered (or registered again).
	RequestTypeRegistered { type_hash: B256, type_str: String },
	/// A domain separator was registered (or registered again).
	///
	/// `domain_value` is the ABI-encoded domain tuple the separator hashes.
	DomainRegistered {
		domain_separator: B256,
		domain_value: Bytes,
	},
}

/// Events related to relayed calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionEvent {
	/// A request passed verification and was dispatched to its target.
	RequestForwarded {
		from: Address,
		to: Address,
		nonce: U256,
		success: bool,
	},
}
