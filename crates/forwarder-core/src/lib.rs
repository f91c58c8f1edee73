//! Core forwarding engine for the meta-transaction forwarder.
//!
//! A signer authorizes a [`ForwardRequest`](forwarder_types::ForwardRequest)
//! off-chain with an EIP-712 signature over a registered request type and
//! domain; a relayer submits it here. The engine checks the domain, the
//! signer's nonce, the request type, the signature and the expiry, then
//! consumes the nonce and dispatches `data || from` to the target through a
//! [`CallHost`](host::CallHost). Targets recover the real sender with the
//! helpers in [`recipient`].

use forwarder_types::{Address, SchemaError, U256};
use thiserror::Error;

pub mod clock;
pub mod engine;
pub mod host;
pub mod nonce;
pub mod recipient;
pub mod registry;
pub mod signature;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{
	context::ExecutionContext, event_bus::EventBus, ForwardingEngine, GasPolicy, SignedRequest,
};
pub use host::{memory::InMemoryHost, CallHost, CallOutcome, CallTarget, HostError, RelayedCall};
pub use recipient::{extract_sender, msg_data, msg_sender, ForwarderAllowList, TrustedForwarder};

/// Reasons a forward request or a registration is rejected.
#[derive(Debug, Error)]
pub enum ForwarderError {
	#[error("Domain separator is not registered")]
	UnregisteredDomain,
	#[error("Request type hash is not registered")]
	UnregisteredRequestType,
	#[error("Nonce mismatch for {signer}: expected {expected}, got {provided}")]
	NonceMismatch {
		signer: Address,
		expected: U256,
		provided: U256,
	},
	#[error("Malformed signature: expected 65 bytes, got {length}")]
	MalformedSignature { length: usize },
	#[error("Signature does not match the request signer")]
	SignatureMismatch,
	#[error("Invalid request type: {0}")]
	InvalidTypeSyntax(#[from] SchemaError),
	#[error("Request expired at {valid_until} (now {now})")]
	RequestExpired { valid_until: U256, now: u64 },
	#[error("Insufficient gas: required {required}, available {available}")]
	InsufficientGas { required: U256, available: U256 },
	#[error("Host error: {0}")]
	Host(String),
}

impl From<HostError> for ForwarderError {
	fn from(err: HostError) -> Self {
		ForwarderError::Host(err.to_string())
	}
}
