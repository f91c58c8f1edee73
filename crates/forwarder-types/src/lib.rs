//! Common types module for the meta-transaction forwarder.
//!
//! This module defines the data types shared by the forwarder components:
//! the relayed request itself, registry records, the typed-data encoder and
//! the request schema grammar, events and the HTTP API shapes.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// EIP-712 hashing and encoding helpers.
pub mod eip712;
/// Event types published by the forwarding engine.
pub mod events;
/// Forward request and registry record types.
pub mod request;
/// Request type grammar: base fields plus caller-declared extensions.
pub mod schema;
/// Redacting string wrapper for key material.
pub mod secret_string;
/// Utility functions for common conversions.
pub mod utils;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use api::*;
pub use eip712::{
	compute_domain_separator, compute_final_digest, encode_domain, hash_forward_request,
	forward_request_digest, Eip712AbiEncoder, DOMAIN_TYPE, FORWARD_REQUEST_TYPE_NAME,
	GENERIC_PARAMS,
};
pub use events::*;
pub use request::*;
pub use schema::{FieldDecl, RequestSchema, SchemaError, StructDef};
pub use secret_string::SecretString;
pub use utils::{current_timestamp, truncate_id, with_0x_prefix, without_0x_prefix};
