//! Forwarder API implementations.
//!
//! Each function takes the engine and a decoded body or path parameter and
//! returns either a response body or an [`APIError`] carrying a stable
//! error code.

pub mod forward;
pub mod registry;

use forwarder_core::ForwarderError;
use forwarder_types::{APIError, Address, B256};

/// Maps an engine rejection to its HTTP error.
pub fn forwarder_error(err: ForwarderError) -> APIError {
	let message = err.to_string();
	match err {
		ForwarderError::MalformedSignature { .. } => APIError::BadRequest {
			error_type: "MALFORMED_SIGNATURE".into(),
			message,
		},
		ForwarderError::InvalidTypeSyntax(_) => APIError::BadRequest {
			error_type: "INVALID_TYPE_SYNTAX".into(),
			message,
		},
		ForwarderError::UnregisteredDomain => rejected("UNREGISTERED_DOMAIN", message, None),
		ForwarderError::UnregisteredRequestType => {
			rejected("UNREGISTERED_REQUEST_TYPE", message, None)
		},
		ForwarderError::NonceMismatch {
			expected, provided, ..
		} => rejected(
			"NONCE_MISMATCH",
			message,
			Some(serde_json::json!({
				"expected": expected.to_string(),
				"provided": provided.to_string(),
			})),
		),
		ForwarderError::SignatureMismatch => rejected("SIGNATURE_MISMATCH", message, None),
		ForwarderError::RequestExpired { valid_until, now } => rejected(
			"REQUEST_EXPIRED",
			message,
			Some(serde_json::json!({
				"validUntilTime": valid_until.to_string(),
				"now": now,
			})),
		),
		ForwarderError::InsufficientGas {
			required,
			available,
		} => rejected(
			"INSUFFICIENT_GAS",
			message,
			Some(serde_json::json!({
				"required": required.to_string(),
				"available": available.to_string(),
			})),
		),
		ForwarderError::Host(_) => APIError::InternalServerError {
			error_type: "HOST_ERROR".into(),
			message,
		},
	}
}

fn rejected(code: &str, message: String, details: Option<serde_json::Value>) -> APIError {
	APIError::UnprocessableEntity {
		error_type: code.to_string(),
		message,
		details,
	}
}

/// Parses a 32-byte hex path parameter.
pub fn parse_hash(value: &str, what: &str) -> Result<B256, APIError> {
	value.parse::<B256>().map_err(|e| APIError::BadRequest {
		error_type: "INVALID_HASH".into(),
		message: format!("Invalid {} '{}': {}", what, value, e),
	})
}

/// Parses a 20-byte hex path parameter.
pub fn parse_address(value: &str) -> Result<Address, APIError> {
	value.parse::<Address>().map_err(|e| APIError::BadRequest {
		error_type: "INVALID_ADDRESS".into(),
		message: format!("Invalid address '{}': {}", value, e),
	})
}
