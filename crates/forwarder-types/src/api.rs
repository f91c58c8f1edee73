//! API types for the forwarder HTTP API.
//!
//! Request and response bodies for the registry, nonce, verify and execute
//! endpoints, plus the error envelope every endpoint returns on failure.

use crate::ForwardRequest;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request for registering a request type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterTypeRequest {
	#[serde(rename = "typeName")]
	pub type_name: String,
	/// Extension suffix closing the primary type, e.g. `bool extra)`.
	#[serde(rename = "typeSuffix", default)]
	pub type_suffix: String,
}

/// Response for a request type registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterTypeResponse {
	#[serde(rename = "typeHash")]
	pub type_hash: B256,
	#[serde(rename = "typeStr")]
	pub type_str: String,
}

/// Request for registering a domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDomainRequest {
	pub name: String,
	pub version: String,
}

/// Response for a domain registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDomainResponse {
	#[serde(rename = "domainSeparator")]
	pub domain_separator: B256,
	#[serde(rename = "domainValue")]
	pub domain_value: Bytes,
}

/// Response for a nonce lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceResponse {
	pub address: Address,
	#[serde(with = "u256_serde")]
	pub nonce: U256,
}

/// A signed forward request together with the context it was signed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedForwardRequest {
	pub request: ForwardRequest,
	#[serde(rename = "domainSeparator")]
	pub domain_separator: B256,
	#[serde(rename = "requestTypeHash")]
	pub request_type_hash: B256,
	/// Encoded extension fields; empty for the base request type.
	#[serde(rename = "suffixData", default)]
	pub suffix_data: Bytes,
	pub signature: Bytes,
}

/// Response for a successful verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
	pub valid: bool,
}

/// Request for executing a signed forward request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
	#[serde(flatten)]
	pub signed: SignedForwardRequest,
	/// Gas the relayer supplies to the top-level call.
	#[serde(rename = "gasLimit")]
	pub gas_limit: u64,
	/// Account paying the attached value; must be one of the configured
	/// API relayers when `value` is non-zero.
	#[serde(default)]
	pub relayer: Address,
	/// Native value attached to the execution.
	#[serde(default, with = "u256_serde")]
	pub value: U256,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed input (400)
	BadRequest { error_type: String, message: String },
	/// Well-formed request rejected by the forwarder (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Caller may not perform the operation (403)
	Forbidden { error_type: String, message: String },
	/// Unknown registry entry (404)
	NotFound { error_type: String, message: String },
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Forbidden { .. } => 403,
			APIError::NotFound { .. } => 404,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: details.clone(),
			},
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::Forbidden {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{
			http::StatusCode,
			response::{IntoResponse, Json},
		};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

/// Serde module for U256 as a decimal string.
///
/// Deserialization also accepts `0x`-prefixed hex, which is what most
/// signing tools emit for numeric fields.
pub mod u256_serde {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		match s.strip_prefix("0x") {
			Some(hex) => U256::from_str_radix(hex, 16),
			None => U256::from_str_radix(&s, 10),
		}
		.map_err(D::Error::custom)
	}
}
