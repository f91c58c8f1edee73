//! Registry and nonce endpoints.

use super::{forwarder_error, parse_address, parse_hash};
use forwarder_core::ForwardingEngine;
use forwarder_types::{
	APIError, NonceResponse, RegisterDomainRequest, RegisterDomainResponse, RegisterTypeRequest,
	RegisterTypeResponse, RegisteredDomain, RegisteredType,
};
use tracing::info;

/// Registers a request type.
pub async fn register_type(
	engine: &ForwardingEngine,
	request: RegisterTypeRequest,
) -> Result<RegisterTypeResponse, APIError> {
	let record = engine
		.register_type(&request.type_name, &request.type_suffix)
		.await
		.map_err(forwarder_error)?;
	Ok(RegisterTypeResponse {
		type_hash: record.schema_hash,
		type_str: record.full_schema,
	})
}

/// Looks up a request type by hash.
pub async fn get_type(engine: &ForwardingEngine, hash: &str) -> Result<RegisteredType, APIError> {
	let hash = parse_hash(hash, "type hash")?;
	engine
		.get_type(&hash)
		.await
		.ok_or_else(|| APIError::NotFound {
			error_type: "TYPE_NOT_FOUND".into(),
			message: format!("Request type {} is not registered", hash),
		})
}

/// Registers a domain under the forwarder's chain id and address.
pub async fn register_domain(
	engine: &ForwardingEngine,
	request: RegisterDomainRequest,
) -> Result<RegisterDomainResponse, APIError> {
	if request.name.is_empty() || request.version.is_empty() {
		return Err(APIError::BadRequest {
			error_type: "INVALID_DOMAIN".into(),
			message: "Domain name and version must not be empty".into(),
		});
	}

	let record = engine.register_domain(&request.name, &request.version).await;
	let domain_value = forwarder_types::encode_domain(
		&record.name,
		&record.version,
		record.chain_id,
		&record.verifying_contract,
	);
	Ok(RegisterDomainResponse {
		domain_separator: record.domain_separator,
		domain_value: domain_value.into(),
	})
}

/// Looks up a domain by separator.
pub async fn get_domain(
	engine: &ForwardingEngine,
	separator: &str,
) -> Result<RegisteredDomain, APIError> {
	let separator = parse_hash(separator, "domain separator")?;
	engine
		.get_domain(&separator)
		.await
		.ok_or_else(|| APIError::NotFound {
			error_type: "DOMAIN_NOT_FOUND".into(),
			message: format!("Domain {} is not registered", separator),
		})
}

/// Next nonce expected from an address.
pub async fn get_nonce(engine: &ForwardingEngine, address: &str) -> Result<NonceResponse, APIError> {
	let address = parse_address(address)?;
	let nonce = engine.nonce(&address).await;
	info!(%address, %nonce, "Nonce lookup");
	Ok(NonceResponse { address, nonce })
}
