//! Verify and execute endpoints.

use super::forwarder_error;
use forwarder_core::{ExecutionContext, ForwardingEngine, SignedRequest};
use forwarder_types::{
	APIError, Address, ExecuteRequest, ExecutionResult, SignedForwardRequest, VerifyResponse,
};
use std::collections::HashSet;

fn signed(body: &SignedForwardRequest) -> SignedRequest<'_> {
	SignedRequest {
		request: &body.request,
		domain_separator: &body.domain_separator,
		request_type_hash: &body.request_type_hash,
		suffix_data: &body.suffix_data,
		signature: &body.signature,
	}
}

/// Checks a signed request without executing it.
pub async fn verify(
	engine: &ForwardingEngine,
	body: SignedForwardRequest,
) -> Result<VerifyResponse, APIError> {
	engine
		.verify(signed(&body))
		.await
		.map_err(forwarder_error)?;
	Ok(VerifyResponse { valid: true })
}

/// Executes a signed request.
///
/// Attaching value debits `body.relayer` on the host, so it is only
/// accepted for relayers listed in `relayers`.
pub async fn execute(
	engine: &ForwardingEngine,
	relayers: &HashSet<Address>,
	body: ExecuteRequest,
) -> Result<ExecutionResult, APIError> {
	if !body.value.is_zero() && !relayers.contains(&body.relayer) {
		return Err(APIError::Forbidden {
			error_type: "RELAYER_NOT_ALLOWED".into(),
			message: format!("Relayer {} may not attach value", body.relayer),
		});
	}

	let ctx = ExecutionContext::new(body.relayer, body.gas_limit).with_value(body.value);
	engine
		.execute(signed(&body.signed), &ctx)
		.await
		.map_err(forwarder_error)
}
