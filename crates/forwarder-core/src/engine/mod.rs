//! Forwarding engine.
//!
//! The engine owns the type and domain registries and the nonce table of
//! one forwarder. `verify` answers whether a signed request would be
//! accepted now; `execute` performs the same checks under the signer's
//! exclusive guard, dispatches the call and consumes the nonce.

pub mod context;
pub mod event_bus;

use crate::clock::Clock;
use crate::host::{CallHost, HostError, RelayedCall};
use crate::nonce::{NonceGuard, NonceTracker};
use crate::registry::{DomainRegistry, TypeRegistry};
use crate::{signature, ForwarderError};
use context::ExecutionContext;
use event_bus::EventBus;
use forwarder_config::{Config, ForwarderConfig};
use forwarder_types::{
	forward_request_digest, truncate_id, Address, ExecutionEvent, ExecutionResult, ForwardRequest,
	ForwarderEvent, RegisteredDomain, RegisteredType, RegistryEvent, RequestSchema, B256, U256,
};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::instrument;

/// Capacity of the engine's event bus.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Gas the engine requires beyond a request's own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
	/// Kept back for bookkeeping after the call returns.
	pub post_call_reserve: u64,
	/// Additionally required when the request forwards value.
	pub value_transfer_reserve: u64,
}

impl GasPolicy {
	/// Gas that must be forwardable for `request` to be dispatched.
	pub fn required_for(&self, request: &ForwardRequest) -> U256 {
		let mut required = request
			.gas
			.saturating_add(U256::from(self.post_call_reserve));
		if !request.value.is_zero() {
			required = required.saturating_add(U256::from(self.value_transfer_reserve));
		}
		required
	}
}

/// A signed request as submitted by a relayer.
#[derive(Debug, Clone, Copy)]
pub struct SignedRequest<'a> {
	pub request: &'a ForwardRequest,
	pub domain_separator: &'a B256,
	pub request_type_hash: &'a B256,
	pub suffix_data: &'a [u8],
	pub signature: &'a [u8],
}

/// Meta-transaction forwarder bound to one chain id and one address.
pub struct ForwardingEngine {
	/// Address calls are made from; the verifying contract of every domain.
	address: Address,
	types: TypeRegistry,
	domains: DomainRegistry,
	nonces: NonceTracker,
	gas_policy: GasPolicy,
	host: Arc<dyn CallHost>,
	clock: Arc<dyn Clock>,
	event_bus: EventBus,
	/// Serializes executions that move value through the forwarder balance.
	value_lock: Mutex<()>,
}

impl ForwardingEngine {
	/// Creates an engine with only the default `ForwardRequest` type registered.
	pub fn new(config: &ForwarderConfig, host: Arc<dyn CallHost>, clock: Arc<dyn Clock>) -> Self {
		Self {
			address: config.address,
			types: TypeRegistry::with_default_type(),
			domains: DomainRegistry::new(U256::from(config.chain_id), config.address),
			nonces: NonceTracker::new(),
			gas_policy: GasPolicy {
				post_call_reserve: config.post_call_reserve,
				value_transfer_reserve: config.value_transfer_reserve,
			},
			host,
			clock,
			event_bus: EventBus::new(EVENT_BUS_CAPACITY),
			value_lock: Mutex::new(()),
		}
	}

	/// Creates an engine and registers the configured domains and request types.
	pub async fn from_config(
		config: &Config,
		host: Arc<dyn CallHost>,
		clock: Arc<dyn Clock>,
	) -> Result<Self, ForwarderError> {
		let engine = Self::new(&config.forwarder, host, clock);
		for domain in &config.domains {
			engine.register_domain(&domain.name, &domain.version).await;
		}
		for request_type in &config.request_types {
			engine
				.register_type(&request_type.name, &request_type.suffix)
				.await?;
		}
		Ok(engine)
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn chain_id(&self) -> U256 {
		self.domains.chain_id()
	}

	pub fn gas_policy(&self) -> GasPolicy {
		self.gas_policy
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ForwarderEvent> {
		self.event_bus.subscribe()
	}

	/// Hash of the `ForwardRequest` type registered at construction.
	pub fn default_type_hash(&self) -> B256 {
		RequestSchema::forward_request().type_hash()
	}

	/// Registers a request type; see [`RequestSchema::parse`] for the
	/// accepted suffix grammar.
	pub async fn register_type(
		&self,
		type_name: &str,
		suffix: &str,
	) -> Result<RegisteredType, ForwarderError> {
		let record = self.types.register(type_name, suffix).await?;
		tracing::info!(
			type_hash = %truncate_id(&record.schema_hash.to_string()),
			"Registered request type {}",
			record.full_schema
		);
		self.event_bus
			.publish(ForwarderEvent::Registry(
				RegistryEvent::RequestTypeRegistered {
					type_hash: record.schema_hash,
					type_str: record.full_schema.clone(),
				},
			))
			.ok();
		Ok(record)
	}

	/// Registers a domain under this engine's chain id and address.
	pub async fn register_domain(&self, name: &str, version: &str) -> RegisteredDomain {
		let (record, domain_value) = self.domains.register(name, version).await;
		tracing::info!(
			domain_separator = %truncate_id(&record.domain_separator.to_string()),
			"Registered domain {} v{}",
			record.name,
			record.version
		);
		self.event_bus
			.publish(ForwarderEvent::Registry(RegistryEvent::DomainRegistered {
				domain_separator: record.domain_separator,
				domain_value,
			}))
			.ok();
		record
	}

	pub async fn get_type(&self, type_hash: &B256) -> Option<RegisteredType> {
		self.types.get(type_hash).await
	}

	pub async fn get_domain(&self, domain_separator: &B256) -> Option<RegisteredDomain> {
		self.domains.get(domain_separator).await
	}

	pub async fn types(&self) -> Vec<RegisteredType> {
		self.types.all().await
	}

	pub async fn domains(&self) -> Vec<RegisteredDomain> {
		self.domains.all().await
	}

	/// Next nonce expected from `signer`.
	pub async fn nonce(&self, signer: &Address) -> U256 {
		self.nonces.current_nonce(signer).await
	}

	/// Checks whether `signed` would be accepted now, without side effects.
	#[instrument(skip_all, fields(from = %signed.request.from, nonce = %signed.request.nonce))]
	pub async fn verify(&self, signed: SignedRequest<'_>) -> Result<(), ForwarderError> {
		let guard = self.nonces.lock(&signed.request.from).await;
		self.check(&guard, &signed).await
	}

	/// Verifies `signed`, dispatches it and consumes the signer's nonce.
	///
	/// A target that fails is reported through `ExecutionResult::success`;
	/// its nonce is consumed all the same. Errors raised before dispatch
	/// leave the nonce unchanged.
	#[instrument(skip_all, fields(from = %signed.request.from, nonce = %signed.request.nonce))]
	pub async fn execute(
		&self,
		signed: SignedRequest<'_>,
		ctx: &ExecutionContext,
	) -> Result<ExecutionResult, ForwarderError> {
		let request = signed.request;
		let mut guard = self.nonces.lock(&request.from).await;
		self.check(&guard, &signed).await?;

		let required = self.gas_policy.required_for(request);
		let available = U256::from(ctx.forwardable_gas());
		if available < required {
			return Err(ForwarderError::InsufficientGas {
				required,
				available,
			});
		}

		let moves_value = !request.value.is_zero() || !ctx.attached_value.is_zero();
		let _value_guard = if moves_value {
			Some(self.value_lock.lock().await)
		} else {
			None
		};

		if !ctx.attached_value.is_zero() {
			self.host
				.transfer(&ctx.relayer, &self.address, ctx.attached_value)
				.await?;
		}

		let call = RelayedCall {
			caller: self.address,
			target: request.to,
			value: request.value,
			gas: request.gas,
			payload: request.relayed_calldata(),
		};
		let outcome = match self.host.call(call).await {
			Ok(outcome) => outcome,
			Err(e) => {
				if !ctx.attached_value.is_zero() {
					if let Err(refund) = self
						.host
						.transfer(&self.address, &ctx.relayer, ctx.attached_value)
						.await
					{
						tracing::error!("Failed to return attached value to relayer: {}", refund);
					}
				}
				return Err(e.into());
			},
		};
		let nonce = guard.consume(request.nonce)?;

		// The request is dispatched and its nonce spent; a failed refund is
		// logged but does not turn the outcome into an error.
		if !request.value.is_zero() {
			if let Err(e) = self.refund_leftover(&request.from).await {
				tracing::error!("Failed to refund forwarder balance to signer: {}", e);
			}
		}

		if outcome.success {
			tracing::info!(to = %request.to, "Forwarded request");
		} else {
			tracing::info!(to = %request.to, "Forwarded request; target reverted");
		}
		self.event_bus
			.publish(ForwarderEvent::Execution(ExecutionEvent::RequestForwarded {
				from: request.from,
				to: request.to,
				nonce: request.nonce,
				success: outcome.success,
			}))
			.ok();

		Ok(ExecutionResult {
			success: outcome.success,
			return_data: outcome.return_data,
			nonce,
		})
	}

	/// Sends whatever the forwarder still holds to `signer`.
	async fn refund_leftover(&self, signer: &Address) -> Result<(), HostError> {
		let leftover = self.host.balance_of(&self.address).await?;
		if !leftover.is_zero() {
			self.host.transfer(&self.address, signer, leftover).await?;
			tracing::debug!(%leftover, "Refunded forwarder balance to signer");
		}
		Ok(())
	}

	/// Domain, nonce, type, signature and expiry checks, in that order.
	async fn check(
		&self,
		nonce: &NonceGuard,
		signed: &SignedRequest<'_>,
	) -> Result<(), ForwarderError> {
		let request = signed.request;

		if !self.domains.is_registered(signed.domain_separator).await {
			return Err(ForwarderError::UnregisteredDomain);
		}
		nonce.check(request.nonce)?;
		if !self.types.is_registered(signed.request_type_hash).await {
			return Err(ForwarderError::UnregisteredRequestType);
		}

		let digest = forward_request_digest(
			signed.domain_separator,
			signed.request_type_hash,
			request,
			signed.suffix_data,
		);
		signature::verify(&digest, signed.signature, &request.from)?;

		let now = self.clock.now();
		if request.is_expired_at(now) {
			return Err(ForwarderError::RequestExpired {
				valid_until: request.valid_until_time,
				now,
			});
		}

		tracing::debug!("Request verified");
		Ok(())
	}
}
