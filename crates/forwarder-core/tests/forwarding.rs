//! End-to-end forwarding: client-side signing, engine checks, dispatch
//! through the in-memory host and sender recovery in the target.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use forwarder_account::{implementations::local::LocalWallet, AccountService, RequestSigner};
use forwarder_config::ForwarderConfig;
use async_trait::async_trait;
use forwarder_core::{
	extract_sender, CallHost, CallOutcome, CallTarget, ExecutionContext, FixedClock,
	ForwarderAllowList, ForwarderError, ForwardingEngine, HostError, InMemoryHost, RelayedCall,
	SignedRequest,
};
use forwarder_types::{Eip712AbiEncoder, ExecutionEvent, ForwardRequest, ForwarderEvent};
use std::sync::{Arc, Mutex};

const FORWARDER: Address = Address::new([0xf0; 20]);
const TARGET: Address = Address::new([0x11; 20]);
const RELAYER: Address = Address::new([0x22; 20]);
const NOW: u64 = 1_700_000_000;
const GAS_LIMIT: u64 = 1_000_000;

/// Records the sender and data it sees and echoes the data back.
struct Recorder {
	policy: ForwarderAllowList,
	seen: Mutex<Vec<(Address, Vec<u8>)>>,
}

impl CallTarget for Recorder {
	fn call(&self, call: &RelayedCall) -> CallOutcome {
		let (sender, data) = extract_sender(&self.policy, &call.caller, &call.payload);
		self.seen.lock().unwrap().push((sender, data.to_vec()));
		CallOutcome::success(data.to_vec())
	}
}

struct Reverter;

impl CallTarget for Reverter {
	fn call(&self, _call: &RelayedCall) -> CallOutcome {
		CallOutcome::revert(Bytes::from_static(b"reverted"))
	}
}

/// In-memory host whose balance queries fail.
struct BalanceOutage {
	inner: Arc<InMemoryHost>,
}

#[async_trait]
impl CallHost for BalanceOutage {
	async fn call(&self, call: RelayedCall) -> Result<CallOutcome, HostError> {
		self.inner.call(call).await
	}

	async fn balance_of(&self, _account: &Address) -> Result<U256, HostError> {
		Err(HostError::Unavailable("balance query failed".into()))
	}

	async fn transfer(&self, from: &Address, to: &Address, amount: U256) -> Result<(), HostError> {
		self.inner.transfer(from, to, amount).await
	}
}

struct Fixture {
	engine: Arc<ForwardingEngine>,
	host: Arc<InMemoryHost>,
	clock: Arc<FixedClock>,
	recorder: Arc<Recorder>,
	signer: RequestSigner,
	from: Address,
}

impl Fixture {
	async fn new() -> Self {
		Self::with_host(|host| host as Arc<dyn CallHost>).await
	}

	/// Builds the fixture with the engine calling through `wrap(host)`.
	async fn with_host(wrap: impl FnOnce(Arc<InMemoryHost>) -> Arc<dyn CallHost>) -> Self {
		let host = Arc::new(InMemoryHost::new());
		let clock = Arc::new(FixedClock::new(NOW));
		let config = ForwarderConfig {
			id: "integration".into(),
			chain_id: 1337,
			address: FORWARDER,
			post_call_reserve: 10_000,
			value_transfer_reserve: 40_000,
		};
		let engine = Arc::new(ForwardingEngine::new(&config, wrap(host.clone()), clock.clone()));

		let recorder = Arc::new(Recorder {
			policy: ForwarderAllowList::single(FORWARDER),
			seen: Mutex::new(Vec::new()),
		});
		host.register_target(TARGET, recorder.clone()).await;

		let domain = engine.register_domain("Test Domain", "1").await;
		let wallet = LocalWallet::random();
		let from = wallet.address();
		let signer = RequestSigner::new(
			Arc::new(AccountService::new(Box::new(wallet))),
			domain.domain_separator,
			engine.default_type_hash(),
		);

		Self {
			engine,
			host,
			clock,
			recorder,
			signer,
			from,
		}
	}

	fn request(&self, nonce: u64) -> ForwardRequest {
		ForwardRequest {
			from: self.from,
			to: TARGET,
			value: U256::ZERO,
			gas: U256::from(100_000),
			nonce: U256::from(nonce),
			data: Bytes::from_static(&[0xca, 0xfe]),
			valid_until_time: U256::ZERO,
		}
	}

	async fn sign(&self, request: &ForwardRequest) -> Bytes {
		self.signer.sign(request, &[]).await.unwrap()
	}

	async fn verify(&self, request: &ForwardRequest, signature: &[u8]) -> Result<(), ForwarderError> {
		self.engine
			.verify(SignedRequest {
				request,
				domain_separator: &self.signer.domain_separator(),
				request_type_hash: &self.signer.request_type_hash(),
				suffix_data: &[],
				signature,
			})
			.await
	}

	async fn execute(
		&self,
		request: &ForwardRequest,
		signature: &[u8],
		ctx: &ExecutionContext,
	) -> Result<forwarder_types::ExecutionResult, ForwarderError> {
		self.engine
			.execute(
				SignedRequest {
					request,
					domain_separator: &self.signer.domain_separator(),
					request_type_hash: &self.signer.request_type_hash(),
					suffix_data: &[],
					signature,
				},
				ctx,
			)
			.await
	}
}

fn word(bytes: &[u8]) -> [u8; 32] {
	B256::left_padding_from(bytes).0
}

#[tokio::test]
async fn test_nonce_advances_and_replay_is_rejected() {
	let fx = Fixture::new().await;
	let request = fx.request(0);
	let signature = fx.sign(&request).await;

	fx.verify(&request, &signature).await.unwrap();
	let result = fx
		.execute(&request, &signature, &ExecutionContext::new(RELAYER, GAS_LIMIT))
		.await
		.unwrap();
	assert!(result.success);
	assert_eq!(result.nonce, U256::from(1));
	assert_eq!(fx.engine.nonce(&fx.from).await, U256::from(1));

	match fx.verify(&request, &signature).await {
		Err(ForwarderError::NonceMismatch {
			expected, provided, ..
		}) => {
			assert_eq!(expected, U256::from(1));
			assert_eq!(provided, U256::ZERO);
		},
		other => panic!("expected NonceMismatch, got {:?}", other),
	}
	let replay = fx
		.execute(&request, &signature, &ExecutionContext::new(RELAYER, GAS_LIMIT))
		.await;
	assert!(matches!(replay, Err(ForwarderError::NonceMismatch { .. })));
	assert_eq!(fx.recorder.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unregistered_domain() {
	let fx = Fixture::new().await;
	let request = fx.request(0);
	let signer = RequestSigner::new(
		Arc::new(AccountService::new(Box::new(LocalWallet::random()))),
		B256::repeat_byte(0x99),
		fx.engine.default_type_hash(),
	);
	let signature = signer.sign(&request, &[]).await.unwrap();

	let result = fx
		.engine
		.verify(SignedRequest {
			request: &request,
			domain_separator: &B256::repeat_byte(0x99),
			request_type_hash: &fx.engine.default_type_hash(),
			suffix_data: &[],
			signature: &signature,
		})
		.await;
	assert!(matches!(result, Err(ForwarderError::UnregisteredDomain)));
}

#[tokio::test]
async fn test_unregistered_request_type() {
	let fx = Fixture::new().await;
	let request = fx.request(0);
	let unknown = fx.signer.with_request_type(B256::repeat_byte(0x42));
	let signature = unknown.sign(&request, &[]).await.unwrap();

	let result = fx
		.engine
		.verify(SignedRequest {
			request: &request,
			domain_separator: &unknown.domain_separator(),
			request_type_hash: &unknown.request_type_hash(),
			suffix_data: &[],
			signature: &signature,
		})
		.await;
	assert!(matches!(result, Err(ForwarderError::UnregisteredRequestType)));
}

#[tokio::test]
async fn test_signature_tampering() {
	let fx = Fixture::new().await;
	let request = fx.request(0);
	let signature = fx.sign(&request).await;

	let mut flipped = signature.to_vec();
	flipped[10] ^= 0x01;
	assert!(matches!(
		fx.verify(&request, &flipped).await,
		Err(ForwarderError::SignatureMismatch)
	));

	assert!(matches!(
		fx.verify(&request, &signature[..64]).await,
		Err(ForwarderError::MalformedSignature { length: 64 })
	));

	let mut other = request.clone();
	other.data = Bytes::from_static(&[0xca, 0xff]);
	assert!(matches!(
		fx.verify(&other, &signature).await,
		Err(ForwarderError::SignatureMismatch)
	));
}

#[tokio::test]
async fn test_signer_must_be_from() {
	let fx = Fixture::new().await;
	let mut request = fx.request(0);
	request.from = Address::repeat_byte(0x77);
	let signature = fx.sign(&request).await;

	assert!(matches!(
		fx.verify(&request, &signature).await,
		Err(ForwarderError::SignatureMismatch)
	));
}

#[tokio::test]
async fn test_expiry_boundary() {
	let fx = Fixture::new().await;
	let mut request = fx.request(0);
	request.valid_until_time = U256::from(NOW + 10);
	let signature = fx.sign(&request).await;

	fx.verify(&request, &signature).await.unwrap();

	fx.clock.advance(10);
	match fx.verify(&request, &signature).await {
		Err(ForwarderError::RequestExpired { valid_until, now }) => {
			assert_eq!(valid_until, U256::from(NOW + 10));
			assert_eq!(now, NOW + 10);
		},
		other => panic!("expected RequestExpired, got {:?}", other),
	}
	let result = fx
		.execute(&request, &signature, &ExecutionContext::new(RELAYER, GAS_LIMIT))
		.await;
	assert!(matches!(result, Err(ForwarderError::RequestExpired { .. })));
	assert_eq!(fx.engine.nonce(&fx.from).await, U256::ZERO);
}

#[tokio::test]
async fn test_extended_type_with_bool_suffix() {
	let fx = Fixture::new().await;
	let registered = fx.engine.register_type("test2", "bool extra)").await.unwrap();
	let signer = fx.signer.with_request_type(registered.schema_hash);

	let request = fx.request(0);
	let suffix = word(&[1]);
	let signature = signer.sign(&request, &suffix).await.unwrap();

	fx.engine
		.verify(SignedRequest {
			request: &request,
			domain_separator: &signer.domain_separator(),
			request_type_hash: &registered.schema_hash,
			suffix_data: &suffix,
			signature: &signature,
		})
		.await
		.unwrap();

	let wrong = fx
		.engine
		.verify(SignedRequest {
			request: &request,
			domain_separator: &signer.domain_separator(),
			request_type_hash: &registered.schema_hash,
			suffix_data: &word(&[0]),
			signature: &signature,
		})
		.await;
	assert!(matches!(wrong, Err(ForwarderError::SignatureMismatch)));
}

#[tokio::test]
async fn test_extended_type_with_nested_struct() {
	let fx = Fixture::new().await;
	let registered = fx
		.engine
		.register_type("ExtendedMessage", "ExtraData extra)ExtraData(address extraAddr)")
		.await
		.unwrap();
	assert!(registered
		.full_schema
		.ends_with(",ExtraData extra)ExtraData(address extraAddr)"));

	let extra_addr = Address::repeat_byte(0x5a);
	let mut nested = Eip712AbiEncoder::new();
	nested.push_b256(&keccak256(b"ExtraData(address extraAddr)"));
	nested.push_address(&extra_addr);
	let suffix = nested.hash();

	let signer = fx.signer.with_request_type(registered.schema_hash);
	let request = fx.request(0);
	let signature = signer.sign(&request, suffix.as_slice()).await.unwrap();

	let result = fx
		.engine
		.execute(
			SignedRequest {
				request: &request,
				domain_separator: &signer.domain_separator(),
				request_type_hash: &registered.schema_hash,
				suffix_data: suffix.as_slice(),
				signature: &signature,
			},
			&ExecutionContext::new(RELAYER, GAS_LIMIT),
		)
		.await
		.unwrap();
	assert!(result.success);
	assert_eq!(fx.engine.nonce(&fx.from).await, U256::from(1));
}

#[tokio::test]
async fn test_gas_floor_boundary() {
	let fx = Fixture::new().await;
	let request = fx.request(0);
	let signature = fx.sign(&request).await;

	// 100_000 requested + 10_000 reserve; 111_746 - 111_746 / 64 == 110_000
	let short = fx
		.execute(&request, &signature, &ExecutionContext::new(RELAYER, 111_745))
		.await;
	assert!(matches!(short, Err(ForwarderError::InsufficientGas { .. })));

	let exact = fx
		.execute(&request, &signature, &ExecutionContext::new(RELAYER, 111_746))
		.await
		.unwrap();
	assert!(exact.success);
}

#[tokio::test]
async fn test_insufficient_gas_rejected_before_dispatch() {
	let fx = Fixture::new().await;
	let request = fx.request(0);
	let signature = fx.sign(&request).await;

	let result = fx
		.execute(&request, &signature, &ExecutionContext::new(RELAYER, 110_000))
		.await;
	match result {
		Err(ForwarderError::InsufficientGas {
			required,
			available,
		}) => {
			assert_eq!(required, U256::from(110_000));
			assert_eq!(available, U256::from(110_000 - 110_000 / 64));
		},
		other => panic!("expected InsufficientGas, got {:?}", other),
	}
	assert_eq!(fx.engine.nonce(&fx.from).await, U256::ZERO);
	assert!(fx.recorder.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_value_and_refund() {
	let fx = Fixture::new().await;
	fx.host.set_balance(RELAYER, U256::from(1_000)).await;

	let mut request = fx.request(0);
	request.value = U256::from(100);
	let signature = fx.sign(&request).await;

	let ctx = ExecutionContext::new(RELAYER, GAS_LIMIT).with_value(U256::from(150));
	let result = fx.execute(&request, &signature, &ctx).await.unwrap();
	assert!(result.success);

	assert_eq!(fx.host.balance_of(&TARGET).await.unwrap(), U256::from(100));
	assert_eq!(fx.host.balance_of(&fx.from).await.unwrap(), U256::from(50));
	assert_eq!(fx.host.balance_of(&FORWARDER).await.unwrap(), U256::ZERO);
	assert_eq!(fx.host.balance_of(&RELAYER).await.unwrap(), U256::from(850));
}

#[tokio::test]
async fn test_unfunded_attached_value_is_host_error() {
	let fx = Fixture::new().await;
	let request = fx.request(0);
	let signature = fx.sign(&request).await;

	let ctx = ExecutionContext::new(RELAYER, GAS_LIMIT).with_value(U256::from(1));
	let result = fx.execute(&request, &signature, &ctx).await;
	assert!(matches!(result, Err(ForwarderError::Host(_))));
	assert_eq!(fx.engine.nonce(&fx.from).await, U256::ZERO);
}

#[tokio::test]
async fn test_unfunded_request_value_reverts_and_consumes_nonce() {
	let fx = Fixture::new().await;
	let mut request = fx.request(0);
	request.value = U256::from(10);
	let signature = fx.sign(&request).await;

	let ctx = ExecutionContext::new(RELAYER, GAS_LIMIT);
	let result = fx.execute(&request, &signature, &ctx).await.unwrap();

	assert!(!result.success);
	assert_eq!(result.nonce, U256::from(1));
	assert_eq!(fx.engine.nonce(&fx.from).await, U256::from(1));
	assert_eq!(fx.host.balance_of(&TARGET).await.unwrap(), U256::ZERO);
	assert!(fx.recorder.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_refund_failure_after_dispatch_still_reports_outcome() {
	let fx = Fixture::with_host(|host| {
		Arc::new(BalanceOutage { inner: host }) as Arc<dyn CallHost>
	})
	.await;
	fx.host.set_balance(RELAYER, U256::from(10)).await;
	let mut events = fx.engine.subscribe();

	let mut request = fx.request(0);
	request.value = U256::from(10);
	let signature = fx.sign(&request).await;

	let ctx = ExecutionContext::new(RELAYER, GAS_LIMIT).with_value(U256::from(10));
	let result = fx.execute(&request, &signature, &ctx).await.unwrap();

	assert!(result.success);
	assert_eq!(result.return_data, Bytes::from_static(&[0xca, 0xfe]));
	assert_eq!(result.nonce, U256::from(1));
	assert_eq!(fx.host.balance_of(&TARGET).await.unwrap(), U256::from(10));
	assert_eq!(
		events.recv().await.unwrap(),
		ForwarderEvent::Execution(ExecutionEvent::RequestForwarded {
			from: fx.from,
			to: TARGET,
			nonce: U256::ZERO,
			success: true,
		})
	);
}

#[tokio::test]
async fn test_target_revert_consumes_nonce() {
	let fx = Fixture::new().await;
	let reverting = Address::repeat_byte(0x66);
	fx.host.register_target(reverting, Arc::new(Reverter)).await;
	fx.host.set_balance(RELAYER, U256::from(10)).await;

	let mut request = fx.request(0);
	request.to = reverting;
	request.value = U256::from(10);
	let signature = fx.sign(&request).await;

	let mut events = fx.engine.subscribe();
	let ctx = ExecutionContext::new(RELAYER, GAS_LIMIT).with_value(U256::from(10));
	let result = fx.execute(&request, &signature, &ctx).await.unwrap();

	assert!(!result.success);
	assert_eq!(result.return_data, Bytes::from_static(b"reverted"));
	assert_eq!(fx.engine.nonce(&fx.from).await, U256::from(1));
	// The value bounced back to the forwarder and was refunded to the signer
	assert_eq!(fx.host.balance_of(&fx.from).await.unwrap(), U256::from(10));

	match events.recv().await.unwrap() {
		ForwarderEvent::Execution(ExecutionEvent::RequestForwarded {
			from,
			to,
			nonce,
			success,
		}) => {
			assert_eq!(from, fx.from);
			assert_eq!(to, reverting);
			assert_eq!(nonce, U256::ZERO);
			assert!(!success);
		},
		other => panic!("unexpected event {:?}", other),
	}
}

#[tokio::test]
async fn test_target_sees_real_sender() {
	let fx = Fixture::new().await;
	let request = fx.request(0);
	let signature = fx.sign(&request).await;

	let result = fx
		.execute(&request, &signature, &ExecutionContext::new(RELAYER, GAS_LIMIT))
		.await
		.unwrap();
	assert_eq!(result.return_data, Bytes::from_static(&[0xca, 0xfe]));

	let seen = fx.recorder.seen.lock().unwrap();
	assert_eq!(seen.len(), 1);
	assert_eq!(seen[0].0, fx.from);
	assert_eq!(seen[0].1, vec![0xca, 0xfe]);
}

#[tokio::test]
async fn test_verify_has_no_side_effects() {
	let fx = Fixture::new().await;
	let request = fx.request(0);
	let signature = fx.sign(&request).await;

	for _ in 0..3 {
		fx.verify(&request, &signature).await.unwrap();
	}
	assert_eq!(fx.engine.nonce(&fx.from).await, U256::ZERO);
	assert!(fx.recorder.seen.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_execute_once() {
	let fx = Arc::new(Fixture::new().await);
	let request = fx.request(0);
	let signature = fx.sign(&request).await;

	let mut handles = Vec::new();
	for _ in 0..8 {
		let fx = fx.clone();
		let request = request.clone();
		let signature = signature.clone();
		handles.push(tokio::spawn(async move {
			fx.execute(&request, &signature, &ExecutionContext::new(RELAYER, GAS_LIMIT))
				.await
				.is_ok()
		}));
	}

	let mut successes = 0;
	for handle in handles {
		if handle.await.unwrap() {
			successes += 1;
		}
	}
	assert_eq!(successes, 1);
	assert_eq!(fx.engine.nonce(&fx.from).await, U256::from(1));
	assert_eq!(fx.recorder.seen.lock().unwrap().len(), 1);
}
