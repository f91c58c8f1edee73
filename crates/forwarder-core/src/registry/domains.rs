//! Registry of accepted EIP-712 domains.
//!
//! Every domain is bound to one chain id and one verifying contract, both
//! fixed when the registry is created; callers only choose name and version.

use forwarder_types::{encode_domain, Address, Bytes, RegisteredDomain, B256, U256};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Domains keyed by separator.
#[derive(Debug)]
pub struct DomainRegistry {
	chain_id: U256,
	verifying_contract: Address,
	domains: RwLock<HashMap<B256, RegisteredDomain>>,
}

impl DomainRegistry {
	pub fn new(chain_id: U256, verifying_contract: Address) -> Self {
		Self {
			chain_id,
			verifying_contract,
			domains: RwLock::new(HashMap::new()),
		}
	}

	pub fn chain_id(&self) -> U256 {
		self.chain_id
	}

	pub fn verifying_contract(&self) -> Address {
		self.verifying_contract
	}

	/// Registers `(name, version)` and returns the record together with the
	/// ABI-encoded domain tuple its separator hashes.
	pub async fn register(&self, name: &str, version: &str) -> (RegisteredDomain, Bytes) {
		let encoded = encode_domain(name, version, self.chain_id, &self.verifying_contract);
		let domain_separator = alloy_primitives::keccak256(&encoded);

		let mut domains = self.domains.write().await;
		let record = domains
			.entry(domain_separator)
			.or_insert_with(|| RegisteredDomain {
				name: name.to_string(),
				version: version.to_string(),
				chain_id: self.chain_id,
				verifying_contract: self.verifying_contract,
				domain_separator,
			})
			.clone();
		(record, encoded.into())
	}

	pub async fn is_registered(&self, domain_separator: &B256) -> bool {
		self.domains.read().await.contains_key(domain_separator)
	}

	pub async fn get(&self, domain_separator: &B256) -> Option<RegisteredDomain> {
		self.domains.read().await.get(domain_separator).cloned()
	}

	/// All registered domains, ordered by name then version.
	pub async fn all(&self) -> Vec<RegisteredDomain> {
		let mut all: Vec<_> = self.domains.read().await.values().cloned().collect();
		all.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
		all
	}
}
