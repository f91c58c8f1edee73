//! Signing of forward requests under a registered domain and request type.

use crate::{AccountError, AccountService};
use forwarder_types::{forward_request_digest, Address, Bytes, ForwardRequest, B256};
use std::sync::Arc;

/// Signs forward requests for one domain separator and request type hash.
///
/// The digest is `keccak256(0x1901 || domainSeparator || structHash)` where
/// the struct hash covers the base fields followed by `suffix_data`.
#[derive(Clone)]
pub struct RequestSigner {
	account: Arc<AccountService>,
	domain_separator: B256,
	request_type_hash: B256,
}

impl RequestSigner {
	pub fn new(account: Arc<AccountService>, domain_separator: B256, request_type_hash: B256) -> Self {
		Self {
			account,
			domain_separator,
			request_type_hash,
		}
	}

	/// Same account and domain, different request type.
	pub fn with_request_type(&self, request_type_hash: B256) -> Self {
		Self {
			request_type_hash,
			..self.clone()
		}
	}

	pub fn domain_separator(&self) -> B256 {
		self.domain_separator
	}

	pub fn request_type_hash(&self) -> B256 {
		self.request_type_hash
	}

	/// Address the signatures recover to.
	pub async fn address(&self) -> Result<Address, AccountError> {
		self.account.get_address().await
	}

	/// EIP-712 digest of `request` with the given extension encoding.
	pub fn signing_hash(&self, request: &ForwardRequest, suffix_data: &[u8]) -> B256 {
		forward_request_digest(
			&self.domain_separator,
			&self.request_type_hash,
			request,
			suffix_data,
		)
	}

	/// Signs `request`, returning the 65-byte `r || s || v` signature.
	pub async fn sign(
		&self,
		request: &ForwardRequest,
		suffix_data: &[u8],
	) -> Result<Bytes, AccountError> {
		let hash = self.signing_hash(request, suffix_data);
		self.account.sign_hash(&hash).await
	}
}
