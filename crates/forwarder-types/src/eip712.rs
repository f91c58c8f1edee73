//! EIP-712 utilities for forward requests.
//!
//! These helpers provide:
//! - Domain separator computation bound to chain id and forwarder address
//! - Struct hash computation for forward requests with opaque suffix data
//! - Final digest computation (0x1901 || domainSeparator || structHash)
//! - A minimal ABI encoder for the field types used in struct hashing
//!
//! Every hash produced here must match what external EIP-712 v4 signers
//! compute for the same message.

use crate::ForwardRequest;
use alloy_primitives::{keccak256, Address, B256, U256};

/// Canonical domain schema used for every domain registered by the forwarder.
pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Base fields shared by every request type, in declaration order.
pub const GENERIC_PARAMS: &str = "address from,address to,uint256 value,uint256 gas,uint256 nonce,bytes data,uint256 validUntilTime";

/// Name of the request type registered when an engine is created.
pub const FORWARD_REQUEST_TYPE_NAME: &str = "ForwardRequest";

/// ABI-encodes the domain tuple
/// `(typeHash, keccak(name), keccak(version), chainId, verifyingContract)`.
///
/// The returned bytes are what a domain registration record carries; the
/// domain separator is their keccak256.
pub fn encode_domain(
	name: &str,
	version: &str,
	chain_id: U256,
	verifying_contract: &Address,
) -> Vec<u8> {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&keccak256(DOMAIN_TYPE.as_bytes()));
	enc.push_string(name);
	enc.push_string(version);
	enc.push_u256(chain_id);
	enc.push_address(verifying_contract);
	enc.finish()
}

/// Compute an EIP-712 domain separator for the forwarder domain schema.
pub fn compute_domain_separator(
	name: &str,
	version: &str,
	chain_id: U256,
	verifying_contract: &Address,
) -> B256 {
	keccak256(encode_domain(name, version, chain_id, verifying_contract))
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainSeparator || structHash).
pub fn compute_final_digest(domain_separator: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_separator.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Struct hash of a forward request under `type_hash`.
///
/// The seven base fields are encoded in declaration order and `suffix_data`
/// is appended verbatim: it is the caller's own encoding of the extension
/// fields (one 32-byte word per field).
pub fn hash_forward_request(type_hash: &B256, request: &ForwardRequest, suffix_data: &[u8]) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(type_hash);
	enc.push_address(&request.from);
	enc.push_address(&request.to);
	enc.push_u256(request.value);
	enc.push_u256(request.gas);
	enc.push_u256(request.nonce);
	enc.push_bytes(&request.data);
	enc.push_u256(request.valid_until_time);
	enc.push_raw(suffix_data);
	enc.hash()
}

/// Digest a signer must sign for `request` under the given domain and type.
pub fn forward_request_digest(
	domain_separator: &B256,
	type_hash: &B256,
	request: &ForwardRequest,
	suffix_data: &[u8],
) -> B256 {
	let struct_hash = hash_forward_request(type_hash, request, suffix_data);
	compute_final_digest(domain_separator, &struct_hash)
}

/// Minimal ABI encoder for the types used in EIP-712 struct hashing.
///
/// Dynamic values (`bytes`, `string`) are replaced by their keccak256 as the
/// EIP-712 `encodeData` rules require; nested structs are pushed as their
/// struct hash through [`Eip712AbiEncoder::push_b256`].
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Default for Eip712AbiEncoder {
	fn default() -> Self {
		Self::new()
	}
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn push_bool(&mut self, v: bool) {
		self.push_u256(U256::from(v as u8));
	}

	pub fn push_bytes(&mut self, v: &[u8]) {
		self.push_b256(&keccak256(v));
	}

	pub fn push_string(&mut self, v: &str) {
		self.push_bytes(v.as_bytes());
	}

	/// Appends already-encoded words without any transformation.
	pub fn push_raw(&mut self, v: &[u8]) {
		self.buf.extend_from_slice(v);
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}

	/// keccak256 over everything pushed so far.
	pub fn hash(self) -> B256 {
		keccak256(self.buf)
	}
}
