//! secp256k1 signature recovery for forward requests.
//!
//! Signatures are 65 bytes, `r || s || v`, with `v` in {27, 28}. High-s
//! signatures are normalised before recovery rather than rejected.

use crate::ForwarderError;
use alloy_primitives::keccak256;
use forwarder_types::{Address, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Recovers the address that produced `signature` over `hash`.
pub fn recover(hash: &B256, signature: &[u8]) -> Result<Address, ForwarderError> {
	if signature.len() != SIGNATURE_LENGTH {
		return Err(ForwarderError::MalformedSignature {
			length: signature.len(),
		});
	}

	let parity = match signature[64] {
		27 => false,
		28 => true,
		_ => return Err(ForwarderError::SignatureMismatch),
	};
	let sig =
		Signature::from_slice(&signature[..64]).map_err(|_| ForwarderError::SignatureMismatch)?;

	// Negating s flips the parity of the recovered point
	let (sig, parity) = match sig.normalize_s() {
		Some(normalized) => (normalized, !parity),
		None => (sig, parity),
	};
	let recovery_id = RecoveryId::new(parity, false);

	let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &sig, recovery_id)
		.map_err(|_| ForwarderError::SignatureMismatch)?;
	Ok(public_key_address(&key))
}

/// Fails unless `signature` over `hash` recovers to `expected`.
pub fn verify(hash: &B256, signature: &[u8], expected: &Address) -> Result<(), ForwarderError> {
	let recovered = recover(hash, signature)?;
	if recovered != *expected {
		tracing::debug!(%recovered, %expected, "Signer mismatch");
		return Err(ForwarderError::SignatureMismatch);
	}
	Ok(())
}

fn public_key_address(key: &VerifyingKey) -> Address {
	let point = key.to_encoded_point(false);
	let hash = keccak256(&point.as_bytes()[1..]);
	Address::from_slice(&hash[12..])
}
