//! Sender recovery for call targets.
//!
//! A target that trusts a forwarder reads the real sender from the last 20
//! bytes of the payload whenever the immediate caller is that forwarder.
//! Trust is decided by the target, never by the forwarder.

use forwarder_types::Address;
use std::collections::HashSet;

const ADDRESS_LENGTH: usize = 20;

/// Capability of a target to decide which callers may speak for others.
pub trait TrustedForwarder {
	fn is_trusted_forwarder(&self, forwarder: &Address) -> bool;
}

/// Fixed set of trusted forwarders held by a target.
#[derive(Debug, Clone, Default)]
pub struct ForwarderAllowList {
	forwarders: HashSet<Address>,
}

impl ForwarderAllowList {
	pub fn new(forwarders: impl IntoIterator<Item = Address>) -> Self {
		Self {
			forwarders: forwarders.into_iter().collect(),
		}
	}

	pub fn single(forwarder: Address) -> Self {
		Self::new([forwarder])
	}
}

impl TrustedForwarder for ForwarderAllowList {
	fn is_trusted_forwarder(&self, forwarder: &Address) -> bool {
		self.forwarders.contains(forwarder)
	}
}

/// Splits `payload` into the effective sender and the original call data.
///
/// When `caller` is trusted and the payload holds at least 20 bytes, the
/// sender is the trailing 20 bytes and the data is everything before them.
/// Otherwise the caller is the sender and the payload is returned intact.
pub fn extract_sender<'a, P>(policy: &P, caller: &Address, payload: &'a [u8]) -> (Address, &'a [u8])
where
	P: TrustedForwarder + ?Sized,
{
	if payload.len() >= ADDRESS_LENGTH && policy.is_trusted_forwarder(caller) {
		let split = payload.len() - ADDRESS_LENGTH;
		(Address::from_slice(&payload[split..]), &payload[..split])
	} else {
		(*caller, payload)
	}
}

/// Effective sender of a call.
pub fn msg_sender<P>(policy: &P, caller: &Address, payload: &[u8]) -> Address
where
	P: TrustedForwarder + ?Sized,
{
	extract_sender(policy, caller, payload).0
}

/// Effective call data of a call.
pub fn msg_data<'a, P>(policy: &P, caller: &Address, payload: &'a [u8]) -> &'a [u8]
where
	P: TrustedForwarder + ?Sized,
{
	extract_sender(policy, caller, payload).1
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	const FORWARDER: Address = address!("f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0");
	const SIGNER: Address = address!("1212121212121212121212121212121212121212");

	fn relayed(data: &[u8]) -> Vec<u8> {
		let mut payload = data.to_vec();
		payload.extend_from_slice(SIGNER.as_slice());
		payload
	}

	#[test]
	fn test_trusted_caller_extracts_sender() {
		let policy = ForwarderAllowList::single(FORWARDER);
		let payload = relayed(&[0xde, 0xad]);
		let (sender, data) = extract_sender(&policy, &FORWARDER, &payload);
		assert_eq!(sender, SIGNER);
		assert_eq!(data, &[0xde, 0xad]);
	}

	#[test]
	fn test_untrusted_caller_passes_through() {
		let policy = ForwarderAllowList::single(FORWARDER);
		let caller = Address::repeat_byte(0x33);
		let payload = relayed(&[0xde, 0xad]);
		let (sender, data) = extract_sender(&policy, &caller, &payload);
		assert_eq!(sender, caller);
		assert_eq!(data, payload.as_slice());
	}

	#[test]
	fn test_exactly_twenty_bytes() {
		let policy = ForwarderAllowList::single(FORWARDER);
		let payload = relayed(&[]);
		let (sender, data) = extract_sender(&policy, &FORWARDER, &payload);
		assert_eq!(sender, SIGNER);
		assert!(data.is_empty());
	}

	#[test]
	fn test_short_payload_from_trusted_caller() {
		let policy = ForwarderAllowList::single(FORWARDER);
		let payload = [0u8; 19];
		assert_eq!(msg_sender(&policy, &FORWARDER, &payload), FORWARDER);
		assert_eq!(msg_data(&policy, &FORWARDER, &payload), &payload[..]);
	}

	#[test]
	fn test_multiple_forwarders() {
		let other = Address::repeat_byte(0xf1);
		let policy = ForwarderAllowList::new([FORWARDER, other]);
		assert!(policy.is_trusted_forwarder(&other));
		assert_eq!(msg_sender(&policy, &other, &relayed(&[1])), SIGNER);
		assert!(!ForwarderAllowList::default().is_trusted_forwarder(&FORWARDER));
	}
}
