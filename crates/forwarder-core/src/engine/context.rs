//! Relayer-side parameters of an execution.

use forwarder_types::{Address, U256};

/// What the relayer brings to an `execute` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
	/// Account the relayer pays from.
	pub relayer: Address,
	/// Gas available to the forwarder for this execution.
	pub gas_limit: u64,
	/// Native value the relayer sends along; credited to the forwarder
	/// before dispatch.
	pub attached_value: U256,
}

impl ExecutionContext {
	/// Context with no attached value.
	pub fn new(relayer: Address, gas_limit: u64) -> Self {
		Self {
			relayer,
			gas_limit,
			attached_value: U256::ZERO,
		}
	}

	pub fn with_value(mut self, attached_value: U256) -> Self {
		self.attached_value = attached_value;
		self
	}

	/// Gas the forwarder may hand on: all but one 64th of the limit.
	pub fn forwardable_gas(&self) -> u64 {
		self.gas_limit - self.gas_limit / 64
	}
}
