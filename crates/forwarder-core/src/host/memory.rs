//! In-memory call host.
//!
//! Keeps native balances in a map and dispatches to registered
//! [`CallTarget`]s. Calls to addresses without a target behave like calls to
//! an externally owned account: they succeed with empty return data.

use super::{CallHost, CallOutcome, CallTarget, HostError, RelayedCall};
use async_trait::async_trait;
use forwarder_types::{Address, Bytes, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory host implementation.
#[derive(Default)]
pub struct InMemoryHost {
	balances: RwLock<HashMap<Address, U256>>,
	targets: RwLock<HashMap<Address, Arc<dyn CallTarget>>>,
}

impl InMemoryHost {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a host with the given starting balances.
	pub fn with_balances(balances: impl IntoIterator<Item = (Address, U256)>) -> Self {
		Self {
			balances: RwLock::new(balances.into_iter().collect()),
			targets: RwLock::new(HashMap::new()),
		}
	}

	pub async fn set_balance(&self, account: Address, amount: U256) {
		self.balances.write().await.insert(account, amount);
	}

	/// Installs `target` as the code at `address`.
	pub async fn register_target(&self, address: Address, target: Arc<dyn CallTarget>) {
		self.targets.write().await.insert(address, target);
	}

	fn debit(
		balances: &mut HashMap<Address, U256>,
		account: &Address,
		amount: U256,
	) -> Result<(), HostError> {
		let available = balances.get(account).copied().unwrap_or_default();
		if available < amount {
			return Err(HostError::InsufficientBalance {
				account: *account,
				required: amount,
				available,
			});
		}
		balances.insert(*account, available - amount);
		Ok(())
	}

	fn credit(balances: &mut HashMap<Address, U256>, account: &Address, amount: U256) {
		let entry = balances.entry(*account).or_default();
		*entry = entry.saturating_add(amount);
	}
}

#[async_trait]
impl CallHost for InMemoryHost {
	async fn call(&self, call: RelayedCall) -> Result<CallOutcome, HostError> {
		if !call.value.is_zero() {
			let mut balances = self.balances.write().await;
			if Self::debit(&mut balances, &call.caller, call.value).is_err() {
				// A value call the caller cannot fund fails without running the target
				return Ok(CallOutcome::revert(Bytes::new()));
			}
			Self::credit(&mut balances, &call.target, call.value);
		}

		let target = self.targets.read().await.get(&call.target).cloned();
		let outcome = match target {
			Some(target) => target.call(&call),
			None => CallOutcome::success(Bytes::new()),
		};

		if !outcome.success && !call.value.is_zero() {
			let mut balances = self.balances.write().await;
			Self::debit(&mut balances, &call.target, call.value)?;
			Self::credit(&mut balances, &call.caller, call.value);
		}

		Ok(outcome)
	}

	async fn balance_of(&self, account: &Address) -> Result<U256, HostError> {
		Ok(self
			.balances
			.read()
			.await
			.get(account)
			.copied()
			.unwrap_or_default())
	}

	async fn transfer(&self, from: &Address, to: &Address, amount: U256) -> Result<(), HostError> {
		let mut balances = self.balances.write().await;
		Self::debit(&mut balances, from, amount)?;
		Self::credit(&mut balances, to, amount);
		Ok(())
	}
}
