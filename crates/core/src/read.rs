//! Read-provider boundary for identity-scoped external data.

use async_trait::async_trait;
use serde::Serialize;
use walletdash_protocol::{Address, Balance, ChainId, Identity, Nft, Transaction};

use crate::error::Result;

/// External source of balances, names and listings.
///
/// Every call may be slow or fail; the facade puts each one behind the
/// query cache so it runs at most once per staleness window.
#[async_trait]
pub trait ReadProvider: Send + Sync {
	/// Native-currency balance of `address` on `chain_id`.
	async fn balance(&self, address: &Address, chain_id: ChainId) -> Result<Balance>;

	/// Reverse-resolved name (ENS) of `address`, if it has one.
	async fn name(&self, address: &Address, chain_id: ChainId) -> Result<Option<String>>;

	async fn nfts(&self, address: &Address, chain_id: ChainId) -> Result<Vec<Nft>>;

	/// Transactions involving `address`, newest first.
	async fn transactions(&self, address: &Address, chain_id: ChainId) -> Result<Vec<Transaction>>;
}

/// A read result paired with the identity it was fetched for.
///
/// The identity may no longer be the connected one by the time the read
/// resolves; renderers compare it against the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scoped<T> {
	pub identity: Identity,
	pub value: T,
}

impl<T> Scoped<T> {
	/// Whether this result still belongs to `identity`.
	pub fn is_for(&self, identity: Option<&Identity>) -> bool {
		identity == Some(&self.identity)
	}

	pub fn into_value(self) -> T {
		self.value
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn identity(address: &str, chain: u64) -> Identity {
		Identity::new(Address::new(address).unwrap(), ChainId(chain))
	}

	#[test]
	fn scoped_matches_only_its_identity() {
		let alice = identity("0xAA00000000000000000000000000000000000011", 1);
		let scoped = Scoped {
			identity: alice.clone(),
			value: 7u32,
		};
		assert!(scoped.is_for(Some(&alice)));
		assert!(!scoped.is_for(Some(&identity("0xAA00000000000000000000000000000000000011", 137))));
		assert!(!scoped.is_for(None));
		assert_eq!(scoped.into_value(), 7);
	}

	#[test]
	fn scoped_serializes_identity_with_value() {
		let scoped = Scoped {
			identity: identity("0xAA00000000000000000000000000000000000011", 137),
			value: Balance::new(5, 18, "POL"),
		};
		let json = serde_json::to_value(&scoped).unwrap();
		assert_eq!(json["identity"]["chainId"], 137);
		assert_eq!(json["value"]["symbol"], "POL");
	}
}
