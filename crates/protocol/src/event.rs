//! Events pushed by the wallet provider.

use serde::{Deserialize, Serialize};

use crate::address::{Address, ChainId};

/// Provider-originated notification, delivered in provider order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ProviderEvent {
	/// Authorized accounts changed; the first entry is the active account.
	/// An empty list means the wallet revoked access.
	AccountsChanged(Vec<Address>),
	ChainChanged(ChainId),
	/// The provider ended the session on its side.
	Disconnected,
	/// Unexpected provider failure.
	Fault(String),
}

impl ProviderEvent {
	pub fn name(&self) -> &'static str {
		match self {
			Self::AccountsChanged(_) => "accountsChanged",
			Self::ChainChanged(_) => "chainChanged",
			Self::Disconnected => "disconnect",
			Self::Fault(_) => "fault",
		}
	}
}
