//! Supported network descriptions.

use serde::{Deserialize, Serialize};

use crate::address::ChainId;

/// Native currency of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
	pub name: String,
	pub symbol: String,
	pub decimals: u8,
}

impl NativeCurrency {
	fn ether(name: &str, symbol: &str) -> Self {
		Self {
			name: name.to_string(),
			symbol: symbol.to_string(),
			decimals: 18,
		}
	}
}

/// A network the connector is configured to accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
	pub id: ChainId,
	pub name: String,
	pub native_currency: NativeCurrency,
	/// Block explorer root, without a trailing slash.
	pub explorer_url: String,
}

impl Chain {
	pub fn mainnet() -> Self {
		Self {
			id: ChainId(1),
			name: "Ethereum".to_string(),
			native_currency: NativeCurrency::ether("Ether", "ETH"),
			explorer_url: "https://etherscan.io".to_string(),
		}
	}

	pub fn polygon() -> Self {
		Self {
			id: ChainId(137),
			name: "Polygon".to_string(),
			native_currency: NativeCurrency::ether("POL", "POL"),
			explorer_url: "https://polygonscan.com".to_string(),
		}
	}

	pub fn arbitrum() -> Self {
		Self {
			id: ChainId(42161),
			name: "Arbitrum One".to_string(),
			native_currency: NativeCurrency::ether("Ether", "ETH"),
			explorer_url: "https://arbiscan.io".to_string(),
		}
	}

	/// Default dashboard networks, in display order.
	pub fn defaults() -> Vec<Chain> {
		vec![Self::mainnet(), Self::polygon(), Self::arbitrum()]
	}

	/// Looks up a well-known chain by id.
	pub fn known(id: ChainId) -> Option<Chain> {
		Self::defaults().into_iter().find(|chain| chain.id == id)
	}

	/// Explorer link for a transaction hash.
	pub fn tx_url(&self, hash: &str) -> String {
		format!("{}/tx/{hash}", self.explorer_url.trim_end_matches('/'))
	}

	/// Explorer link for an account page.
	pub fn address_url(&self, address: &str) -> String {
		format!("{}/address/{address}", self.explorer_url.trim_end_matches('/'))
	}
}
