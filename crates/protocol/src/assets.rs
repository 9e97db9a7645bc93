//! Read models returned by balance, NFT and history providers.

use serde::{Deserialize, Serialize};

use crate::address::{Address, ChainId};
use crate::format::format_units;

/// Fractional digits shown for balances on cards.
pub const BALANCE_DISPLAY_PLACES: usize = 4;

/// Native or token balance in base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
	pub value: u128,
	pub decimals: u8,
	pub symbol: String,
}

impl Balance {
	pub fn new(value: u128, decimals: u8, symbol: impl Into<String>) -> Self {
		Self {
			value,
			decimals,
			symbol: symbol.into(),
		}
	}

	/// Balance rounded for display, e.g. `"2.5000"`.
	pub fn formatted(&self) -> String {
		format_units(self.value, self.decimals, BALANCE_DISPLAY_PLACES)
	}
}

/// A non-fungible token held by the address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nft {
	pub id: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	pub image: String,
	pub collection: String,
	pub token_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
	Send,
	Receive,
	Swap,
	Mint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
	Success,
	Pending,
	Failed,
}

/// One entry of the transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
	pub hash: String,
	pub kind: TransactionKind,
	pub amount: String,
	pub token: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<Address>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<Address>,
	pub chain_id: ChainId,
	/// Unix seconds.
	pub timestamp: u64,
	pub status: TransactionStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_used: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fiat_value: Option<String>,
}

impl Transaction {
	/// Counterparty shown in history rows: sender for receives, recipient otherwise.
	pub fn counterparty(&self) -> Option<&Address> {
		match self.kind {
			TransactionKind::Receive => self.from.as_ref(),
			_ => self.to.as_ref(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
	Notification,
	Alert,
	Info,
	Achievement,
}

/// Feed item shown next to the transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
	pub id: String,
	pub kind: ActivityKind,
	pub title: String,
	pub message: String,
	pub timestamp: u64,
	pub read: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub action_url: Option<String>,
}
