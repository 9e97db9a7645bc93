//! Demo read provider and activity feed.
//!
//! Values are derived from the address so repeated runs print the same
//! dashboard. Each call sleeps for a configurable latency, like a remote
//! indexer would, and is counted so cache hits are visible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use walletdash::protocol::{
	Activity, ActivityKind, Address, Balance, Chain, ChainId, Nft, Transaction, TransactionKind, TransactionStatus,
};
use walletdash::{ReadProvider, Result};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Address used by the `demo` command.
pub const DEMO_ADDRESS: &str = "0xAA00000000000000000000000000000000000011";

pub fn unix_now() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct SimulatedReads {
	latency: Duration,
	names: HashMap<String, String>,
	calls: AtomicUsize,
}

impl SimulatedReads {
	pub fn new() -> Self {
		Self::default().with_name("0xd8da6bf26964af9d7eed9e03e53415d37aa96045", "vitalik.eth")
	}

	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = latency;
		self
	}

	/// Registers a reverse-resolution record (mainnet only).
	pub fn with_name(mut self, address: &str, name: &str) -> Self {
		self.names.insert(address.to_ascii_lowercase(), name.to_string());
		self
	}

	/// Provider calls served so far.
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	async fn serve(&self) {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if !self.latency.is_zero() {
			tokio::time::sleep(self.latency).await;
		}
	}
}

/// Balance in tenths of the native unit, 0.1 to 5.0, stable per address.
fn demo_balance(address: &Address, chain_id: ChainId) -> u128 {
	let digits: u64 = address
		.as_str()
		.trim_start_matches("0x")
		.chars()
		.filter_map(|c| c.to_digit(16))
		.map(u64::from)
		.sum();
	let tenths = (digits + chain_id.0) % 50 + 1;
	u128::from(tenths) * 100_000_000_000_000_000
}

fn svg_placeholder(label: &str, from: &str, to: &str) -> String {
	format!(
		"data:image/svg+xml;utf8,<svg width='400' height='400' xmlns='http://www.w3.org/2000/svg'>\
		 <defs><linearGradient id='g'><stop offset='0%' stop-color='{from}'/><stop offset='100%' stop-color='{to}'/></linearGradient></defs>\
		 <rect width='400' height='400' fill='url(%23g)'/>\
		 <text x='50%' y='50%' text-anchor='middle' fill='white' font-size='24px'>{label}</text></svg>"
	)
}

fn nft(id: &str, name: &str, description: &str, collection: &str, token_id: &str, colors: (&str, &str)) -> Nft {
	Nft {
		id: id.to_string(),
		name: name.to_string(),
		description: Some(description.to_string()),
		image: svg_placeholder(collection, colors.0, colors.1),
		collection: collection.to_string(),
		token_id: token_id.to_string(),
	}
}

fn counterparty(s: &str) -> Option<Address> {
	Address::new(s).ok()
}

/// History as of `now`, newest first.
pub fn demo_transactions(chain_id: ChainId, now: u64) -> Vec<Transaction> {
	let tx = |hash: &str, kind, amount: &str, token: &str, age: u64, gas: u64, fiat: &str| Transaction {
		hash: hash.to_string(),
		kind,
		amount: amount.to_string(),
		token: token.to_string(),
		from: None,
		to: None,
		chain_id,
		timestamp: now.saturating_sub(age),
		status: TransactionStatus::Success,
		gas_used: Some(gas),
		fiat_value: Some(fiat.to_string()),
	};

	vec![
		Transaction {
			from: counterparty("0xabcdef1234567890abcdef1234567890abcdef12"),
			..tx(
				"0x1234567890abcdef1234567890abcdef12345678",
				TransactionKind::Receive,
				"0.5",
				"ETH",
				30 * MINUTE,
				21_000,
				"$1,234.56",
			)
		},
		Transaction {
			to: counterparty("0x1234567890abcdef1234567890abcdef12345678"),
			..tx(
				"0xabcdef1234567890abcdef1234567890abcdef12",
				TransactionKind::Send,
				"100",
				"USDC",
				2 * HOUR,
				45_000,
				"$100.00",
			)
		},
		tx(
			"0x9876543210fedcba9876543210fedcba98765432",
			TransactionKind::Swap,
			"1000",
			"USDT → ETH",
			DAY,
			120_000,
			"$1,000.00",
		),
		tx(
			"0xfedcba9876543210fedcba9876543210fedcba98",
			TransactionKind::Mint,
			"1",
			"NFT",
			3 * DAY,
			85_000,
			"$0.05",
		),
	]
}

/// Notification feed as of `now`, newest first.
pub fn demo_activity(now: u64) -> Vec<Activity> {
	let item = |id: &str, kind, title: &str, message: &str, age: u64, read: bool| Activity {
		id: id.to_string(),
		kind,
		title: title.to_string(),
		message: message.to_string(),
		timestamp: now.saturating_sub(age),
		read,
		action_url: None,
	};

	vec![
		item(
			"1",
			ActivityKind::Achievement,
			"Portfolio Milestone",
			"Your portfolio has reached a new all-time high!",
			15 * MINUTE,
			false,
		),
		item(
			"2",
			ActivityKind::Notification,
			"New NFT Received",
			"You received a new NFT in your collection: Cool Cat #1234",
			HOUR,
			false,
		),
		item(
			"3",
			ActivityKind::Alert,
			"Gas Price Alert",
			"Gas prices have dropped below 50 gwei. Good time to make transactions!",
			2 * HOUR,
			true,
		),
		item(
			"4",
			ActivityKind::Info,
			"Market Update",
			"ETH price has increased by 5.2% in the last 24 hours",
			6 * HOUR,
			true,
		),
		item(
			"5",
			ActivityKind::Notification,
			"Transaction Confirmed",
			"Your swap of 1000 USDT to ETH has been confirmed",
			DAY,
			true,
		),
	]
}

#[async_trait]
impl ReadProvider for SimulatedReads {
	async fn balance(&self, address: &Address, chain_id: ChainId) -> Result<Balance> {
		self.serve().await;
		let symbol = Chain::known(chain_id).map_or_else(|| "ETH".to_string(), |chain| chain.native_currency.symbol);
		Ok(Balance::new(demo_balance(address, chain_id), 18, symbol))
	}

	async fn name(&self, address: &Address, chain_id: ChainId) -> Result<Option<String>> {
		self.serve().await;
		if chain_id != ChainId(1) {
			return Ok(None);
		}
		Ok(self.names.get(&address.as_str().to_ascii_lowercase()).cloned())
	}

	async fn nfts(&self, _address: &Address, _chain_id: ChainId) -> Result<Vec<Nft>> {
		self.serve().await;
		Ok(vec![
			nft(
				"1",
				"Cool Cat #1234",
				"A cool cat from the Cool Cats collection",
				"Cool Cats",
				"1234",
				("#6366f1", "#8b5cf6"),
			),
			nft(
				"2",
				"Bored Ape #5678",
				"A bored ape from the BAYC collection",
				"Bored Ape Yacht Club",
				"5678",
				("#f59e0b", "#ef4444"),
			),
			nft("3", "Doodle #9999", "A colorful doodle", "Doodles", "9999", ("#10b981", "#0f766e")),
		])
	}

	async fn transactions(&self, _address: &Address, chain_id: ChainId) -> Result<Vec<Transaction>> {
		self.serve().await;
		Ok(demo_transactions(chain_id, unix_now()))
	}
}
