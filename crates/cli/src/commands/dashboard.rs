use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use colored::Colorize;
use serde::Serialize;
use tracing::info;
use walletdash::fake::FakeWalletBuilder;
use walletdash::protocol::{Activity, Address, Chain, ChainId, Nft, SessionStatus, Transaction, zero_amount};
use walletdash::{ConnectOutcome, ReadProvider, SessionFacade};

use crate::context::CommandContext;
use crate::output;
use crate::render;
use crate::simulated::{SimulatedReads, demo_activity, unix_now};

const READ_LATENCY: Duration = Duration::from_millis(25);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
	pub wallet: WalletHeader,
	pub cards: Vec<BalanceCard>,
	pub nfts: Vec<Nft>,
	pub transactions: Vec<TransactionRow>,
	pub activity: Vec<Activity>,
	pub generated_at: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletHeader {
	pub display_name: String,
	pub address: Address,
	pub short_address: String,
	pub badge: String,
	pub chain_id: ChainId,
	pub chain_name: String,
	pub explorer_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceCard {
	pub title: String,
	pub value: String,
	pub unit: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fiat: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub change: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRow {
	#[serde(flatten)]
	pub transaction: Transaction,
	pub explorer_url: String,
}

pub async fn execute(ctx: &CommandContext, address: Address, chain_id: ChainId, limit: usize) -> anyhow::Result<()> {
	let (parts, controller) = FakeWalletBuilder::new().build();
	let facade = SessionFacade::new(ctx.settings.clone(), parts.host, parts.backend);

	let snapshot = facade.initialize().await;
	if let Some(error) = snapshot.session.error() {
		bail!("wallet session failed to initialize: {error}");
	}

	controller.approve_next(address, chain_id);
	match facade.request_connection().await {
		ConnectOutcome::Connected(account) => {
			info!(target = "walletdash.cli", address = %account.address, chain = %account.chain_id, "wallet connected");
		}
		other => bail!("wallet did not connect: {other:?}"),
	}
	let snapshot = facade.snapshot();
	if snapshot.status() == SessionStatus::UnsupportedNetwork {
		facade.request_disconnection().await;
		bail!("chain {chain_id} is not configured; run `walletdash chains` for the supported list");
	}

	let reads: Arc<dyn ReadProvider> = Arc::new(SimulatedReads::new().with_latency(READ_LATENCY));
	let (balance, name, nfts, transactions) = tokio::try_join!(
		facade.balance(&reads),
		facade.ens_name(&reads),
		facade.nfts(&reads),
		facade.transactions(&reads),
	)
	.context("loading dashboard data")?;

	let identity = balance.identity.clone();
	let chain = facade
		.config()
		.and_then(|config| config.chain(identity.chain_id).cloned())
		.or_else(|| Chain::known(identity.chain_id))
		.with_context(|| format!("chain {} has no metadata", identity.chain_id))?;

	let balance = balance.into_value();
	let nfts = nfts.into_value();
	let overview = Overview {
		wallet: WalletHeader {
			display_name: name.into_value().unwrap_or_else(|| "Anonymous User".to_string()),
			short_address: identity.address.short(),
			badge: identity.address.badge(),
			explorer_url: chain.address_url(identity.address.as_str()),
			address: identity.address,
			chain_id: identity.chain_id,
			chain_name: chain.name.clone(),
		},
		cards: vec![
			BalanceCard {
				title: format!("{} Balance", balance.symbol),
				value: balance.formatted(),
				unit: balance.symbol.clone(),
				fiat: Some("$0.00".to_string()),
				change: Some("+0.00%".to_string()),
			},
			BalanceCard {
				title: "Total Tokens".to_string(),
				value: "0".to_string(),
				unit: "TOKENS".to_string(),
				fiat: None,
				change: None,
			},
			BalanceCard {
				title: "NFTs Owned".to_string(),
				value: nfts.len().to_string(),
				unit: "NFTs".to_string(),
				fiat: None,
				change: None,
			},
		],
		nfts,
		transactions: transactions
			.into_value()
			.into_iter()
			.take(limit)
			.map(|transaction| TransactionRow {
				explorer_url: chain.tx_url(&transaction.hash),
				transaction,
			})
			.collect(),
		activity: demo_activity(unix_now()),
		generated_at: unix_now(),
	};

	output::emit(ctx.format, &overview, render_overview)?;
	facade.request_disconnection().await;
	Ok(())
}

fn render_overview(overview: &Overview) -> String {
	let now = overview.generated_at;
	let wallet = &overview.wallet;
	let mut out = format!(
		"[{}] {}  {}  {}",
		wallet.badge,
		wallet.display_name.bold(),
		wallet.short_address,
		wallet.chain_name.cyan()
	);

	out.push_str(&render::heading("Balances"));
	for card in &overview.cards {
		let value = if card.value.is_empty() { zero_amount(4) } else { card.value.clone() };
		out.push_str(&format!("\n{:<14} {} {}", card.title, value.bold(), card.unit));
		if let (Some(fiat), Some(change)) = (&card.fiat, &card.change) {
			out.push_str(&format!("  {fiat} {}", change.green()));
		}
	}

	out.push_str(&render::heading("NFTs"));
	for nft in &overview.nfts {
		out.push_str(&format!("\n{:<16} {} #{}", nft.name, nft.collection.dimmed(), nft.token_id));
	}

	out.push_str(&render::heading("Recent transactions"));
	for row in &overview.transactions {
		let tx = &row.transaction;
		let counterparty = tx.counterparty().map(|a| a.short()).unwrap_or_default();
		out.push_str(&format!(
			"\n{:<8} {:>8} {:<12} {:<14} {:>10}  {}",
			format!("{:?}", tx.kind).to_lowercase(),
			tx.amount,
			tx.token,
			counterparty,
			render::relative_time(now, tx.timestamp),
			row.explorer_url.dimmed()
		));
	}

	out.push_str(&render::heading("Activity"));
	for item in &overview.activity {
		let marker = if item.read { " " } else { "*" };
		out.push_str(&format!(
			"\n{marker} {:<22} {:>8}  {}",
			item.title.bold(),
			render::relative_time(now, item.timestamp),
			item.message
		));
	}
	out
}
