use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use colored::Colorize;
use serde::Serialize;
use tracing::warn;
use walletdash::fake::FakeWalletBuilder;
use walletdash::protocol::{Address, ChainId, SessionStatus};
use walletdash::{ConnectOutcome, ReadProvider, SessionFacade};

use crate::context::CommandContext;
use crate::output::{self, OutputFormat};
use crate::render;
use crate::simulated::{DEMO_ADDRESS, SimulatedReads};

const READ_LATENCY: Duration = Duration::from_millis(50);
const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
	final_status: SessionStatus,
	snapshots: u64,
	balance_reads: usize,
	provider_calls: usize,
	authorization_requests: usize,
}

fn step(format: OutputFormat, message: &str) {
	if format == OutputFormat::Text {
		println!("{} {message}", "==>".cyan().bold());
	}
}

pub async fn execute(ctx: &CommandContext, reject_first: bool, switch_to: ChainId) -> anyhow::Result<()> {
	let format = ctx.format;
	let (parts, controller) = FakeWalletBuilder::new().build();
	let facade = SessionFacade::new(ctx.settings.clone(), parts.host, parts.backend);

	let subscription = facade.subscribe(move |snapshot| {
		if let Err(err) = output::emit_line(format, snapshot, render::snapshot_line) {
			warn!(target = "walletdash.cli", error = %err, "failed to print snapshot");
		}
	});

	step(format, "initializing wallet session");
	let snapshot = facade.initialize().await;
	if let Some(error) = snapshot.session.error() {
		bail!("wallet session failed to initialize: {error}");
	}

	let address = Address::new(DEMO_ADDRESS)?;
	let home = facade
		.config()
		.and_then(|config| config.default_chain().map(|chain| chain.id))
		.unwrap_or(ChainId(1));

	if reject_first {
		step(format, "requesting connection (wallet declines)");
		controller.reject_next("User rejected the request.");
		let outcome = facade.request_connection().await;
		if !matches!(outcome, ConnectOutcome::Rejected(_)) {
			bail!("expected a rejection, got {outcome:?}");
		}
	}

	step(format, "requesting connection");
	controller.approve_next(address, home);
	let outcome = facade.request_connection().await;
	if !outcome.is_connected() {
		bail!("wallet did not connect: {outcome:?}");
	}

	let simulated = Arc::new(SimulatedReads::new().with_latency(READ_LATENCY));
	let reads: Arc<dyn ReadProvider> = simulated.clone();
	let mut balance_reads = 0;
	for _ in 0..2 {
		let balance = facade.balance(&reads).await?;
		balance_reads += 1;
		step(
			format,
			&format!(
				"balance {} {} (provider calls so far: {})",
				balance.value.formatted(),
				balance.value.symbol,
				simulated.calls()
			),
		);
	}

	step(format, &format!("wallet switches to chain {switch_to}"));
	controller.switch_chain(switch_to);
	let snapshot = tokio::time::timeout(
		EVENT_TIMEOUT,
		facade.wait_for(|s| s.session.chain_id() == Some(switch_to) || s.status() == SessionStatus::UnsupportedNetwork),
	)
	.await
	.context("wallet did not report the chain switch")?;

	if snapshot.status() == SessionStatus::Connected {
		let balance = facade.balance(&reads).await?;
		balance_reads += 1;
		step(
			format,
			&format!(
				"balance {} {} (provider calls so far: {})",
				balance.value.formatted(),
				balance.value.symbol,
				simulated.calls()
			),
		);
	} else {
		step(format, "reads are paused until the wallet returns to a supported chain");
	}

	step(format, "disconnecting");
	facade.request_disconnection().await;
	facade.unsubscribe(subscription);

	let summary = Summary {
		final_status: facade.snapshot().status(),
		snapshots: facade.snapshot().seq,
		balance_reads,
		provider_calls: simulated.calls(),
		authorization_requests: controller.authorization_requests(),
	};
	output::emit_line(format, &summary, |s| {
		format!(
			"{} {} balance reads, {} provider calls, {} authorization requests",
			"done:".green().bold(),
			s.balance_reads,
			s.provider_calls,
			s.authorization_requests
		)
	})
}
