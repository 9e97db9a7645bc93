//! Text rendering helpers.

use colored::{ColoredString, Colorize};
use walletdash::protocol::{Chain, SessionStatus, Snapshot};

pub fn status_label(status: SessionStatus) -> ColoredString {
	let label = status.as_str();
	match status {
		SessionStatus::Connected => label.green().bold(),
		SessionStatus::Connecting | SessionStatus::Initializing => label.yellow(),
		SessionStatus::UnsupportedNetwork => label.magenta().bold(),
		SessionStatus::Failed => label.red().bold(),
		SessionStatus::Uninitialized | SessionStatus::Disconnected => label.dimmed(),
	}
}

/// One line per snapshot: sequence, status, then whatever the status carries.
pub fn snapshot_line(snapshot: &Snapshot) -> String {
	let session = &snapshot.session;
	let mut line = format!("#{:<3} {}", snapshot.seq, status_label(session.status()));
	if let Some(identity) = session.identity() {
		let chain = Chain::known(identity.chain_id).map_or_else(|| identity.chain_id.to_string(), |c| c.name);
		line.push_str(&format!(" {} on {}", identity.address.short(), chain));
	}
	if let Some(chain) = session.unsupported_chain() {
		line.push_str(&format!(" chain {chain} is not supported"));
	}
	if let Some(error) = session.error() {
		line.push_str(&format!(" ({}: {})", format!("{:?}", error.kind).red(), error.message));
	}
	line
}

/// Age of `timestamp` relative to `now`, both in unix seconds.
pub fn relative_time(now: u64, timestamp: u64) -> String {
	let elapsed = now.saturating_sub(timestamp);
	let minutes = elapsed / 60;
	let hours = minutes / 60;
	let days = hours / 24;
	if minutes < 1 {
		"Just now".to_string()
	} else if hours < 1 {
		format!("{minutes}m ago")
	} else if days < 1 {
		format!("{hours}h ago")
	} else {
		format!("{days}d ago")
	}
}

pub fn heading(title: &str) -> String {
	format!("\n{}\n{}", title.bold(), "-".repeat(title.chars().count()))
}

pub fn chain_table(chains: &[Chain]) -> String {
	let mut out = format!("{:<8} {:<16} {:<8} {}", "ID", "NAME", "SYMBOL", "EXPLORER");
	for chain in chains {
		out.push_str(&format!(
			"\n{:<8} {:<16} {:<8} {}",
			chain.id, chain.name, chain.native_currency.symbol, chain.explorer_url
		));
	}
	out
}

#[cfg(test)]
mod tests {
	use walletdash::protocol::{Address, ChainId, ConnectorKind, Identity, Session};

	use super::*;

	fn plain() {
		colored::control::set_override(false);
	}

	#[test]
	fn relative_time_buckets() {
		assert_eq!(relative_time(1_000, 990), "Just now");
		assert_eq!(relative_time(10_000, 10_000 - 30 * 60), "30m ago");
		assert_eq!(relative_time(100_000, 100_000 - 2 * 3600), "2h ago");
		assert_eq!(relative_time(1_000_000, 1_000_000 - 3 * 86_400), "3d ago");
		assert_eq!(relative_time(5, 50), "Just now");
	}

	#[test]
	fn snapshot_line_shows_identity() {
		plain();
		let address = Address::new("0xAA00000000000000000000000000000000000011").unwrap();
		let snapshot = Snapshot {
			seq: 4,
			session: Session::connected(Identity::new(address, ChainId(137)), ConnectorKind::Injected),
		};
		assert_eq!(snapshot_line(&snapshot), "#4   connected 0xAA00...0011 on Polygon");

		let snapshot = Snapshot {
			seq: 5,
			session: Session::unsupported_network(ChainId(10)),
		};
		assert_eq!(snapshot_line(&snapshot), "#5   unsupported-network chain 10 is not supported");
	}

	#[test]
	fn chain_table_lists_every_chain() {
		plain();
		let table = chain_table(&Chain::defaults());
		assert_eq!(table.lines().count(), 4);
		assert!(table.contains("Arbitrum One"));
	}
}
