use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use walletdash::protocol::{Address, ChainId};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "walletdash")]
#[command(about = "Wallet session dashboard backed by a simulated wallet")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = ArgAction::Count)]
	pub verbose: u8,

	/// Connector settings file (JSON). Without it settings come from the environment
	#[arg(short, long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List the configured chains
	Chains,

	/// Walk a simulated wallet through the whole session lifecycle
	Demo {
		/// Decline the first connection request
		#[arg(long)]
		reject_first: bool,

		/// Chain the wallet switches to mid-session
		#[arg(long, value_name = "CHAIN", default_value_t = ChainId(137))]
		switch_to: ChainId,
	},

	/// Connect a simulated wallet and print the dashboard overview
	#[command(alias = "dash")]
	Dashboard {
		/// Wallet address (0x-prefixed, 20 bytes)
		#[arg(short, long, value_parser = parse_address)]
		address: Address,

		/// Chain the wallet is on
		#[arg(long, default_value_t = ChainId(1))]
		chain: ChainId,

		/// Transactions shown
		#[arg(long, default_value_t = 5)]
		limit: usize,
	},
}

fn parse_address(value: &str) -> Result<Address, String> {
	Address::parse_hex(value).map_err(|e| e.to_string())
}
