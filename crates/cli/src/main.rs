use clap::Parser;
use tracing::error;
use walletdash_cli::cli::Cli;
use walletdash_cli::context::CommandContext;
use walletdash_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let result = match CommandContext::new(cli.config.as_deref(), cli.format) {
		Ok(ctx) => commands::dispatch(cli.command, &ctx).await,
		Err(err) => Err(err),
	};

	if let Err(err) = result {
		error!(target = "walletdash.cli", error = %format!("{err:#}"), "command failed");
		std::process::exit(1);
	}
}
