mod chains;
mod dashboard;
mod demo;

use crate::cli::Commands;
use crate::context::CommandContext;

pub async fn dispatch(command: Commands, ctx: &CommandContext) -> anyhow::Result<()> {
	match command {
		Commands::Chains => chains::execute(ctx),
		Commands::Demo { reject_first, switch_to } => demo::execute(ctx, reject_first, switch_to).await,
		Commands::Dashboard { address, chain, limit } => dashboard::execute(ctx, address, chain, limit).await,
	}
}
