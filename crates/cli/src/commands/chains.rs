use crate::context::CommandContext;
use crate::output;
use crate::render;

pub fn execute(ctx: &CommandContext) -> anyhow::Result<()> {
	output::emit(ctx.format, &ctx.settings.chains, |chains| render::chain_table(chains))
}
