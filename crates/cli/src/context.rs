use std::path::Path;

use anyhow::Context;
use tracing::debug;
use walletdash::RegistrySettings;

use crate::output::OutputFormat;

/// Settings and output options shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
	pub settings: RegistrySettings,
	pub format: OutputFormat,
}

impl CommandContext {
	pub fn new(config: Option<&Path>, format: OutputFormat) -> anyhow::Result<Self> {
		let settings = match config {
			Some(path) => {
				debug!(target = "walletdash.cli", path = %path.display(), "loading connector settings");
				RegistrySettings::load(path).with_context(|| format!("loading {}", path.display()))?
			}
			None => RegistrySettings::from_env(),
		};
		settings.validate().context("connector settings are invalid")?;
		Ok(Self { settings, format })
	}
}
