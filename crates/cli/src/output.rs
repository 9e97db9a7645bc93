use clap::ValueEnum;
use serde::Serialize;

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON; streaming commands print one object per line
	Json,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

/// Prints `value` as pretty JSON or via `text`.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
	match format {
		OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
		OutputFormat::Text => println!("{}", text(value)),
	}
	Ok(())
}

/// Prints one line: compact JSON or `text`.
pub fn emit_line<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
	match format {
		OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
		OutputFormat::Text => println!("{}", text(value)),
	}
	Ok(())
}
