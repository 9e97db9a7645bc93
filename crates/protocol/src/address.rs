//! Wallet addresses and network identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Characters kept on each side of an abbreviated address (`0x1234...5678`).
const SHORT_PREFIX_LEN: usize = 6;
const SHORT_SUFFIX_LEN: usize = 4;

/// Rejected address input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
	#[error("address is empty")]
	Empty,
	#[error("address contains a reserved character: {0:?}")]
	ReservedCharacter(char),
	#[error("not a 20-byte hex address: {0}")]
	NotHex(String),
}

/// Wallet identifier as reported by the provider.
///
/// The value is kept exactly as the provider delivered it. Construction only
/// rejects input that would corrupt a cache key (empty, whitespace or `:`);
/// use [`Address::parse_hex`] when the input must be a 0x-prefixed EVM address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
	pub fn new(value: impl Into<String>) -> Result<Self, AddressError> {
		let value = value.into();
		if value.is_empty() {
			return Err(AddressError::Empty);
		}
		if let Some(c) = value.chars().find(|c| *c == ':' || c.is_whitespace()) {
			return Err(AddressError::ReservedCharacter(c));
		}
		Ok(Self(value))
	}

	/// Parses a strict `0x` + 40 hex digit address.
	pub fn parse_hex(value: &str) -> Result<Self, AddressError> {
		let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"));
		match digits {
			Some(d) if d.len() == 40 && d.chars().all(|c| c.is_ascii_hexdigit()) => Self::new(value),
			_ => Err(AddressError::NotHex(value.to_string())),
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Abbreviated form for headers and tables, e.g. `0x1234...5678`.
	///
	/// Addresses too short to abbreviate are returned unchanged.
	pub fn short(&self) -> String {
		let s = self.0.as_str();
		if s.len() <= SHORT_PREFIX_LEN + SHORT_SUFFIX_LEN || !s.is_ascii() {
			return s.to_string();
		}
		format!("{}...{}", &s[..SHORT_PREFIX_LEN], &s[s.len() - SHORT_SUFFIX_LEN..])
	}

	/// Two-letter avatar badge taken from the first bytes after `0x`.
	pub fn badge(&self) -> String {
		self.0.trim_start_matches("0x").chars().take(2).collect::<String>().to_uppercase()
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for Address {
	type Err = AddressError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

impl TryFrom<String> for Address {
	type Error = AddressError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl From<Address> for String {
	fn from(value: Address) -> Self {
		value.0
	}
}

/// Numeric network identifier (EIP-155 chain id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for ChainId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.trim().parse().map(ChainId)
	}
}

impl From<u64> for ChainId {
	fn from(value: u64) -> Self {
		ChainId(value)
	}
}
