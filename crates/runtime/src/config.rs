//! Connector settings and the immutable configuration built from them.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walletdash_protocol::{Chain, ChainId, ConnectorKind};

use crate::error::{Error, Result};

/// Environment variable holding the relay project identity.
pub const PROJECT_ID_ENV: &str = "WALLETCONNECT_PROJECT_ID";

/// Project id used when none is configured. Relay connections are rejected
/// by the relay for this id, but injected wallets keep working.
pub const DEMO_PROJECT_ID: &str = "demo-project-id";

/// Application identity shown by wallets during authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
	pub name: String,
	pub description: String,
	/// Empty means "use the host origin".
	pub url: String,
	pub icons: Vec<String>,
}

impl Default for AppMetadata {
	fn default() -> Self {
		Self {
			name: "Web3 SaaS Dashboard".to_string(),
			description: "A comprehensive Web3 dashboard for managing your crypto assets".to_string(),
			url: String::new(),
			icons: vec!["https://avatars.githubusercontent.com/u/37784886".to_string()],
		}
	}
}

/// Which connection methods the connector offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectorToggles {
	pub wallet_connect: bool,
	pub injected: bool,
	/// Multi-injected-provider discovery.
	pub eip6963: bool,
	pub coinbase: bool,
}

impl Default for ConnectorToggles {
	fn default() -> Self {
		Self {
			wallet_connect: true,
			injected: true,
			eip6963: true,
			coinbase: true,
		}
	}
}

impl ConnectorToggles {
	fn methods(&self) -> Vec<ConnectorMethod> {
		let mut methods = Vec::new();
		if self.wallet_connect {
			methods.push(ConnectorMethod::WalletConnect);
		}
		if self.injected {
			methods.push(ConnectorMethod::Injected);
		}
		if self.eip6963 {
			methods.push(ConnectorMethod::Eip6963);
		}
		if self.coinbase {
			methods.push(ConnectorMethod::Coinbase);
		}
		methods
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
	#[default]
	Dark,
	Light,
}

/// Presentation options for the connection modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModalOptions {
	pub theme_mode: ThemeMode,
	pub accent_color: String,
	/// Accent mix strength, 0..=100.
	pub accent_strength: u8,
	pub enable_analytics: bool,
}

impl Default for ModalOptions {
	fn default() -> Self {
		Self {
			theme_mode: ThemeMode::Dark,
			accent_color: "#6366f1".to_string(),
			accent_strength: 20,
			enable_analytics: false,
		}
	}
}

/// User-facing connector settings, validated once by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistrySettings {
	pub project_id: String,
	pub metadata: AppMetadata,
	/// Supported chains in display order. The first is the default chain.
	pub chains: Vec<Chain>,
	pub connectors: ConnectorToggles,
	pub modal: ModalOptions,
}

impl Default for RegistrySettings {
	fn default() -> Self {
		Self {
			project_id: DEMO_PROJECT_ID.to_string(),
			metadata: AppMetadata::default(),
			chains: Chain::defaults(),
			connectors: ConnectorToggles::default(),
			modal: ModalOptions::default(),
		}
	}
}

impl RegistrySettings {
	/// Defaults with the project id taken from [`PROJECT_ID_ENV`] when set.
	pub fn from_env() -> Self {
		let project_id = std::env::var(PROJECT_ID_ENV)
			.ok()
			.filter(|value| !value.trim().is_empty())
			.unwrap_or_else(|| DEMO_PROJECT_ID.to_string());
		Self {
			project_id,
			..Self::default()
		}
	}

	/// Loads settings from a JSON file. Missing fields take their defaults.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
		Self::from_json(&content)
	}

	pub fn from_json(content: &str) -> Result<Self> {
		serde_json::from_str(content).map_err(|e| Error::InvalidConfig(e.to_string()))
	}

	pub fn validate(&self) -> Result<()> {
		if self.project_id.trim().is_empty() {
			return Err(Error::InvalidConfig("project id is empty".to_string()));
		}
		if self.chains.is_empty() {
			return Err(Error::InvalidConfig("at least one chain is required".to_string()));
		}
		let mut seen = HashSet::new();
		for chain in &self.chains {
			if !seen.insert(chain.id) {
				return Err(Error::InvalidConfig(format!("chain {} is listed twice", chain.id)));
			}
		}
		if self.connectors.methods().is_empty() {
			return Err(Error::InvalidConfig("every connection method is disabled".to_string()));
		}
		if self.modal.accent_strength > 100 {
			return Err(Error::InvalidConfig(format!(
				"accent strength {} is outside 0..=100",
				self.modal.accent_strength
			)));
		}
		Ok(())
	}
}

/// Connection method offered by the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectorMethod {
	WalletConnect,
	Injected,
	Eip6963,
	Coinbase,
}

impl ConnectorMethod {
	pub fn kind(&self) -> ConnectorKind {
		match self {
			Self::WalletConnect => ConnectorKind::WalletConnect,
			Self::Injected | Self::Eip6963 => ConnectorKind::Injected,
			Self::Coinbase => ConnectorKind::Embedded,
		}
	}
}

/// Immutable connector configuration published by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
	pub project_id: String,
	pub metadata: AppMetadata,
	pub chains: Vec<Chain>,
	pub methods: Vec<ConnectorMethod>,
	pub modal: ModalOptions,
}

impl ConnectorConfig {
	/// Builds the configuration from validated settings, filling the metadata
	/// URL from the host origin when the settings leave it empty.
	pub fn from_settings(settings: &RegistrySettings, origin: Option<&str>) -> Result<Self> {
		settings.validate()?;
		let mut metadata = settings.metadata.clone();
		if metadata.url.is_empty() {
			metadata.url = origin.unwrap_or_default().to_string();
		}
		Ok(Self {
			project_id: settings.project_id.clone(),
			metadata,
			chains: settings.chains.clone(),
			methods: settings.connectors.methods(),
			modal: settings.modal.clone(),
		})
	}

	pub fn supports_chain(&self, id: ChainId) -> bool {
		self.chains.iter().any(|chain| chain.id == id)
	}

	pub fn chain(&self, id: ChainId) -> Option<&Chain> {
		self.chains.iter().find(|chain| chain.id == id)
	}

	pub fn default_chain(&self) -> Option<&Chain> {
		self.chains.first()
	}

	pub fn offers(&self, kind: ConnectorKind) -> bool {
		self.methods.iter().any(|method| method.kind() == kind)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_validate() {
		let settings = RegistrySettings::default();
		assert!(settings.validate().is_ok());
		assert_eq!(settings.project_id, DEMO_PROJECT_ID);
		assert_eq!(settings.chains.len(), 3);
	}

	#[test]
	fn rejects_bad_settings() {
		let mut settings = RegistrySettings {
			project_id: "  ".to_string(),
			..RegistrySettings::default()
		};
		assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));

		settings.project_id = "abc".to_string();
		settings.chains.push(Chain::mainnet());
		let err = settings.validate().unwrap_err();
		assert!(err.to_string().contains("listed twice"));

		settings.chains = Vec::new();
		assert!(settings.validate().is_err());

		settings.chains = Chain::defaults();
		settings.connectors = ConnectorToggles {
			wallet_connect: false,
			injected: false,
			eip6963: false,
			coinbase: false,
		};
		assert!(settings.validate().unwrap_err().to_string().contains("disabled"));
	}

	#[test]
	fn config_fills_origin_and_methods() {
		let settings = RegistrySettings::default();
		let config = ConnectorConfig::from_settings(&settings, Some("https://dash.example")).unwrap();
		assert_eq!(config.metadata.url, "https://dash.example");
		assert_eq!(
			config.methods,
			vec![
				ConnectorMethod::WalletConnect,
				ConnectorMethod::Injected,
				ConnectorMethod::Eip6963,
				ConnectorMethod::Coinbase
			]
		);
		assert!(config.supports_chain(ChainId(137)));
		assert!(!config.supports_chain(ChainId(10)));
		assert_eq!(config.default_chain().map(|c| c.id), Some(ChainId(1)));
		assert!(config.offers(ConnectorKind::Embedded));
	}

	#[test]
	fn explicit_metadata_url_wins() {
		let mut settings = RegistrySettings::default();
		settings.metadata.url = "https://fixed.example".to_string();
		let config = ConnectorConfig::from_settings(&settings, Some("https://origin.example")).unwrap();
		assert_eq!(config.metadata.url, "https://fixed.example");
	}

	#[test]
	fn partial_json_takes_defaults() {
		let settings = RegistrySettings::from_json(r#"{"projectId":"p-1","connectors":{"coinbase":false}}"#).unwrap();
		assert_eq!(settings.project_id, "p-1");
		assert!(!settings.connectors.coinbase);
		assert!(settings.connectors.injected);
		assert_eq!(settings.chains, Chain::defaults());
		assert!(RegistrySettings::from_json("not json").is_err());
	}
}
