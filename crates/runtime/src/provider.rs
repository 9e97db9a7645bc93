//! Boundary traits for the host, the connector backend and the wallet provider.
//!
//! The core never talks to a concrete transport. Injected extensions, relay
//! signers and embedded wallets all sit behind [`WalletProvider`]; which one
//! the user ends up with is decided by the modal the [`ConnectorBackend`]
//! builds from the [`ConnectorConfig`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use walletdash_protocol::{Address, Authorization, ChainId, ConnectorKind, ProviderEvent};

use crate::config::{ConnectorConfig, RegistrySettings};
use crate::error::Result;

/// Host execution context the connector runs inside.
pub trait HostEnvironment: Send + Sync {
	/// Whether the context exists yet. Construction is refused until it does.
	fn is_available(&self) -> bool;

	/// Origin reported to wallets as the application URL.
	fn origin(&self) -> Option<String>;
}

/// Host that is always available, for native processes.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
	origin: Option<String>,
}

impl StaticHost {
	pub fn new(origin: impl Into<String>) -> Self {
		Self {
			origin: Some(origin.into()),
		}
	}
}

impl HostEnvironment for StaticHost {
	fn is_available(&self) -> bool {
		true
	}

	fn origin(&self) -> Option<String> {
		self.origin.clone()
	}
}

/// Event-and-request interface of the wallet provider (the connection modal).
#[async_trait]
pub trait WalletProvider: Send + Sync {
	/// Accounts the provider currently exposes; empty when not authorized.
	async fn accounts(&self) -> Result<Vec<Address>>;

	/// Network the provider is currently on, if any.
	async fn chain_id(&self) -> Result<Option<ChainId>>;

	/// Connection method behind the current provider session.
	fn connector_kind(&self) -> Option<ConnectorKind>;

	/// Registers for account, chain, disconnect and fault notifications.
	///
	/// Events are delivered in provider order. The stream ends when the
	/// provider is dropped.
	fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent>;

	/// Opens the connection UI and waits for the user's decision.
	///
	/// Fails with `ConnectionRejected` or `ConnectionUnavailable`.
	async fn request_authorization(&self) -> Result<Authorization>;

	/// Ends the provider-side session.
	async fn disconnect(&self) -> Result<()>;
}

/// Constructs the connector configuration and the modal singleton.
///
/// Each call is a side-effecting construction; the registry guarantees it is
/// invoked at most once per initialization attempt.
#[async_trait]
pub trait ConnectorBackend: Send + Sync {
	async fn build_config(&self, settings: &RegistrySettings, origin: Option<&str>) -> Result<ConnectorConfig>;

	async fn create_modal(&self, config: Arc<ConnectorConfig>) -> Result<Arc<dyn WalletProvider>>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn static_host_is_available() {
		let host = StaticHost::new("https://dash.example");
		assert!(host.is_available());
		assert_eq!(host.origin().as_deref(), Some("https://dash.example"));
		assert_eq!(StaticHost::default().origin(), None);
	}
}
