//! The canonical session record and its sequence-numbered snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::{Address, ChainId};

/// Lifecycle position of the wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
	Uninitialized,
	Initializing,
	Disconnected,
	Connecting,
	Connected,
	/// Wallet is authorized but sits on a chain outside the configured list.
	UnsupportedNetwork,
	Failed,
}

impl SessionStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Uninitialized => "uninitialized",
			Self::Initializing => "initializing",
			Self::Disconnected => "disconnected",
			Self::Connecting => "connecting",
			Self::Connected => "connected",
			Self::UnsupportedNetwork => "unsupported-network",
			Self::Failed => "failed",
		}
	}

	/// Whether the registry has finished (successfully or not) bringing up the connector.
	pub fn is_settled(&self) -> bool {
		!matches!(self, Self::Uninitialized | Self::Initializing)
	}
}

impl fmt::Display for SessionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Connection method used to authorize the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectorKind {
	/// Browser extension injected into the host (EIP-1193 / EIP-6963).
	Injected,
	/// Relay-based remote signer.
	WalletConnect,
	/// Wallet embedded in the host application (smart wallet, passkey).
	Embedded,
}

/// Error taxonomy as stored in a session snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
	EnvironmentUnavailable,
	ConnectionRejected,
	ConnectionUnavailable,
	ExternalReadFailure,
	ProviderFault,
	InvalidConfig,
}

/// Failure recorded on a `Failed` session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionError {
	pub kind: ErrorKind,
	pub message: String,
}

impl SessionError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
		}
	}

	/// Whether retrying initialization can succeed without user action.
	pub fn is_retryable(&self) -> bool {
		matches!(self.kind, ErrorKind::EnvironmentUnavailable | ErrorKind::ProviderFault)
	}
}

impl fmt::Display for SessionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}: {}", self.kind, self.message)
	}
}

/// Address and chain of a connected wallet, always travelling together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
	pub address: Address,
	pub chain_id: ChainId,
}

impl Identity {
	pub fn new(address: Address, chain_id: ChainId) -> Self {
		Self { address, chain_id }
	}
}

/// Result of a successful authorization or a restored provider session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
	pub address: Address,
	pub chain_id: ChainId,
	pub connector: ConnectorKind,
}

impl Authorization {
	pub fn identity(&self) -> Identity {
		Identity::new(self.address.clone(), self.chain_id)
	}
}

/// Canonical connection record.
///
/// Fields are private: each constructor builds one status with exactly the
/// fields that status allows, so partial identity cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	status: SessionStatus,
	#[serde(flatten, skip_serializing_if = "Option::is_none")]
	identity: Option<Identity>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	connector_kind: Option<ConnectorKind>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	error: Option<SessionError>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	unsupported_chain: Option<ChainId>,
}

impl Session {
	fn bare(status: SessionStatus) -> Self {
		Self {
			status,
			identity: None,
			connector_kind: None,
			error: None,
			unsupported_chain: None,
		}
	}

	pub fn uninitialized() -> Self {
		Self::bare(SessionStatus::Uninitialized)
	}

	pub fn initializing() -> Self {
		Self::bare(SessionStatus::Initializing)
	}

	pub fn disconnected() -> Self {
		Self::bare(SessionStatus::Disconnected)
	}

	pub fn connecting() -> Self {
		Self::bare(SessionStatus::Connecting)
	}

	pub fn connected(identity: Identity, connector: ConnectorKind) -> Self {
		Self {
			identity: Some(identity),
			connector_kind: Some(connector),
			..Self::bare(SessionStatus::Connected)
		}
	}

	pub fn unsupported_network(chain_id: ChainId) -> Self {
		Self {
			unsupported_chain: Some(chain_id),
			..Self::bare(SessionStatus::UnsupportedNetwork)
		}
	}

	pub fn failed(error: SessionError) -> Self {
		Self {
			error: Some(error),
			..Self::bare(SessionStatus::Failed)
		}
	}

	pub fn status(&self) -> SessionStatus {
		self.status
	}

	pub fn identity(&self) -> Option<&Identity> {
		self.identity.as_ref()
	}

	pub fn address(&self) -> Option<&Address> {
		self.identity.as_ref().map(|id| &id.address)
	}

	pub fn chain_id(&self) -> Option<ChainId> {
		self.identity.as_ref().map(|id| id.chain_id)
	}

	pub fn connector_kind(&self) -> Option<ConnectorKind> {
		self.connector_kind
	}

	pub fn error(&self) -> Option<&SessionError> {
		self.error.as_ref()
	}

	pub fn unsupported_chain(&self) -> Option<ChainId> {
		self.unsupported_chain
	}

	pub fn is_connected(&self) -> bool {
		self.status == SessionStatus::Connected
	}
}

impl Default for Session {
	fn default() -> Self {
		Self::uninitialized()
	}
}

/// Immutable, sequence-numbered copy of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
	pub seq: u64,
	pub session: Session,
}

impl Snapshot {
	pub fn initial() -> Self {
		Self {
			seq: 0,
			session: Session::uninitialized(),
		}
	}

	pub fn status(&self) -> SessionStatus {
		self.session.status()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn identity() -> Identity {
		Identity::new(Address::new("0xAA11").unwrap(), ChainId(1))
	}

	#[test]
	fn only_connected_carries_identity() {
		let connected = Session::connected(identity(), ConnectorKind::Injected);
		assert_eq!(connected.address().map(Address::as_str), Some("0xAA11"));
		assert_eq!(connected.chain_id(), Some(ChainId(1)));
		assert_eq!(connected.connector_kind(), Some(ConnectorKind::Injected));

		for session in [
			Session::uninitialized(),
			Session::initializing(),
			Session::disconnected(),
			Session::connecting(),
			Session::unsupported_network(ChainId(10)),
			Session::failed(SessionError::new(ErrorKind::ProviderFault, "boom")),
		] {
			assert!(session.address().is_none());
			assert!(session.chain_id().is_none());
			assert!(session.connector_kind().is_none());
		}
	}

	#[test]
	fn error_only_on_failed() {
		let failed = Session::failed(SessionError::new(ErrorKind::EnvironmentUnavailable, "no window"));
		assert_eq!(failed.status(), SessionStatus::Failed);
		assert!(failed.error().unwrap().is_retryable());
		assert!(Session::disconnected().error().is_none());
	}

	#[test]
	fn connected_session_serializes_flat() {
		let snapshot = Snapshot {
			seq: 3,
			session: Session::connected(identity(), ConnectorKind::WalletConnect),
		};
		let json = serde_json::to_value(&snapshot).unwrap();
		assert_eq!(json["seq"], 3);
		assert_eq!(json["session"]["status"], "connected");
		assert_eq!(json["session"]["address"], "0xAA11");
		assert_eq!(json["session"]["chainId"], 1);
		assert_eq!(json["session"]["connectorKind"], "walletConnect");
		assert!(json["session"].get("error").is_none());

		let back: Snapshot = serde_json::from_value(json).unwrap();
		assert_eq!(back, snapshot);
	}

	#[test]
	fn settled_statuses() {
		assert!(!SessionStatus::Uninitialized.is_settled());
		assert!(!SessionStatus::Initializing.is_settled());
		assert!(SessionStatus::Disconnected.is_settled());
		assert!(SessionStatus::Failed.is_settled());
	}
}
