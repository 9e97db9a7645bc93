//! Error types shared by the registry, state machine and query cache.

use walletdash_protocol::{AddressError, ErrorKind, SessionError, SessionStatus};

/// Result type alias used across walletdash crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the session core.
///
/// `Clone` so a single failure can be handed to every caller waiting on the
/// same in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// No host execution context yet; retry initialization later.
	#[error("host environment is not available yet")]
	EnvironmentUnavailable,

	/// User or provider declined authorization.
	#[error("connection rejected: {0}")]
	ConnectionRejected(String),

	/// No compatible connection method is present.
	#[error("no connection method available: {0}")]
	ConnectionUnavailable(String),

	/// A cached read's fetcher failed. Nothing was cached.
	#[error("read {key} failed: {message}")]
	ExternalReadFailure { key: String, message: String },

	/// Unexpected provider-originated failure.
	#[error("provider fault: {0}")]
	ProviderFault(String),

	/// Registry settings failed validation.
	#[error("invalid connector configuration: {0}")]
	InvalidConfig(String),

	/// A pending connection attempt was superseded by a cancel or disconnect.
	#[error("connection attempt cancelled")]
	Cancelled,

	/// The requested action is not legal in the current session status.
	#[error("cannot {operation} while {status}")]
	InvalidState { operation: &'static str, status: SessionStatus },

	/// An identity-scoped read was requested with no connected wallet.
	#[error("no wallet connected")]
	NotConnected,

	/// A cached value was requested as a different type than it was stored with.
	#[error("cached value for {key} has a different type")]
	CacheTypeMismatch { key: String },

	#[error("invalid key: {0}")]
	InvalidKey(String),
}

impl Error {
	/// Projection onto the serializable taxonomy, when the error has one.
	pub fn kind(&self) -> Option<ErrorKind> {
		match self {
			Self::EnvironmentUnavailable => Some(ErrorKind::EnvironmentUnavailable),
			Self::ConnectionRejected(_) => Some(ErrorKind::ConnectionRejected),
			Self::ConnectionUnavailable(_) => Some(ErrorKind::ConnectionUnavailable),
			Self::ExternalReadFailure { .. } => Some(ErrorKind::ExternalReadFailure),
			Self::ProviderFault(_) => Some(ErrorKind::ProviderFault),
			Self::InvalidConfig(_) => Some(ErrorKind::InvalidConfig),
			_ => None,
		}
	}

	/// Converts into the form stored on a `Failed` session.
	///
	/// Errors outside the taxonomy are recorded as provider faults.
	pub fn to_session_error(&self) -> SessionError {
		SessionError::new(self.kind().unwrap_or(ErrorKind::ProviderFault), self.to_string())
	}

	pub fn is_environment_unavailable(&self) -> bool {
		matches!(self, Self::EnvironmentUnavailable)
	}

	pub fn is_rejection(&self) -> bool {
		matches!(self, Self::ConnectionRejected(_))
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

impl From<AddressError> for Error {
	fn from(err: AddressError) -> Self {
		Self::InvalidKey(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn taxonomy_projection() {
		assert_eq!(Error::EnvironmentUnavailable.kind(), Some(ErrorKind::EnvironmentUnavailable));
		assert_eq!(Error::ConnectionRejected("no".into()).kind(), Some(ErrorKind::ConnectionRejected));
		assert_eq!(Error::Cancelled.kind(), None);
	}

	#[test]
	fn session_error_keeps_message() {
		let err = Error::ProviderFault("relay closed".into()).to_session_error();
		assert_eq!(err.kind, ErrorKind::ProviderFault);
		assert_eq!(err.message, "provider fault: relay closed");

		let err = Error::NotConnected.to_session_error();
		assert_eq!(err.kind, ErrorKind::ProviderFault);
	}

	#[test]
	fn invalid_state_message() {
		let err = Error::InvalidState {
			operation: "connect",
			status: SessionStatus::Connected,
		};
		assert_eq!(err.to_string(), "cannot connect while connected");
	}
}
