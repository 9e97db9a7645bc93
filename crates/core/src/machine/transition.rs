//! Pure session transition function.
//!
//! [`step`] maps the current [`MachineState`] and one [`Input`] to the next
//! state, or `None` when the input does not apply in the current status.
//! It performs no I/O; publishing, cache invalidation and provider calls
//! happen in the machine around it.

use std::sync::Arc;

use walletdash_protocol::{Authorization, ChainId, ProviderEvent, Session, SessionError, SessionStatus};

use crate::error::Error;

/// Everything a transition may read or replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MachineState {
	pub session: Session,
	/// Authorized account while `Connected` or `UnsupportedNetwork`, tracking
	/// the provider's current chain even when that chain is not supported.
	pub account: Option<Authorization>,
	/// Connect generation. Bumped whenever a pending attempt is superseded.
	pub attempt: u64,
	/// Chains the bound configuration supports, in configured order.
	pub supported: Arc<[ChainId]>,
}

impl Default for MachineState {
	fn default() -> Self {
		Self {
			session: Session::uninitialized(),
			account: None,
			attempt: 0,
			supported: Arc::from(Vec::new()),
		}
	}
}

impl MachineState {
	pub fn status(&self) -> SessionStatus {
		self.session.status()
	}

	fn with(&self, session: Session, account: Option<Authorization>) -> Self {
		Self {
			session,
			account,
			attempt: self.attempt,
			supported: Arc::clone(&self.supported),
		}
	}

	fn bump(mut self) -> Self {
		self.attempt += 1;
		self
	}

	/// `Connected` on a supported chain, `UnsupportedNetwork` otherwise.
	fn authorized(&self, account: Authorization) -> Self {
		let session = if self.supported.contains(&account.chain_id) {
			Session::connected(account.identity(), account.connector)
		} else {
			Session::unsupported_network(account.chain_id)
		};
		self.with(session, Some(account))
	}

	fn failed(&self, error: SessionError) -> Self {
		self.with(Session::failed(error), None)
	}
}

#[derive(Debug, Clone)]
pub(crate) enum Input {
	InitStarted,
	/// Registry ready and provider probed.
	Bound {
		supported: Arc<[ChainId]>,
		restored: Option<Authorization>,
	},
	InitFailed(SessionError),
	ConnectRequested,
	Authorized {
		attempt: u64,
		account: Authorization,
	},
	AuthorizationFailed {
		attempt: u64,
		error: Error,
	},
	DisconnectRequested,
	Provider(ProviderEvent),
}

pub(crate) fn step(state: &MachineState, input: Input) -> Option<MachineState> {
	use SessionStatus::*;

	let status = state.status();
	match input {
		Input::InitStarted => matches!(status, Uninitialized | Failed).then(|| MachineState {
			supported: Arc::from(Vec::new()),
			..state.with(Session::initializing(), None).bump()
		}),

		Input::Bound { supported, restored } => {
			if status != Initializing {
				return None;
			}
			let bound = MachineState {
				supported,
				..state.clone()
			};
			Some(match restored {
				Some(account) => bound.authorized(account),
				None => bound.with(Session::disconnected(), None),
			})
		}

		Input::InitFailed(error) => (status == Initializing).then(|| state.failed(error)),

		Input::ConnectRequested => (status == Disconnected).then(|| state.with(Session::connecting(), None).bump()),

		Input::Authorized { attempt, account } => {
			(status == Connecting && attempt == state.attempt).then(|| state.authorized(account))
		}

		Input::AuthorizationFailed { attempt, error } => {
			if status != Connecting || attempt != state.attempt {
				return None;
			}
			Some(match error {
				Error::ProviderFault(_) => state.failed(error.to_session_error()),
				_ => state.with(Session::disconnected(), None),
			})
		}

		Input::DisconnectRequested => match status {
			Connecting | Connected | UnsupportedNetwork => Some(state.with(Session::disconnected(), None).bump()),
			_ => None,
		},

		Input::Provider(event) => on_event(state, event),
	}
}

fn on_event(state: &MachineState, event: ProviderEvent) -> Option<MachineState> {
	use SessionStatus::*;

	let status = state.status();
	match event {
		ProviderEvent::Fault(message) => match status {
			Uninitialized | Initializing | Failed => None,
			_ => Some(state.failed(Error::ProviderFault(message).to_session_error()).bump()),
		},

		ProviderEvent::Disconnected => match status {
			Connecting | Connected | UnsupportedNetwork => Some(state.with(Session::disconnected(), None).bump()),
			_ => None,
		},

		ProviderEvent::AccountsChanged(accounts) => {
			let current = state.account.as_ref()?;
			match accounts.into_iter().next() {
				None => Some(state.with(Session::disconnected(), None)),
				Some(address) if address == current.address => None,
				Some(address) => Some(state.authorized(Authorization {
					address,
					..current.clone()
				})),
			}
		}

		ProviderEvent::ChainChanged(chain_id) => {
			let current = state.account.as_ref()?;
			if chain_id == current.chain_id {
				return None;
			}
			Some(state.authorized(Authorization {
				chain_id,
				..current.clone()
			}))
		}
	}
}
