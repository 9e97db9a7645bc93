//! Connection state machine.
//!
//! [`ConnectionMachine`] owns the canonical session. Every change goes
//! through [`transition::step`]; the machine applies the result, invalidates
//! cache entries of the identity that just went away, bumps the sequence
//! number and publishes the new snapshot.
//!
//! Provider events are consumed by one listener task per binding. Rebinding
//! after a re-initialization aborts the previous task, and events still
//! queued for a superseded binding are dropped.

mod transition;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walletdash_protocol::{Authorization, ChainId, ConnectorKind, ProviderEvent, SessionStatus, Snapshot};
use walletdash_runtime::{ConnectorConfig, ProviderRegistry, Ready, WalletProvider};

use self::transition::{Input, MachineState, step};
use crate::cache::QueryCache;
use crate::error::{Error, Result};
use crate::hub::SnapshotHub;

type SharedInit = Shared<BoxFuture<'static, Arc<Snapshot>>>;

struct Core {
	state: MachineState,
	seq: u64,
}

struct Binding {
	id: u64,
	modal: Arc<dyn WalletProvider>,
	config: Arc<ConnectorConfig>,
	/// Spawned once the binding is installed and `Bound` is applied.
	listener: Option<JoinHandle<()>>,
}

/// A snapshot published by [`ConnectionMachine::apply`], with the connect
/// generation it was published under.
struct Published {
	snapshot: Arc<Snapshot>,
	attempt: u64,
}

pub(crate) struct ConnectionMachine {
	registry: ProviderRegistry,
	cache: Arc<QueryCache>,
	hub: Arc<SnapshotHub>,
	core: Mutex<Core>,
	binding: Mutex<Option<Binding>>,
	bindings: AtomicU64,
	init: Mutex<Option<SharedInit>>,
}

impl fmt::Debug for ConnectionMachine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let core = self.core.lock();
		f.debug_struct("ConnectionMachine")
			.field("seq", &core.seq)
			.field("status", &core.state.status())
			.field("attempt", &core.state.attempt)
			.finish_non_exhaustive()
	}
}

impl ConnectionMachine {
	pub fn new(registry: ProviderRegistry, cache: Arc<QueryCache>, hub: Arc<SnapshotHub>) -> Arc<Self> {
		Arc::new(Self {
			registry,
			cache,
			hub,
			core: Mutex::new(Core {
				state: MachineState::default(),
				seq: 0,
			}),
			binding: Mutex::new(None),
			bindings: AtomicU64::new(0),
			init: Mutex::new(None),
		})
	}

	pub fn current_snapshot(&self) -> Arc<Snapshot> {
		self.hub.current()
	}

	pub fn status(&self) -> SessionStatus {
		self.core.lock().state.status()
	}

	/// Configuration of the current binding.
	pub fn config(&self) -> Option<Arc<ConnectorConfig>> {
		self.binding.lock().as_ref().map(|binding| Arc::clone(&binding.config))
	}

	/// Applies one input. Returns the published snapshot, or `None` when the
	/// input did not apply or left the session unchanged.
	fn apply(&self, input: Input) -> Option<Published> {
		let _dispatch = self.hub.dispatch_lock();
		let published = {
			let mut core = self.core.lock();
			let next = step(&core.state, input)?;
			let previous = std::mem::replace(&mut core.state, next);
			if previous.session == core.state.session {
				return None;
			}

			if let Some(old) = previous.session.identity() {
				if core.state.session.identity() != Some(old) {
					self.cache.invalidate(old);
				}
			}

			core.seq += 1;
			let snapshot = Arc::new(Snapshot {
				seq: core.seq,
				session: core.state.session.clone(),
			});
			self.hub.store(Arc::clone(&snapshot));
			Published {
				snapshot,
				attempt: core.state.attempt,
			}
		};

		let snapshot = &published.snapshot;
		info!(
			target = "walletdash.machine",
			seq = snapshot.seq,
			status = %snapshot.status(),
			address = ?snapshot.session.address().map(|a| a.as_str()),
			chain = ?snapshot.session.chain_id().map(|c| c.0),
			"session transition"
		);
		self.hub.notify(snapshot);
		Some(published)
	}

	/// Brings the registry up and binds to its provider.
	///
	/// Only starts from `Uninitialized` or `Failed`; concurrent callers share
	/// one attempt. Failures are reflected in the returned snapshot.
	pub async fn initialize(self: &Arc<Self>) -> Arc<Snapshot> {
		let handle = {
			let mut init = self.init.lock();
			match &*init {
				Some(handle) => handle.clone(),
				None => {
					if !matches!(self.status(), SessionStatus::Uninitialized | SessionStatus::Failed) {
						return self.current_snapshot();
					}
					let handle = Arc::clone(self).bring_up().boxed().shared();
					*init = Some(handle.clone());
					handle
				}
			}
		};
		handle.await
	}

	async fn bring_up(self: Arc<Self>) -> Arc<Snapshot> {
		let retry = self.status() == SessionStatus::Failed;
		self.apply(Input::InitStarted);
		if retry {
			self.registry.reset();
		}

		match self.registry.initialize().await {
			Ok(ready) => {
				if let Err(err) = self.bind(ready).await {
					self.apply(Input::InitFailed(err.to_session_error()));
				}
			}
			Err(err) => {
				warn!(target = "walletdash.machine", error = %err, "initialization failed");
				self.apply(Input::InitFailed(err.to_session_error()));
			}
		}

		*self.init.lock() = None;
		self.current_snapshot()
	}

	async fn bind(self: &Arc<Self>, ready: Ready) -> Result<()> {
		let modal = Arc::clone(ready.modal());
		let config = Arc::clone(ready.config());

		// Subscribe before probing so nothing between probe and bind is lost.
		let events = modal.subscribe();
		let restored = probe(modal.as_ref()).await?;
		if let Some(account) = &restored {
			info!(
				target = "walletdash.machine",
				address = %account.address,
				chain = %account.chain_id,
				"restoring provider session"
			);
		}

		let supported: Arc<[ChainId]> = config.chains.iter().map(|chain| chain.id).collect();
		let id = self.bindings.fetch_add(1, Ordering::Relaxed) + 1;
		let previous = self.binding.lock().replace(Binding {
			id,
			modal,
			config,
			listener: None,
		});
		if let Some(old) = previous {
			debug!(target = "walletdash.machine", binding = old.id, "replacing provider binding");
			if let Some(listener) = old.listener {
				listener.abort();
			}
		}

		self.apply(Input::Bound { supported, restored });

		// Events queued since `subscribe` wait in the channel until the
		// listener starts, so they are applied after `Bound`.
		let listener = spawn_listener(Arc::downgrade(self), id, events);
		let mut binding = self.binding.lock();
		match binding.as_mut() {
			Some(current) if current.id == id => current.listener = Some(listener),
			_ => listener.abort(),
		}
		Ok(())
	}

	/// Whether a binding newer than `id` has replaced it.
	fn is_superseded(&self, id: u64) -> bool {
		self.binding.lock().as_ref().is_some_and(|binding| binding.id > id)
	}

	fn modal(&self) -> Option<Arc<dyn WalletProvider>> {
		self.binding.lock().as_ref().map(|binding| Arc::clone(&binding.modal))
	}

	fn handle_event(&self, event: ProviderEvent) {
		debug!(target = "walletdash.machine", event = event.name(), "provider event");
		if let ProviderEvent::Fault(message) = &event {
			warn!(target = "walletdash.machine", %message, "provider fault");
		}
		self.apply(Input::Provider(event));
	}

	/// Opens the connection UI and waits for the user's decision.
	///
	/// # Errors
	///
	/// - `InvalidState` unless the session is `Disconnected`.
	/// - `ConnectionRejected` / `ConnectionUnavailable` from the provider.
	/// - `Cancelled` when a disconnect or provider event superseded the
	///   attempt before it resolved; the late result is discarded.
	pub async fn connect(&self) -> Result<Authorization> {
		let invalid = |status| Error::InvalidState {
			operation: "connect",
			status,
		};
		let Some(modal) = self.modal() else {
			return Err(invalid(self.status()));
		};
		let Some(Published { attempt, .. }) = self.apply(Input::ConnectRequested) else {
			return Err(invalid(self.status()));
		};
		debug!(target = "walletdash.machine", attempt, "requesting authorization");

		match modal.request_authorization().await {
			Ok(account) => {
				let applied = self.apply(Input::Authorized {
					attempt,
					account: account.clone(),
				});
				if applied.is_none() {
					debug!(target = "walletdash.machine", attempt, "discarding superseded authorization");
					return Err(Error::Cancelled);
				}
				Ok(account)
			}
			Err(err) => {
				let applied = self.apply(Input::AuthorizationFailed {
					attempt,
					error: err.clone(),
				});
				if applied.is_none() {
					return Err(Error::Cancelled);
				}
				info!(target = "walletdash.machine", attempt, error = %err, "authorization failed");
				Err(err)
			}
		}
	}

	/// Forces the session to `Disconnected`, then ends the provider session.
	///
	/// Provider-side failures are logged and otherwise ignored.
	pub async fn disconnect(&self) {
		if self.apply(Input::DisconnectRequested).is_none() {
			return;
		}
		let Some(modal) = self.modal() else {
			return;
		};
		if let Err(err) = modal.disconnect().await {
			warn!(target = "walletdash.machine", error = %err, "provider disconnect failed; local session already cleared");
		}
	}
}

impl Drop for ConnectionMachine {
	fn drop(&mut self) {
		if let Some(listener) = self.binding.get_mut().take().and_then(|binding| binding.listener) {
			listener.abort();
		}
	}
}

/// Reads a restorable session from the provider. Accounts without a chain are
/// treated as no session so partial identity never reaches the machine.
async fn probe(modal: &dyn WalletProvider) -> Result<Option<Authorization>> {
	let accounts = modal.accounts().await?;
	let Some(address) = accounts.into_iter().next() else {
		return Ok(None);
	};
	let Some(chain_id) = modal.chain_id().await? else {
		warn!(target = "walletdash.machine", %address, "provider reports accounts without a chain; ignoring");
		return Ok(None);
	};
	Ok(Some(Authorization {
		address,
		chain_id,
		connector: modal.connector_kind().unwrap_or(ConnectorKind::Injected),
	}))
}

fn spawn_listener(machine: Weak<ConnectionMachine>, id: u64, mut events: mpsc::UnboundedReceiver<ProviderEvent>) -> JoinHandle<()> {
	tokio::spawn(async move {
		while let Some(event) = events.recv().await {
			let Some(machine) = machine.upgrade() else {
				break;
			};
			if machine.is_superseded(id) {
				debug!(target = "walletdash.machine", binding = id, "dropping event for superseded binding");
				break;
			}
			machine.handle_event(event);
		}
		debug!(target = "walletdash.machine", binding = id, "provider event stream closed");
	})
}
