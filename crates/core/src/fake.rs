//! In-memory wallet for tests and demos.
//!
//! Provides a host, a connector backend and the wallet provider it builds,
//! all sharing one scripted wallet. The controller decides how authorization
//! requests resolve, injects provider events and counts constructions.
//!
//! # Example
//!
//! ```ignore
//! let (parts, controller) = FakeWalletBuilder::new().build();
//! let facade = SessionFacade::new(RegistrySettings::default(), parts.host, parts.backend);
//!
//! facade.initialize().await;
//! controller.approve_next(address, ChainId(1));
//! assert!(facade.request_connection().await.is_connected());
//!
//! controller.switch_chain(ChainId(137));
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use walletdash_protocol::{Address, Authorization, ChainId, ConnectorKind, ProviderEvent};
use walletdash_runtime::{ConnectorBackend, ConnectorConfig, HostEnvironment, RegistrySettings, WalletProvider};

use crate::error::{Error, Result};

/// Builder for a fake wallet and its controller.
pub struct FakeWalletBuilder {
	available: bool,
	origin: Option<String>,
	connector: ConnectorKind,
	restored: Option<(Address, ChainId)>,
	construct_delay: Option<Duration>,
}

impl Default for FakeWalletBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeWalletBuilder {
	pub fn new() -> Self {
		Self {
			available: true,
			origin: Some("http://localhost:3000".to_string()),
			connector: ConnectorKind::Injected,
			restored: None,
			construct_delay: None,
		}
	}

	/// Starts with no host context; see [`FakeWalletController::set_available`].
	pub fn unavailable(mut self) -> Self {
		self.available = false;
		self
	}

	pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
		self.origin = Some(origin.into());
		self
	}

	/// Connection method reported for authorizations.
	pub fn with_connector(mut self, connector: ConnectorKind) -> Self {
		self.connector = connector;
		self
	}

	/// Pre-authorized session the provider reports on its first probe.
	pub fn with_session(mut self, address: Address, chain_id: ChainId) -> Self {
		self.restored = Some((address, chain_id));
		self
	}

	/// Delay applied to each configuration construction.
	pub fn with_construct_delay(mut self, delay: Duration) -> Self {
		self.construct_delay = Some(delay);
		self
	}

	/// Builds the wallet parts and the controller driving them.
	pub fn build(self) -> (FakeWalletParts, FakeWalletController) {
		let (accounts, chain_id) = match self.restored {
			Some((address, chain_id)) => (vec![address], Some(chain_id)),
			None => (Vec::new(), None),
		};
		let state = Arc::new(FakeState {
			available: AtomicBool::new(self.available),
			origin: self.origin,
			connector: self.connector,
			construct_delay: self.construct_delay,
			wallet: Mutex::new(WalletState { accounts, chain_id }),
			subscribers: Mutex::new(Vec::new()),
			script: Mutex::new(VecDeque::new()),
			construction_failure: Mutex::new(None),
			probe_failure: Mutex::new(None),
			probe_events: Mutex::new(Vec::new()),
			fail_disconnect: AtomicBool::new(false),
			configs: AtomicUsize::new(0),
			modals: AtomicUsize::new(0),
			authorizations: AtomicUsize::new(0),
			disconnects: AtomicUsize::new(0),
		});

		let parts = FakeWalletParts {
			host: Arc::new(FakeHost {
				state: Arc::clone(&state),
			}),
			backend: Arc::new(FakeBackend {
				state: Arc::clone(&state),
			}),
		};
		(parts, FakeWalletController { state })
	}
}

/// Host and backend to hand to the facade.
pub struct FakeWalletParts {
	pub host: Arc<dyn HostEnvironment>,
	pub backend: Arc<dyn ConnectorBackend>,
}

struct WalletState {
	accounts: Vec<Address>,
	chain_id: Option<ChainId>,
}

enum Scripted {
	Now(Result<Authorization>),
	Deferred(oneshot::Receiver<Result<Authorization>>),
}

struct FakeState {
	available: AtomicBool,
	origin: Option<String>,
	connector: ConnectorKind,
	construct_delay: Option<Duration>,
	wallet: Mutex<WalletState>,
	subscribers: Mutex<Vec<mpsc::UnboundedSender<ProviderEvent>>>,
	script: Mutex<VecDeque<Scripted>>,
	construction_failure: Mutex<Option<Error>>,
	probe_failure: Mutex<Option<Error>>,
	probe_events: Mutex<Vec<ProviderEvent>>,
	fail_disconnect: AtomicBool,
	configs: AtomicUsize,
	modals: AtomicUsize,
	authorizations: AtomicUsize,
	disconnects: AtomicUsize,
}

impl FakeState {
	fn authorization(&self, address: Address, chain_id: ChainId) -> Authorization {
		Authorization {
			address,
			chain_id,
			connector: self.connector,
		}
	}

	fn emit(&self, event: ProviderEvent) {
		self.subscribers.lock().retain(|tx| tx.send(event.clone()).is_ok());
	}
}

/// Controller for scripting the fake wallet and inspecting its use.
#[derive(Clone)]
pub struct FakeWalletController {
	state: Arc<FakeState>,
}

impl FakeWalletController {
	/// Makes the host context appear or disappear.
	pub fn set_available(&self, available: bool) {
		self.state.available.store(available, Ordering::SeqCst);
	}

	/// The next authorization request succeeds with this account.
	pub fn approve_next(&self, address: Address, chain_id: ChainId) {
		let auth = self.state.authorization(address, chain_id);
		self.state.script.lock().push_back(Scripted::Now(Ok(auth)));
	}

	/// The next authorization request is declined by the user.
	pub fn reject_next(&self, reason: impl Into<String>) {
		self.fail_next(Error::ConnectionRejected(reason.into()));
	}

	/// The next authorization request fails with `error`.
	pub fn fail_next(&self, error: Error) {
		self.state.script.lock().push_back(Scripted::Now(Err(error)));
	}

	/// The next authorization request stays pending until the returned
	/// handle resolves it.
	pub fn defer_next(&self) -> PendingAuthorization {
		let (tx, rx) = oneshot::channel();
		self.state.script.lock().push_back(Scripted::Deferred(rx));
		PendingAuthorization {
			tx,
			state: Arc::clone(&self.state),
		}
	}

	/// The next configuration construction fails with `error`.
	pub fn fail_next_construction(&self, error: Error) {
		*self.state.construction_failure.lock() = Some(error);
	}

	/// The next account probe fails with `error`.
	pub fn fail_next_probe(&self, error: Error) {
		*self.state.probe_failure.lock() = Some(error);
	}

	/// Events emitted while the next chain probe is answered, before the
	/// wallet reports its chain.
	pub fn emit_during_next_probe(&self, events: impl IntoIterator<Item = ProviderEvent>) {
		self.state.probe_events.lock().extend(events);
	}

	/// Makes provider-side disconnects fail.
	pub fn set_fail_disconnect(&self, fail: bool) {
		self.state.fail_disconnect.store(fail, Ordering::SeqCst);
	}

	/// Delivers a raw provider event without touching wallet state.
	pub fn emit(&self, event: ProviderEvent) {
		self.state.emit(event);
	}

	/// Switches the active account and emits `AccountsChanged`.
	pub fn switch_account(&self, address: Address) {
		self.state.wallet.lock().accounts = vec![address.clone()];
		self.state.emit(ProviderEvent::AccountsChanged(vec![address]));
	}

	/// Switches the network and emits `ChainChanged`.
	pub fn switch_chain(&self, chain_id: ChainId) {
		self.state.wallet.lock().chain_id = Some(chain_id);
		self.state.emit(ProviderEvent::ChainChanged(chain_id));
	}

	/// Revokes account access (`AccountsChanged` with an empty list).
	pub fn revoke(&self) {
		self.state.wallet.lock().accounts.clear();
		self.state.emit(ProviderEvent::AccountsChanged(Vec::new()));
	}

	/// Ends the session from the wallet side.
	pub fn terminate(&self) {
		let mut wallet = self.state.wallet.lock();
		wallet.accounts.clear();
		wallet.chain_id = None;
		drop(wallet);
		self.state.emit(ProviderEvent::Disconnected);
	}

	pub fn fault(&self, message: impl Into<String>) {
		self.state.emit(ProviderEvent::Fault(message.into()));
	}

	pub fn accounts(&self) -> Vec<Address> {
		self.state.wallet.lock().accounts.clone()
	}

	pub fn config_constructions(&self) -> usize {
		self.state.configs.load(Ordering::SeqCst)
	}

	pub fn modal_constructions(&self) -> usize {
		self.state.modals.load(Ordering::SeqCst)
	}

	pub fn authorization_requests(&self) -> usize {
		self.state.authorizations.load(Ordering::SeqCst)
	}

	pub fn disconnect_calls(&self) -> usize {
		self.state.disconnects.load(Ordering::SeqCst)
	}

	/// Live event subscriptions.
	pub fn subscriber_count(&self) -> usize {
		let mut subscribers = self.state.subscribers.lock();
		subscribers.retain(|tx| !tx.is_closed());
		subscribers.len()
	}
}

/// An authorization request held open by [`FakeWalletController::defer_next`].
pub struct PendingAuthorization {
	tx: oneshot::Sender<Result<Authorization>>,
	state: Arc<FakeState>,
}

impl PendingAuthorization {
	pub fn approve(self, address: Address, chain_id: ChainId) {
		let auth = self.state.authorization(address, chain_id);
		let _ = self.tx.send(Ok(auth));
	}

	pub fn reject(self, reason: impl Into<String>) {
		let _ = self.tx.send(Err(Error::ConnectionRejected(reason.into())));
	}
}

struct FakeHost {
	state: Arc<FakeState>,
}

impl HostEnvironment for FakeHost {
	fn is_available(&self) -> bool {
		self.state.available.load(Ordering::SeqCst)
	}

	fn origin(&self) -> Option<String> {
		self.state.origin.clone()
	}
}

struct FakeBackend {
	state: Arc<FakeState>,
}

#[async_trait]
impl ConnectorBackend for FakeBackend {
	async fn build_config(&self, settings: &RegistrySettings, origin: Option<&str>) -> Result<ConnectorConfig> {
		self.state.configs.fetch_add(1, Ordering::SeqCst);
		if let Some(delay) = self.state.construct_delay {
			tokio::time::sleep(delay).await;
		}
		if let Some(err) = self.state.construction_failure.lock().take() {
			return Err(err);
		}
		ConnectorConfig::from_settings(settings, origin)
	}

	async fn create_modal(&self, _config: Arc<ConnectorConfig>) -> Result<Arc<dyn WalletProvider>> {
		self.state.modals.fetch_add(1, Ordering::SeqCst);
		Ok(Arc::new(FakeWallet {
			state: Arc::clone(&self.state),
		}))
	}
}

struct FakeWallet {
	state: Arc<FakeState>,
}

#[async_trait]
impl WalletProvider for FakeWallet {
	async fn accounts(&self) -> Result<Vec<Address>> {
		if let Some(err) = self.state.probe_failure.lock().take() {
			return Err(err);
		}
		Ok(self.state.wallet.lock().accounts.clone())
	}

	async fn chain_id(&self) -> Result<Option<ChainId>> {
		let queued = std::mem::take(&mut *self.state.probe_events.lock());
		for event in queued {
			self.state.emit(event);
		}
		Ok(self.state.wallet.lock().chain_id)
	}

	fn connector_kind(&self) -> Option<ConnectorKind> {
		Some(self.state.connector)
	}

	fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.state.subscribers.lock().push(tx);
		rx
	}

	async fn request_authorization(&self) -> Result<Authorization> {
		self.state.authorizations.fetch_add(1, Ordering::SeqCst);
		let next = self.state.script.lock().pop_front();
		let result = match next {
			Some(Scripted::Now(result)) => result,
			Some(Scripted::Deferred(rx)) => rx
				.await
				.unwrap_or_else(|_| Err(Error::ConnectionRejected("authorization abandoned".to_string()))),
			None => Err(Error::ConnectionUnavailable("no wallet detected".to_string())),
		};

		if let Ok(auth) = &result {
			let mut wallet = self.state.wallet.lock();
			wallet.accounts = vec![auth.address.clone()];
			wallet.chain_id = Some(auth.chain_id);
		}
		result
	}

	async fn disconnect(&self) -> Result<()> {
		self.state.disconnects.fetch_add(1, Ordering::SeqCst);
		if self.state.fail_disconnect.load(Ordering::SeqCst) {
			return Err(Error::ProviderFault("wallet did not acknowledge disconnect".to_string()));
		}
		let mut wallet = self.state.wallet.lock();
		wallet.accounts.clear();
		wallet.chain_id = None;
		Ok(())
	}
}
