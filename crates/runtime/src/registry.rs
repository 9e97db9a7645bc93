//! Idempotent construction of the connector configuration and modal.
//!
//! The registry owns the only instance of each. Construction runs behind a
//! single in-flight guard: the first caller starts an attempt and stores a
//! shared handle to it, every concurrent caller awaits that same handle, and
//! all of them observe the same outcome. A failed attempt leaves nothing
//! behind, so the next call starts from scratch.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ConnectorConfig, RegistrySettings};
use crate::error::{Error, Result};
use crate::provider::{ConnectorBackend, HostEnvironment, WalletProvider};

/// Outcome of a successful initialization: the published configuration and
/// the modal bound to it.
#[derive(Clone)]
pub struct Ready {
	config: Arc<ConnectorConfig>,
	modal: Arc<dyn WalletProvider>,
	attempt: u64,
}

impl Ready {
	pub fn config(&self) -> &Arc<ConnectorConfig> {
		&self.config
	}

	pub fn modal(&self) -> &Arc<dyn WalletProvider> {
		&self.modal
	}

	/// Initialization attempt that produced this instance, starting at 1.
	pub fn attempt(&self) -> u64 {
		self.attempt
	}
}

impl fmt::Debug for Ready {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Ready")
			.field("project_id", &self.config.project_id)
			.field("chains", &self.config.chains.len())
			.field("attempt", &self.attempt)
			.finish_non_exhaustive()
	}
}

type SharedAttempt = Shared<BoxFuture<'static, Result<Ready>>>;

enum InitState {
	Idle,
	InFlight { attempt: u64, handle: SharedAttempt },
	Ready(Ready),
}

/// Owner of the connector configuration and modal singleton.
pub struct ProviderRegistry {
	settings: RegistrySettings,
	host: Arc<dyn HostEnvironment>,
	backend: Arc<dyn ConnectorBackend>,
	state: Arc<Mutex<InitState>>,
	attempts: AtomicU64,
}

impl ProviderRegistry {
	pub fn new(settings: RegistrySettings, host: Arc<dyn HostEnvironment>, backend: Arc<dyn ConnectorBackend>) -> Self {
		Self {
			settings,
			host,
			backend,
			state: Arc::new(Mutex::new(InitState::Idle)),
			attempts: AtomicU64::new(0),
		}
	}

	/// Brings the connector up, or joins the attempt already in flight.
	///
	/// # Errors
	///
	/// - `EnvironmentUnavailable` when the host context does not exist yet;
	///   nothing is constructed.
	/// - `InvalidConfig` when the settings fail validation.
	/// - Any error raised by the backend while constructing.
	pub async fn initialize(&self) -> Result<Ready> {
		let handle = {
			let mut state = self.state.lock();
			match &*state {
				InitState::Ready(ready) => return Ok(ready.clone()),
				InitState::InFlight { attempt, handle } => {
					debug!(target = "walletdash.registry", attempt, "joining in-flight initialization");
					handle.clone()
				}
				InitState::Idle => {
					if !self.host.is_available() {
						warn!(target = "walletdash.registry", "host environment unavailable; initialization refused");
						return Err(Error::EnvironmentUnavailable);
					}
					let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
					let handle = self.start_attempt(attempt);
					*state = InitState::InFlight {
						attempt,
						handle: handle.clone(),
					};
					handle
				}
			}
		};
		handle.await
	}

	fn start_attempt(&self, attempt: u64) -> SharedAttempt {
		let settings = self.settings.clone();
		let origin = self.host.origin();
		let backend = Arc::clone(&self.backend);
		let state = Arc::clone(&self.state);

		async move {
			info!(target = "walletdash.registry", attempt, "constructing connector");
			let result = construct(&settings, origin.as_deref(), backend.as_ref(), attempt).await;

			let mut guard = state.lock();
			let current = matches!(&*guard, InitState::InFlight { attempt: a, .. } if *a == attempt);
			if current {
				*guard = match &result {
					Ok(ready) => InitState::Ready(ready.clone()),
					Err(_) => InitState::Idle,
				};
			}
			drop(guard);

			match &result {
				Ok(ready) => info!(
					target = "walletdash.registry",
					attempt,
					chains = ready.config.chains.len(),
					methods = ready.config.methods.len(),
					"connector ready"
				),
				Err(err) => warn!(target = "walletdash.registry", attempt, error = %err, "connector construction failed"),
			}
			result
		}
		.boxed()
		.shared()
	}

	/// Whether a configuration and modal have been published.
	pub fn is_ready(&self) -> bool {
		matches!(&*self.state.lock(), InitState::Ready(_))
	}

	/// The published configuration, once ready.
	pub fn config(&self) -> Option<Arc<ConnectorConfig>> {
		match &*self.state.lock() {
			InitState::Ready(ready) => Some(Arc::clone(&ready.config)),
			_ => None,
		}
	}

	/// Drops a published instance so the next [`initialize`](Self::initialize)
	/// constructs a fresh one. An attempt in flight is left alone.
	pub fn reset(&self) {
		let mut state = self.state.lock();
		if let InitState::Ready(ready) = &*state {
			debug!(target = "walletdash.registry", attempt = ready.attempt, "discarding published connector");
			*state = InitState::Idle;
		}
	}
}

async fn construct(settings: &RegistrySettings, origin: Option<&str>, backend: &dyn ConnectorBackend, attempt: u64) -> Result<Ready> {
	settings.validate()?;
	let config = Arc::new(backend.build_config(settings, origin).await?);
	let modal = backend.create_modal(Arc::clone(&config)).await?;
	Ok(Ready { config, modal, attempt })
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicBool;
	use std::time::Duration;

	use async_trait::async_trait;
	use tokio::sync::mpsc;
	use walletdash_protocol::{Address, Authorization, ChainId, ConnectorKind, ProviderEvent};

	use super::*;

	struct NullWallet;

	#[async_trait]
	impl WalletProvider for NullWallet {
		async fn accounts(&self) -> Result<Vec<Address>> {
			Ok(Vec::new())
		}

		async fn chain_id(&self) -> Result<Option<ChainId>> {
			Ok(None)
		}

		fn connector_kind(&self) -> Option<ConnectorKind> {
			None
		}

		fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent> {
			mpsc::unbounded_channel().1
		}

		async fn request_authorization(&self) -> Result<Authorization> {
			Err(Error::ConnectionUnavailable("null wallet".into()))
		}

		async fn disconnect(&self) -> Result<()> {
			Ok(())
		}
	}

	#[derive(Default)]
	struct CountingBackend {
		configs: AtomicU64,
		modals: AtomicU64,
		fail_modal: AtomicBool,
	}

	#[async_trait]
	impl ConnectorBackend for CountingBackend {
		async fn build_config(&self, settings: &RegistrySettings, origin: Option<&str>) -> Result<ConnectorConfig> {
			self.configs.fetch_add(1, Ordering::SeqCst);
			tokio::time::sleep(Duration::from_millis(20)).await;
			ConnectorConfig::from_settings(settings, origin)
		}

		async fn create_modal(&self, _config: Arc<ConnectorConfig>) -> Result<Arc<dyn WalletProvider>> {
			self.modals.fetch_add(1, Ordering::SeqCst);
			if self.fail_modal.load(Ordering::SeqCst) {
				return Err(Error::ProviderFault("relay bootstrap unreachable".into()));
			}
			Ok(Arc::new(NullWallet))
		}
	}

	struct ToggleHost(AtomicBool);

	impl HostEnvironment for ToggleHost {
		fn is_available(&self) -> bool {
			self.0.load(Ordering::SeqCst)
		}

		fn origin(&self) -> Option<String> {
			Some("https://dash.example".to_string())
		}
	}

	fn registry(available: bool) -> (Arc<ProviderRegistry>, Arc<CountingBackend>, Arc<ToggleHost>) {
		let backend = Arc::new(CountingBackend::default());
		let host = Arc::new(ToggleHost(AtomicBool::new(available)));
		let registry = Arc::new(ProviderRegistry::new(
			RegistrySettings::default(),
			Arc::clone(&host) as Arc<dyn HostEnvironment>,
			Arc::clone(&backend) as Arc<dyn ConnectorBackend>,
		));
		(registry, backend, host)
	}

	#[tokio::test(start_paused = true)]
	async fn concurrent_initialize_constructs_once() {
		let (registry, backend, _) = registry(true);

		let mut handles = Vec::new();
		for _ in 0..8 {
			let registry = Arc::clone(&registry);
			handles.push(tokio::spawn(async move { registry.initialize().await }));
		}
		for handle in handles {
			let ready = handle.await.unwrap().unwrap();
			assert_eq!(ready.attempt(), 1);
		}

		assert_eq!(backend.configs.load(Ordering::SeqCst), 1);
		assert_eq!(backend.modals.load(Ordering::SeqCst), 1);
		assert!(registry.is_ready());
		assert_eq!(registry.config().unwrap().metadata.url, "https://dash.example");
	}

	#[tokio::test]
	async fn unavailable_host_constructs_nothing() {
		let (registry, backend, host) = registry(false);

		let err = registry.initialize().await.unwrap_err();
		assert!(err.is_environment_unavailable());
		assert_eq!(backend.configs.load(Ordering::SeqCst), 0);
		assert!(!registry.is_ready());
		assert!(registry.config().is_none());

		host.0.store(true, Ordering::SeqCst);
		assert!(registry.initialize().await.is_ok());
		assert_eq!(backend.configs.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn failed_attempt_is_not_reused() {
		let (registry, backend, _) = registry(true);
		backend.fail_modal.store(true, Ordering::SeqCst);

		let (a, b) = tokio::join!(registry.initialize(), registry.initialize());
		assert_eq!(a.unwrap_err(), Error::ProviderFault("relay bootstrap unreachable".into()));
		assert!(b.is_err());
		assert_eq!(backend.configs.load(Ordering::SeqCst), 1);
		assert!(!registry.is_ready());

		backend.fail_modal.store(false, Ordering::SeqCst);
		let ready = registry.initialize().await.unwrap();
		assert_eq!(ready.attempt(), 2);
		assert_eq!(backend.configs.load(Ordering::SeqCst), 2);
		assert_eq!(backend.modals.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn invalid_settings_fail_before_construction() {
		let backend = Arc::new(CountingBackend::default());
		let registry = ProviderRegistry::new(
			RegistrySettings {
				chains: Vec::new(),
				..RegistrySettings::default()
			},
			Arc::new(ToggleHost(AtomicBool::new(true))),
			Arc::clone(&backend) as Arc<dyn ConnectorBackend>,
		);
		assert!(matches!(registry.initialize().await, Err(Error::InvalidConfig(_))));
		assert_eq!(backend.configs.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn reset_forces_fresh_construction() {
		let (registry, backend, _) = registry(true);
		registry.initialize().await.unwrap();
		registry.initialize().await.unwrap();
		assert_eq!(backend.modals.load(Ordering::SeqCst), 1);

		registry.reset();
		assert!(!registry.is_ready());
		let ready = registry.initialize().await.unwrap();
		assert_eq!(ready.attempt(), 2);
		assert_eq!(backend.modals.load(Ordering::SeqCst), 2);
	}
}
