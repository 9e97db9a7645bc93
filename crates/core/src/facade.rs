//! The single entry point for consumers of the wallet session.
//!
//! [`SessionFacade`] composes the provider registry, the connection state
//! machine and the query cache. Consumers read snapshots, subscribe to them,
//! request connection changes and issue identity-scoped cached reads. The
//! registry and raw provider events stay behind it.
//!
//! # Example
//!
//! ```ignore
//! let facade = SessionFacade::new(RegistrySettings::from_env(), host, backend);
//! let _sub = facade.subscribe(|snapshot| println!("{} {}", snapshot.seq, snapshot.status()));
//! facade.initialize().await;
//! if let ConnectOutcome::Connected(account) = facade.request_connection().await {
//!     let balance = facade.balance(&reads).await?;
//!     println!("{} {}", account.address.short(), balance.value.formatted());
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};
use walletdash_protocol::{Address, Authorization, Balance, ChainId, Nft, SessionError, SessionStatus, Snapshot, Transaction};
use walletdash_runtime::{ConnectorBackend, ConnectorConfig, HostEnvironment, ProviderRegistry, RegistrySettings};

use crate::cache::{QueryCache, QueryKey, QueryKind};
use crate::error::{Error, Result};
use crate::hub::{SnapshotHub, Subscription};
use crate::machine::ConnectionMachine;
use crate::read::{ReadProvider, Scoped};

/// Result of [`SessionFacade::request_connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
	Connected(Authorization),
	/// The user or wallet declined.
	Rejected(String),
	/// No compatible connection method is present.
	Unavailable(String),
	/// A disconnect or provider event superseded the attempt.
	Cancelled,
	/// Connecting does not apply in this status, e.g. before initialization
	/// completes or while already connected.
	Ignored(SessionStatus),
	/// The provider faulted; the session is now `Failed`.
	Failed(SessionError),
}

impl ConnectOutcome {
	pub fn is_connected(&self) -> bool {
		matches!(self, Self::Connected(_))
	}
}

pub struct SessionFacade {
	machine: Arc<ConnectionMachine>,
	cache: Arc<QueryCache>,
	hub: Arc<SnapshotHub>,
}

impl std::fmt::Debug for SessionFacade {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionFacade")
			.field("machine", &self.machine)
			.field("cache", &self.cache)
			.finish()
	}
}

impl SessionFacade {
	pub fn new(settings: RegistrySettings, host: Arc<dyn HostEnvironment>, backend: Arc<dyn ConnectorBackend>) -> Self {
		Self::with_cache(settings, host, backend, QueryCache::default())
	}

	/// Facade using `cache`, e.g. one with a non-default staleness window.
	pub fn with_cache(
		settings: RegistrySettings,
		host: Arc<dyn HostEnvironment>,
		backend: Arc<dyn ConnectorBackend>,
		cache: QueryCache,
	) -> Self {
		let cache = Arc::new(cache);
		let hub = Arc::new(SnapshotHub::new());
		let registry = ProviderRegistry::new(settings, host, backend);
		let machine = ConnectionMachine::new(registry, Arc::clone(&cache), Arc::clone(&hub));
		Self { machine, cache, hub }
	}

	/// Latest snapshot. Never blocks on the provider.
	pub fn snapshot(&self) -> Arc<Snapshot> {
		self.hub.current()
	}

	/// Receiver that always holds the latest snapshot.
	pub fn watch(&self) -> watch::Receiver<Arc<Snapshot>> {
		self.hub.watch()
	}

	/// Waits until a snapshot satisfies `predicate` and returns it.
	pub async fn wait_for(&self, predicate: impl Fn(&Snapshot) -> bool) -> Arc<Snapshot> {
		let mut rx = self.hub.watch();
		loop {
			let current = Arc::clone(&rx.borrow_and_update());
			if predicate(&current) {
				return current;
			}
			if rx.changed().await.is_err() {
				return self.snapshot();
			}
		}
	}

	/// Registers `listener`, invoking it now with the current snapshot and
	/// again after every transition.
	///
	/// Delivery stops when the returned [`Subscription`] is dropped or passed
	/// to [`unsubscribe`](Self::unsubscribe).
	pub fn subscribe(&self, listener: impl Fn(&Snapshot) + Send + Sync + 'static) -> Subscription {
		let subscription = self.hub.subscribe(Box::new(listener));
		debug!(target = "walletdash.facade", id = subscription.id(), "subscribed");
		subscription
	}

	/// Removes `subscription`. The listener is not invoked again once this
	/// returns, including when called from inside the listener itself.
	pub fn unsubscribe(&self, subscription: Subscription) {
		self.hub.unsubscribe(&subscription);
		debug!(target = "walletdash.facade", id = subscription.id(), "unsubscribed");
	}

	/// Number of live subscriptions.
	pub fn subscriber_count(&self) -> usize {
		self.hub.listener_count()
	}

	/// Brings the session up. Concurrent calls share one attempt.
	///
	/// Never fails: errors land in the returned snapshot as `Failed`, and
	/// calling again from `Failed` retries with a fresh construction.
	pub async fn initialize(&self) -> Arc<Snapshot> {
		self.machine.initialize().await
	}

	/// Opens the connection UI.
	///
	/// Before initialization completes, or in any status other than
	/// `Disconnected`, this is a no-op reported as [`ConnectOutcome::Ignored`].
	pub async fn request_connection(&self) -> ConnectOutcome {
		let outcome = match self.machine.connect().await {
			Ok(account) => ConnectOutcome::Connected(account),
			Err(Error::InvalidState { status, .. }) => ConnectOutcome::Ignored(status),
			Err(Error::ConnectionRejected(reason)) => ConnectOutcome::Rejected(reason),
			Err(Error::ConnectionUnavailable(reason)) => ConnectOutcome::Unavailable(reason),
			Err(Error::Cancelled) => ConnectOutcome::Cancelled,
			Err(err) => ConnectOutcome::Failed(err.to_session_error()),
		};
		info!(target = "walletdash.facade", outcome = ?outcome, "connection request finished");
		outcome
	}

	/// Disconnects, cancelling a pending connection attempt. A no-op when
	/// nothing is connected.
	pub async fn request_disconnection(&self) {
		self.machine.disconnect().await;
	}

	/// Configuration the session is bound to, once initialized.
	pub fn config(&self) -> Option<Arc<ConnectorConfig>> {
		self.machine.config()
	}

	/// The query cache shared with the state machine.
	pub fn cache(&self) -> &QueryCache {
		&self.cache
	}

	/// Cached native balance of the connected identity.
	///
	/// # Errors
	///
	/// `NotConnected` without a connected identity, `ExternalReadFailure`
	/// when the provider fails.
	pub async fn balance(&self, reads: &Arc<dyn ReadProvider>) -> Result<Scoped<Balance>> {
		self.read(QueryKind::Balance, reads, |reads, address, chain| async move {
			reads.balance(&address, chain).await
		})
		.await
	}

	/// Cached reverse-resolved name of the connected identity.
	pub async fn ens_name(&self, reads: &Arc<dyn ReadProvider>) -> Result<Scoped<Option<String>>> {
		self.read(QueryKind::Name, reads, |reads, address, chain| async move {
			reads.name(&address, chain).await
		})
		.await
	}

	pub async fn nfts(&self, reads: &Arc<dyn ReadProvider>) -> Result<Scoped<Vec<Nft>>> {
		self.read(QueryKind::Nfts, reads, |reads, address, chain| async move {
			reads.nfts(&address, chain).await
		})
		.await
	}

	pub async fn transactions(&self, reads: &Arc<dyn ReadProvider>) -> Result<Scoped<Vec<Transaction>>> {
		self.read(QueryKind::Transactions, reads, |reads, address, chain| async move {
			reads.transactions(&address, chain).await
		})
		.await
	}

	async fn read<T, F, Fut>(&self, kind: QueryKind, reads: &Arc<dyn ReadProvider>, fetch: F) -> Result<Scoped<T>>
	where
		T: Clone + Send + Sync + 'static,
		F: FnOnce(Arc<dyn ReadProvider>, Address, ChainId) -> Fut + Send + 'static,
		Fut: Future<Output = Result<T>> + Send + 'static,
	{
		let snapshot = self.snapshot();
		let identity = snapshot.session.identity().cloned().ok_or(Error::NotConnected)?;
		let key = QueryKey::scoped(kind, &identity);

		let reads = Arc::clone(reads);
		let address = identity.address.clone();
		let chain = identity.chain_id;
		let value = self.cache.get(&key, move || fetch(reads, address, chain)).await?;

		// The identity may have changed before the fetch was registered, in
		// which case its invalidation already ran and missed this entry.
		if self.snapshot().session.identity() != Some(&identity) && self.cache.remove(&key) {
			debug!(target = "walletdash.facade", key = %key, "dropped read for a departed identity");
		}
		Ok(Scoped { identity, value })
	}
}
