//! Keyed cache for identity-scoped external reads.
//!
//! Entries are keyed by (operation kind, address, chain) and carry their own
//! freshness window. A key has at most one fetch in flight: concurrent
//! callers join the pending fetch instead of issuing their own. Failures are
//! delivered to every waiter and never written.
//!
//! Invalidation detaches in-flight fetches as well as stored entries. A
//! detached fetch still resolves for the callers already waiting on it, but
//! its result is not written back.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};
use walletdash_protocol::{Address, ChainId, Identity};

use crate::error::{Error, Result};

/// Staleness window applied when a caller does not override it.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Operation part of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKind {
	Balance,
	/// Reverse name resolution (ENS).
	Name,
	Nfts,
	Transactions,
	Other(String),
}

impl QueryKind {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Balance => "balance",
			Self::Name => "name",
			Self::Nfts => "nfts",
			Self::Transactions => "transactions",
			Self::Other(kind) => kind,
		}
	}
}

impl fmt::Display for QueryKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for QueryKind {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Ok(match s {
			"balance" => Self::Balance,
			"name" => Self::Name,
			"nfts" => Self::Nfts,
			"transactions" => Self::Transactions,
			"" => return Err(Error::InvalidKey("empty query kind".to_string())),
			other if other.contains(':') => return Err(Error::InvalidKey(format!("query kind {other:?} contains ':'"))),
			other => Self::Other(other.to_string()),
		})
	}
}

/// Cache key rendered as `kind:address:chain`, e.g. `balance:0xabc:1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
	kind: QueryKind,
	address: Address,
	chain_id: ChainId,
}

impl QueryKey {
	pub fn new(kind: QueryKind, address: Address, chain_id: ChainId) -> Result<Self> {
		if let QueryKind::Other(name) = &kind {
			name.parse::<QueryKind>()?;
		}
		Ok(Self { kind, address, chain_id })
	}

	/// Key for `kind` scoped to a connected identity.
	pub fn scoped(kind: QueryKind, identity: &Identity) -> Self {
		Self {
			kind,
			address: identity.address.clone(),
			chain_id: identity.chain_id,
		}
	}

	pub fn kind(&self) -> &QueryKind {
		&self.kind
	}

	pub fn address(&self) -> &Address {
		&self.address
	}

	pub fn chain_id(&self) -> ChainId {
		self.chain_id
	}

	/// Whether the key belongs to the (address, chain) scope of `identity`.
	pub fn in_scope(&self, identity: &Identity) -> bool {
		self.address == identity.address && self.chain_id == identity.chain_id
	}
}

impl fmt::Display for QueryKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}:{}", self.kind, self.address, self.chain_id)
	}
}

impl FromStr for QueryKey {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let mut parts = s.splitn(3, ':');
		let (Some(kind), Some(address), Some(chain)) = (parts.next(), parts.next(), parts.next()) else {
			return Err(Error::InvalidKey(format!("{s:?} is not kind:address:chain")));
		};
		let chain_id = chain
			.parse::<ChainId>()
			.map_err(|_| Error::InvalidKey(format!("{chain:?} is not a chain id")))?;
		Ok(Self {
			kind: kind.parse()?,
			address: address.parse()?,
			chain_id,
		})
	}
}

type Value = Arc<dyn Any + Send + Sync>;
type Pending = Shared<BoxFuture<'static, Result<Value>>>;

struct Entry {
	value: Value,
	fetched_at: Instant,
	stale_after: Duration,
}

impl Entry {
	fn is_fresh(&self, window: Duration) -> bool {
		self.fetched_at.elapsed() < window
	}
}

struct InFlight {
	id: u64,
	pending: Pending,
}

#[derive(Default)]
struct Slots {
	entries: HashMap<QueryKey, Entry>,
	in_flight: HashMap<QueryKey, InFlight>,
}

/// Memoizing cache with request coalescing.
pub struct QueryCache {
	slots: Arc<Mutex<Slots>>,
	stale_after: Duration,
	next_fetch: AtomicU64,
}

impl Default for QueryCache {
	fn default() -> Self {
		Self::new(DEFAULT_STALE_AFTER)
	}
}

impl fmt::Debug for QueryCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let slots = self.slots.lock();
		f.debug_struct("QueryCache")
			.field("stale_after", &self.stale_after)
			.field("entries", &slots.entries.len())
			.field("in_flight", &slots.in_flight.len())
			.finish()
	}
}

impl QueryCache {
	pub fn new(stale_after: Duration) -> Self {
		Self {
			slots: Arc::new(Mutex::new(Slots::default())),
			stale_after,
			next_fetch: AtomicU64::new(0),
		}
	}

	/// Default staleness window of this cache.
	pub fn stale_after(&self) -> Duration {
		self.stale_after
	}

	/// Returns the value for `key`, fetching it when absent or stale.
	///
	/// # Errors
	///
	/// - `ExternalReadFailure` when the fetch (this caller's or the one it
	///   joined) fails.
	/// - `CacheTypeMismatch` when `key` holds a value of another type.
	pub async fn get<V, F, Fut, E>(&self, key: &QueryKey, fetcher: F) -> Result<V>
	where
		V: Clone + Send + Sync + 'static,
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
		E: fmt::Display + Send + 'static,
	{
		self.get_with(key, None, fetcher).await
	}

	/// [`get`](Self::get) with a per-call staleness window.
	///
	/// The override decides whether a stored entry is fresh enough for this
	/// caller and becomes the window of the entry written by a fetch this
	/// call starts.
	pub async fn get_with<V, F, Fut, E>(&self, key: &QueryKey, stale_after: Option<Duration>, fetcher: F) -> Result<V>
	where
		V: Clone + Send + Sync + 'static,
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
		E: fmt::Display + Send + 'static,
	{
		let pending = {
			let mut slots = self.slots.lock();
			if let Some(entry) = slots.entries.get(key) {
				if entry.is_fresh(stale_after.unwrap_or(entry.stale_after)) {
					trace!(target = "walletdash.cache", %key, "hit");
					return downcast(key, &entry.value);
				}
			}

			match slots.in_flight.get(key) {
				Some(flight) => {
					trace!(target = "walletdash.cache", %key, fetch = flight.id, "joining in-flight fetch");
					flight.pending.clone()
				}
				None => {
					let id = self.next_fetch.fetch_add(1, Ordering::Relaxed) + 1;
					let window = stale_after.unwrap_or(self.stale_after);
					debug!(target = "walletdash.cache", %key, fetch = id, "miss; fetching");
					let pending = self.start_fetch(key.clone(), id, window, fetcher);
					slots.in_flight.insert(key.clone(), InFlight { id, pending: pending.clone() });
					pending
				}
			}
		};

		let value = pending.await?;
		downcast(key, &value)
	}

	fn start_fetch<V, F, Fut, E>(&self, key: QueryKey, id: u64, window: Duration, fetcher: F) -> Pending
	where
		V: Clone + Send + Sync + 'static,
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
		E: fmt::Display + Send + 'static,
	{
		let slots = Arc::clone(&self.slots);

		// The fetcher runs on first poll, outside the slot lock.
		async move {
			let result = fetcher().await;

			let mut guard = slots.lock();
			let current = guard.in_flight.get(&key).is_some_and(|flight| flight.id == id);
			if current {
				guard.in_flight.remove(&key);
			}

			match result {
				Ok(value) => {
					let value: Value = Arc::new(value);
					if current {
						guard.entries.insert(
							key.clone(),
							Entry {
								value: Arc::clone(&value),
								fetched_at: Instant::now(),
								stale_after: window,
							},
						);
					} else {
						debug!(target = "walletdash.cache", %key, fetch = id, "fetch detached by invalidation; not stored");
					}
					Ok(value)
				}
				Err(err) => {
					drop(guard);
					debug!(target = "walletdash.cache", %key, fetch = id, error = %err, "fetch failed");
					Err(Error::ExternalReadFailure {
						key: key.to_string(),
						message: err.to_string(),
					})
				}
			}
		}
		.boxed()
		.shared()
	}

	/// Drops every entry and in-flight fetch scoped to `identity`.
	///
	/// Returns how many keys were affected.
	pub fn invalidate(&self, identity: &Identity) -> usize {
		let mut slots = self.slots.lock();
		let before = slots.entries.len() + slots.in_flight.len();
		slots.entries.retain(|key, _| !key.in_scope(identity));
		slots.in_flight.retain(|key, _| !key.in_scope(identity));
		let removed = before - slots.entries.len() - slots.in_flight.len();
		if removed > 0 {
			debug!(
				target = "walletdash.cache",
				address = %identity.address,
				chain = %identity.chain_id,
				removed,
				"invalidated identity scope"
			);
		}
		removed
	}

	pub fn invalidate_all(&self) {
		let mut slots = self.slots.lock();
		slots.entries.clear();
		slots.in_flight.clear();
	}

	/// Drops a single key. Returns whether anything was stored or pending.
	pub fn remove(&self, key: &QueryKey) -> bool {
		let mut slots = self.slots.lock();
		let entry = slots.entries.remove(key).is_some();
		let flight = slots.in_flight.remove(key).is_some();
		entry || flight
	}

	/// Whether `key` holds an entry inside its own staleness window.
	pub fn contains_fresh(&self, key: &QueryKey) -> bool {
		self.slots
			.lock()
			.entries
			.get(key)
			.is_some_and(|entry| entry.is_fresh(entry.stale_after))
	}

	/// Number of stored entries, fresh or stale.
	pub fn len(&self) -> usize {
		self.slots.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

fn downcast<V: Clone + 'static>(key: &QueryKey, value: &Value) -> Result<V> {
	(**value)
		.downcast_ref::<V>()
		.cloned()
		.ok_or_else(|| Error::CacheTypeMismatch { key: key.to_string() })
}
