//! Snapshot publication and listener fan-out.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use tokio::sync::watch;
use walletdash_protocol::Snapshot;

type Listener = dyn Fn(&Snapshot) + Send + Sync;

struct Slot {
	listener: Box<Listener>,
	active: AtomicBool,
	/// `seq + 1` of the last snapshot delivered, 0 before the first.
	delivered: AtomicU64,
}

impl Slot {
	fn deliver(&self, snapshot: &Snapshot) {
		if !self.active.load(Ordering::Acquire) {
			return;
		}
		let mark = snapshot.seq + 1;
		if self.delivered.fetch_max(mark, Ordering::AcqRel) >= mark {
			return;
		}
		(self.listener)(snapshot);
	}
}

/// A consumer's registration for snapshot updates.
///
/// The hub holds only a weak reference; dropping the subscription stops
/// delivery.
#[must_use = "dropping a Subscription stops delivery"]
pub struct Subscription {
	id: u64,
	slot: Arc<Slot>,
}

impl Subscription {
	pub fn id(&self) -> u64 {
		self.id
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.slot.active.load(Ordering::Relaxed))
			.finish()
	}
}

pub(crate) struct SnapshotHub {
	current: watch::Sender<Arc<Snapshot>>,
	listeners: Mutex<Vec<(u64, Weak<Slot>)>>,
	dispatch: ReentrantMutex<()>,
	next_id: AtomicU64,
}

impl SnapshotHub {
	pub fn new() -> Self {
		let (current, _) = watch::channel(Arc::new(Snapshot::initial()));
		Self {
			current,
			listeners: Mutex::new(Vec::new()),
			dispatch: ReentrantMutex::new(()),
			next_id: AtomicU64::new(0),
		}
	}

	/// Serializes publications. Held by the machine around each transition
	/// and its fan-out so listeners see snapshots in `seq` order.
	pub fn dispatch_lock(&self) -> ReentrantMutexGuard<'_, ()> {
		self.dispatch.lock()
	}

	pub fn current(&self) -> Arc<Snapshot> {
		Arc::clone(&self.current.borrow())
	}

	pub fn watch(&self) -> watch::Receiver<Arc<Snapshot>> {
		self.current.subscribe()
	}

	/// Makes `snapshot` the current value without notifying listeners.
	pub fn store(&self, snapshot: Arc<Snapshot>) {
		self.current.send_replace(snapshot);
	}

	/// Delivers `snapshot` to every live listener.
	pub fn notify(&self, snapshot: &Snapshot) {
		let _dispatch = self.dispatch.lock();
		let slots: Vec<Arc<Slot>> = {
			let mut listeners = self.listeners.lock();
			listeners.retain(|(_, slot)| slot.strong_count() > 0);
			listeners.iter().filter_map(|(_, slot)| slot.upgrade()).collect()
		};
		for slot in slots {
			slot.deliver(snapshot);
		}
	}

	pub fn subscribe(&self, listener: Box<Listener>) -> Subscription {
		let _dispatch = self.dispatch.lock();
		let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
		let slot = Arc::new(Slot {
			listener,
			active: AtomicBool::new(true),
			delivered: AtomicU64::new(0),
		});
		self.listeners.lock().push((id, Arc::downgrade(&slot)));
		slot.deliver(&self.current());
		Subscription { id, slot }
	}

	pub fn unsubscribe(&self, subscription: &Subscription) {
		subscription.slot.active.store(false, Ordering::Release);
		// Waits out a fan-out running on another thread.
		let _dispatch = self.dispatch.lock();
		self.listeners.lock().retain(|(id, _)| *id != subscription.id);
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.lock().iter().filter(|(_, slot)| slot.strong_count() > 0).count()
	}
}

#[cfg(test)]
mod tests {
	use walletdash_protocol::Session;

	use super::*;

	fn snapshot(seq: u64) -> Arc<Snapshot> {
		Arc::new(Snapshot {
			seq,
			session: Session::disconnected(),
		})
	}

	fn recorder() -> (Arc<Mutex<Vec<u64>>>, Box<Listener>) {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		(seen, Box::new(move |s: &Snapshot| sink.lock().push(s.seq)))
	}

	#[test]
	fn subscribe_delivers_current_immediately() {
		let hub = SnapshotHub::new();
		let (seen, listener) = recorder();
		let _sub = hub.subscribe(listener);
		assert_eq!(*seen.lock(), vec![0]);
	}

	#[test]
	fn older_snapshots_are_never_delivered_after_newer() {
		let hub = SnapshotHub::new();
		let (seen, listener) = recorder();
		let _sub = hub.subscribe(listener);

		for seq in [1, 3, 2, 3, 4] {
			let snap = snapshot(seq);
			hub.store(Arc::clone(&snap));
			hub.notify(&snap);
		}
		assert_eq!(*seen.lock(), vec![0, 1, 3, 4]);
		assert_eq!(hub.current().seq, 4);
	}

	#[test]
	fn dropped_subscription_stops_delivery() {
		let hub = SnapshotHub::new();
		let (seen, listener) = recorder();
		let sub = hub.subscribe(listener);
		assert_eq!(hub.listener_count(), 1);
		drop(sub);

		hub.notify(&snapshot(1));
		assert_eq!(*seen.lock(), vec![0]);
		assert_eq!(hub.listener_count(), 0);
	}

	#[test]
	fn unsubscribe_from_inside_listener() {
		let hub = Arc::new(SnapshotHub::new());
		let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
		let calls = Arc::new(AtomicU64::new(0));

		let sub = {
			let hub_ref = Arc::downgrade(&hub);
			let slot = Arc::clone(&slot);
			let calls = Arc::clone(&calls);
			hub.subscribe(Box::new(move |s: &Snapshot| {
				calls.fetch_add(1, Ordering::SeqCst);
				if s.seq == 1 {
					if let (Some(hub), Some(sub)) = (hub_ref.upgrade(), slot.lock().as_ref()) {
						hub.unsubscribe(sub);
					}
				}
			}))
		};
		*slot.lock() = Some(sub);

		hub.notify(&snapshot(1));
		hub.notify(&snapshot(2));
		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert_eq!(hub.listener_count(), 0);
	}

	#[tokio::test]
	async fn watch_follows_store() {
		let hub = SnapshotHub::new();
		let mut rx = hub.watch();
		hub.store(snapshot(5));
		rx.changed().await.unwrap();
		assert_eq!(rx.borrow().seq, 5);
	}
}
