use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use walletdash::fake::{FakeWalletBuilder, FakeWalletController};
use walletdash::protocol::{Address, ChainId, ErrorKind, Identity, SessionStatus, Snapshot};
use walletdash::{ConnectOutcome, Error, RegistrySettings, SessionFacade};

const ALICE: &str = "0xAA00000000000000000000000000000000000011";
const BOB: &str = "0xBB00000000000000000000000000000000000022";

fn addr(s: &str) -> Address {
	Address::new(s).unwrap()
}

fn facade_with(builder: FakeWalletBuilder) -> (Arc<SessionFacade>, FakeWalletController) {
	let (parts, controller) = builder.build();
	let facade = SessionFacade::new(RegistrySettings::default(), parts.host, parts.backend);
	(Arc::new(facade), controller)
}

async fn settle(facade: &SessionFacade, predicate: impl Fn(&Snapshot) -> bool) -> Arc<Snapshot> {
	tokio::time::timeout(Duration::from_secs(5), facade.wait_for(predicate))
		.await
		.expect("session did not reach the expected state")
}

async fn connected(address: &str, chain: u64) -> (Arc<SessionFacade>, FakeWalletController) {
	let (facade, controller) = facade_with(FakeWalletBuilder::new());
	facade.initialize().await;
	controller.approve_next(addr(address), ChainId(chain));
	assert!(facade.request_connection().await.is_connected());
	(facade, controller)
}

#[tokio::test(start_paused = true)]
async fn concurrent_initialize_constructs_once() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new().with_construct_delay(Duration::from_millis(20)));

	let mut handles = Vec::new();
	for _ in 0..8 {
		let facade = Arc::clone(&facade);
		handles.push(tokio::spawn(async move { facade.initialize().await }));
	}
	for handle in handles {
		assert_eq!(handle.await.unwrap().status(), SessionStatus::Disconnected);
	}

	assert_eq!(controller.config_constructions(), 1);
	assert_eq!(controller.modal_constructions(), 1);

	facade.initialize().await;
	assert_eq!(controller.config_constructions(), 1);
}

#[tokio::test]
async fn unavailable_host_fails_without_constructing() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new().unavailable());

	let snapshot = facade.initialize().await;
	assert_eq!(snapshot.status(), SessionStatus::Failed);
	assert_eq!(snapshot.session.error().map(|e| e.kind), Some(ErrorKind::EnvironmentUnavailable));
	assert_eq!(controller.config_constructions(), 0);

	controller.set_available(true);
	let snapshot = facade.initialize().await;
	assert_eq!(snapshot.status(), SessionStatus::Disconnected);
	assert_eq!(controller.config_constructions(), 1);
	assert_eq!(
		facade.config().unwrap().metadata.url,
		"http://localhost:3000",
		"metadata url falls back to the host origin"
	);
}

#[tokio::test]
async fn failed_construction_is_retried_from_scratch() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new());
	controller.fail_next_construction(Error::ProviderFault("relay bootstrap unreachable".into()));

	let snapshot = facade.initialize().await;
	assert_eq!(snapshot.status(), SessionStatus::Failed);
	let error = snapshot.session.error().unwrap();
	assert_eq!(error.kind, ErrorKind::ProviderFault);
	assert!(error.message.contains("relay bootstrap unreachable"));

	assert_eq!(facade.initialize().await.status(), SessionStatus::Disconnected);
	assert_eq!(controller.config_constructions(), 2);
	assert_eq!(controller.modal_constructions(), 1);
}

#[tokio::test]
async fn failed_probe_fails_initialization() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new());
	controller.fail_next_probe(Error::ProviderFault("eth_accounts timed out".into()));

	assert_eq!(facade.initialize().await.status(), SessionStatus::Failed);
	assert_eq!(facade.initialize().await.status(), SessionStatus::Disconnected);
}

#[tokio::test]
async fn restored_session_connects_on_initialize() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new().with_session(addr(ALICE), ChainId(137)));

	let snapshot = facade.initialize().await;
	assert_eq!(snapshot.status(), SessionStatus::Connected);
	assert_eq!(snapshot.session.identity(), Some(&Identity::new(addr(ALICE), ChainId(137))));
	assert_eq!(controller.authorization_requests(), 0);
}

#[tokio::test]
async fn restored_session_on_unknown_chain_is_unsupported() {
	let (facade, _controller) = facade_with(FakeWalletBuilder::new().with_session(addr(ALICE), ChainId(10)));

	let snapshot = facade.initialize().await;
	assert_eq!(snapshot.status(), SessionStatus::UnsupportedNetwork);
	assert_eq!(snapshot.session.unsupported_chain(), Some(ChainId(10)));
	assert!(snapshot.session.identity().is_none());
}

#[tokio::test]
async fn actions_before_initialize_are_no_ops() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new());

	assert_eq!(facade.request_connection().await, ConnectOutcome::Ignored(SessionStatus::Uninitialized));
	facade.request_disconnection().await;
	assert_eq!(facade.snapshot().seq, 0);
	assert_eq!(controller.authorization_requests(), 0);
	assert_eq!(controller.disconnect_calls(), 0);
}

#[tokio::test]
async fn rejection_and_missing_wallet_return_to_disconnected() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new());
	facade.initialize().await;

	controller.reject_next("user closed modal");
	assert_eq!(facade.request_connection().await, ConnectOutcome::Rejected("user closed modal".into()));
	assert_eq!(facade.snapshot().status(), SessionStatus::Disconnected);

	assert!(matches!(facade.request_connection().await, ConnectOutcome::Unavailable(_)));
	assert_eq!(facade.snapshot().status(), SessionStatus::Disconnected);
}

#[tokio::test]
async fn connect_while_connected_is_ignored() {
	let (facade, controller) = connected(ALICE, 1).await;
	assert_eq!(facade.request_connection().await, ConnectOutcome::Ignored(SessionStatus::Connected));
	assert_eq!(controller.authorization_requests(), 1);
}

#[tokio::test]
async fn authorization_fault_fails_session() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new());
	facade.initialize().await;
	controller.fail_next(Error::ProviderFault("signer crashed".into()));

	assert!(matches!(facade.request_connection().await, ConnectOutcome::Failed(_)));
	assert_eq!(facade.snapshot().status(), SessionStatus::Failed);
}

#[tokio::test]
async fn disconnect_during_connecting_discards_late_authorization() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new());
	facade.initialize().await;
	let pending = controller.defer_next();

	let request = {
		let facade = Arc::clone(&facade);
		tokio::spawn(async move { facade.request_connection().await })
	};
	settle(&facade, |s| s.status() == SessionStatus::Connecting).await;

	facade.request_disconnection().await;
	assert_eq!(facade.snapshot().status(), SessionStatus::Disconnected);

	pending.approve(addr(ALICE), ChainId(1));
	assert_eq!(request.await.unwrap(), ConnectOutcome::Cancelled);

	let snapshot = facade.snapshot();
	assert_eq!(snapshot.status(), SessionStatus::Disconnected);
	assert!(snapshot.session.identity().is_none());
}

#[tokio::test]
async fn provider_disconnect_failure_is_not_fatal() {
	let (facade, controller) = connected(ALICE, 1).await;
	controller.set_fail_disconnect(true);

	facade.request_disconnection().await;
	assert_eq!(facade.snapshot().status(), SessionStatus::Disconnected);
	assert_eq!(controller.disconnect_calls(), 1);

	facade.request_disconnection().await;
	assert_eq!(controller.disconnect_calls(), 1, "nothing left to disconnect");
}

#[tokio::test]
async fn account_and_chain_switches_replace_identity() {
	let (facade, controller) = connected(ALICE, 1).await;

	controller.switch_account(addr(BOB));
	let snapshot = settle(&facade, |s| s.session.address() == Some(&addr(BOB))).await;
	assert_eq!(snapshot.session.chain_id(), Some(ChainId(1)));

	controller.switch_chain(ChainId(42161));
	let snapshot = settle(&facade, |s| s.session.chain_id() == Some(ChainId(42161))).await;
	assert_eq!(snapshot.session.address(), Some(&addr(BOB)));
}

#[tokio::test]
async fn unsupported_chain_round_trip() {
	let (facade, controller) = connected(ALICE, 1).await;

	controller.switch_chain(ChainId(10));
	let snapshot = settle(&facade, |s| s.status() == SessionStatus::UnsupportedNetwork).await;
	assert_eq!(snapshot.session.unsupported_chain(), Some(ChainId(10)));
	assert!(snapshot.session.address().is_none());

	controller.switch_chain(ChainId(137));
	let snapshot = settle(&facade, |s| s.status() == SessionStatus::Connected).await;
	assert_eq!(snapshot.session.identity(), Some(&Identity::new(addr(ALICE), ChainId(137))));
}

#[tokio::test]
async fn wallet_side_termination_disconnects() {
	let (facade, controller) = connected(ALICE, 1).await;
	controller.terminate();
	settle(&facade, |s| s.status() == SessionStatus::Disconnected).await;

	let (facade, controller) = connected(ALICE, 1).await;
	controller.revoke();
	settle(&facade, |s| s.status() == SessionStatus::Disconnected).await;
}

#[tokio::test]
async fn fault_fails_session_and_reinitialize_rebinds() {
	let (facade, controller) = connected(ALICE, 1).await;

	controller.fault("transport closed");
	let snapshot = settle(&facade, |s| s.status() == SessionStatus::Failed).await;
	assert!(snapshot.session.error().unwrap().message.contains("transport closed"));

	// The wallet still holds the authorization, so re-initializing restores it.
	let snapshot = facade.initialize().await;
	assert_eq!(snapshot.status(), SessionStatus::Connected);
	assert_eq!(controller.modal_constructions(), 2);

	let before = facade.snapshot().seq;
	controller.switch_chain(ChainId(137));
	let snapshot = settle(&facade, |s| s.session.chain_id() == Some(ChainId(137))).await;
	assert_eq!(snapshot.seq, before + 1);
}

#[tokio::test]
async fn subscribers_see_increasing_sequence() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new());
	let seen = Arc::new(Mutex::new(Vec::new()));
	let subscription = {
		let seen = Arc::clone(&seen);
		facade.subscribe(move |s: &Snapshot| seen.lock().push((s.seq, s.status())))
	};
	assert_eq!(*seen.lock(), vec![(0, SessionStatus::Uninitialized)]);

	facade.initialize().await;
	controller.approve_next(addr(ALICE), ChainId(1));
	facade.request_connection().await;
	controller.switch_account(addr(BOB));
	settle(&facade, |s| s.session.address() == Some(&addr(BOB))).await;

	facade.unsubscribe(subscription);
	facade.request_disconnection().await;

	let seen = seen.lock().clone();
	let statuses: Vec<_> = seen.iter().map(|(_, status)| *status).collect();
	assert_eq!(
		statuses,
		vec![
			SessionStatus::Uninitialized,
			SessionStatus::Initializing,
			SessionStatus::Disconnected,
			SessionStatus::Connecting,
			SessionStatus::Connected,
			SessionStatus::Connected,
		]
	);
	assert!(seen.windows(2).all(|pair| pair[0].0 < pair[1].0));
	assert_eq!(facade.subscriber_count(), 0);
}

#[tokio::test]
async fn listener_may_call_back_into_facade() {
	let (facade, controller) = facade_with(FakeWalletBuilder::new());
	let observed = Arc::new(Mutex::new(Vec::new()));
	let _subscription = {
		let weak = Arc::downgrade(&facade);
		let observed = Arc::clone(&observed);
		facade.subscribe(move |s: &Snapshot| {
			if let Some(facade) = weak.upgrade() {
				observed.lock().push(facade.snapshot().seq >= s.seq);
			}
		})
	};

	facade.initialize().await;
	controller.approve_next(addr(ALICE), ChainId(1));
	facade.request_connection().await;

	let observed = observed.lock();
	assert!(observed.len() >= 4);
	assert!(observed.iter().all(|ok| *ok));
}

#[tokio::test]
async fn identity_is_never_partial_across_events() {
	let (facade, controller) = connected(ALICE, 1).await;
	let violations = Arc::new(Mutex::new(0usize));
	let _subscription = {
		let violations = Arc::clone(&violations);
		facade.subscribe(move |s: &Snapshot| {
			let session = &s.session;
			if session.address().is_some() != session.chain_id().is_some() {
				*violations.lock() += 1;
			}
		})
	};

	controller.switch_chain(ChainId(10));
	controller.switch_account(addr(BOB));
	controller.switch_chain(ChainId(1));
	controller.switch_account(addr(ALICE));
	controller.revoke();
	settle(&facade, |s| s.status() == SessionStatus::Disconnected).await;

	assert_eq!(*violations.lock(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn events_queued_during_probe_reach_the_session() {
	for _ in 0..50 {
		let (facade, controller) = facade_with(FakeWalletBuilder::new().with_session(addr(ALICE), ChainId(1)));
		controller.emit_during_next_probe([walletdash::protocol::ProviderEvent::ChainChanged(ChainId(137))]);

		facade.initialize().await;
		let snapshot = settle(&facade, |s| s.session.chain_id() == Some(ChainId(137))).await;
		assert_eq!(snapshot.session.address(), Some(&addr(ALICE)));

		controller.switch_chain(ChainId(42161));
		settle(&facade, |s| s.session.chain_id() == Some(ChainId(42161))).await;
		assert_eq!(controller.subscriber_count(), 1);
	}
}
