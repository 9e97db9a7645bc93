//! Wallet session orchestration.
//!
//! `walletdash` keeps one canonical wallet session per process and hands out
//! consistent, cache-backed views of it:
//!
//! - [`SessionFacade`]: the consumer entry point. Snapshots, subscriptions,
//!   connect and disconnect requests, cached reads.
//! - [`QueryCache`]: keyed memoization with a staleness window and request
//!   coalescing, scoped to (address, chain).
//! - The connection state machine behind the facade, driven by provider
//!   events and user actions through a pure transition function.
//! - [`fake`]: an in-memory wallet for tests and demos.
//!
//! Connector construction and the provider boundary traits live in
//! `walletdash-runtime`; the plain data types in `walletdash-protocol`. Both
//! are re-exported here.

pub mod cache;
pub mod facade;
pub mod fake;
mod hub;
mod machine;
pub mod read;

pub use cache::{DEFAULT_STALE_AFTER, QueryCache, QueryKey, QueryKind};
pub use facade::{ConnectOutcome, SessionFacade};
pub use hub::Subscription;
pub use read::{ReadProvider, Scoped};
pub use walletdash_protocol as protocol;
pub use walletdash_runtime::error;
pub use walletdash_runtime::{
	ConnectorBackend, ConnectorConfig, Error, HostEnvironment, RegistrySettings, Result, StaticHost, WalletProvider,
};
