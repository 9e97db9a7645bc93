//! Wallet connector lifecycle for walletdash.
//!
//! This crate owns the boundary between the session core and the outside
//! world: the [`HostEnvironment`] the connector runs in, the
//! [`ConnectorBackend`] that builds the configuration and modal, and the
//! [`WalletProvider`] the modal exposes. [`ProviderRegistry`] constructs the
//! connector exactly once and hands out the result.

pub mod config;
pub mod error;
pub mod provider;
pub mod registry;

pub use config::{
	AppMetadata, ConnectorConfig, ConnectorMethod, ConnectorToggles, DEMO_PROJECT_ID, ModalOptions, PROJECT_ID_ENV, RegistrySettings,
	ThemeMode,
};
pub use error::{Error, Result};
pub use provider::{ConnectorBackend, HostEnvironment, StaticHost, WalletProvider};
pub use registry::{ProviderRegistry, Ready};
