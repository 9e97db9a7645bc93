//! Plain data types shared by the walletdash crates.
//!
//! Everything here is a value: addresses, chains, the session record and its
//! snapshots, provider events, and the read models returned by data providers.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: no I/O and no async, only construction, accessors and formatting
//! * Serializable: every type round-trips through serde so snapshots can be
//!   logged or shipped to a renderer as JSON
//! * Invariant-carrying: a [`Session`] cannot be built with half an identity
//!
//! The state machine, cache and facade that produce these values live in the
//! `walletdash` crate.

pub mod address;
pub mod assets;
pub mod chain;
pub mod event;
pub mod format;
pub mod session;

pub use address::*;
pub use assets::*;
pub use chain::*;
pub use event::*;
pub use format::*;
pub use session::*;
