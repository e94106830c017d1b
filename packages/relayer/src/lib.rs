//! Mirror bridge relayer
//!
//! Watches each side of the bridge for burns and mints the mirrored amount on
//! the other side once a threshold of validators has attested to it.
//!
//! ## Architecture
//!
//! - [`source`] / [`submit`] - chain interfaces, implemented by [`chains::EvmChain`]
//!   (JSON-RPC) and [`chains::InMemoryChain`] (in-process [`bridge_core::BridgeInstance`])
//! - [`signers`] - validator keys, local or behind a remote signing service
//! - [`coordinator`] - one relay direction: poll, attest, submit, confirm
//! - [`retry`] - bounded exponential backoff with error classification
//! - [`cursor`] / [`db`] - relay cursor and failed-relay persistence
//! - [`api`] / [`metrics`] / [`status`] - health, Prometheus and status endpoints

pub mod api;
pub mod bounded_cache;
pub mod chains;
pub mod config;
pub mod coordinator;
pub mod cursor;
pub mod db;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod retry;
pub mod signers;
pub mod source;
pub mod status;
pub mod submit;

pub use coordinator::{CoordinatorConfig, PollSummary, RelayOutcome, RelayState, RelayerCoordinator};
pub use error::{ErrorClass, RelayError};
