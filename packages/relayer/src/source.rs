//! Source-side event stream
//!
//! A source chain is read as a replayable, position-indexed sequence of bridge
//! events. Positions are block numbers on EVM chains and log positions for the
//! in-memory chain. Consumers keep their own cursor and may re-read any range.

use async_trait::async_trait;
use bridge_core::BridgeEvent;

use crate::error::RelayError;

/// Decoded (or undecodable) log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventBody {
    Bridge(BridgeEvent),
    /// Emitted by the bridge but not decodable; skipped by consumers
    Malformed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedEvent {
    pub position: u64,
    /// Order within one position
    pub log_index: u64,
    pub body: EventBody,
}

#[async_trait]
pub trait EventSource: Send + Sync {
    fn chain_name(&self) -> &str;

    /// Latest position considered final
    async fn head(&self) -> Result<u64, RelayError>;

    /// Events with `from <= position <= to`, ordered by (position, log_index)
    async fn events(&self, from: u64, to: u64) -> Result<Vec<ObservedEvent>, RelayError>;
}
