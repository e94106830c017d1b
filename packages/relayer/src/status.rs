//! Relay statistics shared between coordinators and the HTTP server

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cursor::FailedRelay;

/// Failed relays kept for `/status`
const MAX_RECENT_FAILURES: usize = 100;

#[derive(Debug, Default, Clone, Serialize)]
pub struct DirectionStatus {
    pub cursor: u64,
    pub source_head: u64,
    pub in_flight: usize,
    pub minted: u64,
    pub already_relayed: u64,
    pub failed: u64,
    pub malformed_skipped: u64,
    /// Polls that stopped on a broadcast mint still awaiting inclusion
    pub unresolved: u64,
    pub last_poll: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRelayView {
    pub direction: String,
    pub position: u64,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub nonce: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

impl From<&FailedRelay> for FailedRelayView {
    fn from(f: &FailedRelay) -> Self {
        Self {
            direction: f.direction.clone(),
            position: f.position,
            from: f.from.to_string(),
            to: f.to.to_string(),
            amount: f.amount.to_string(),
            nonce: f.nonce.to_string(),
            error: f.error.clone(),
            failed_at: f.failed_at,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct StatusBoard {
    pub directions: BTreeMap<String, DirectionStatus>,
    pub recent_failures: Vec<FailedRelayView>,
}

impl StatusBoard {
    pub fn direction(&mut self, direction: &str) -> &mut DirectionStatus {
        self.directions.entry(direction.to_string()).or_default()
    }

    pub fn push_failure(&mut self, failure: &FailedRelay) {
        self.recent_failures.push(failure.into());
        if self.recent_failures.len() > MAX_RECENT_FAILURES {
            let excess = self.recent_failures.len() - MAX_RECENT_FAILURES;
            self.recent_failures.drain(..excess);
        }
    }

    /// Ready once every direction has completed at least one poll
    pub fn is_ready(&self) -> bool {
        !self.directions.is_empty() && self.directions.values().all(|d| d.last_poll.is_some())
    }
}

pub type SharedStatus = Arc<RwLock<StatusBoard>>;
