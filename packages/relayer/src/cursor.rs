//! Relay cursor and failure bookkeeping
//!
//! The cursor is the last source position a coordinator has fully processed.
//! Losing it is safe: re-scanning from an earlier position only replays mints
//! the destination rejects as already used.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Relay that exhausted its retries or was rejected; needs operator attention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRelay {
    pub direction: String,
    pub position: u64,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub nonce: U256,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load(&self, direction: &str) -> Result<Option<u64>>;

    async fn save(&self, direction: &str, position: u64) -> Result<()>;

    async fn record_failure(&self, failure: &FailedRelay) -> Result<()>;
}

/// Process-local store; the cursor restarts from the configured block
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    cursors: Mutex<HashMap<String, u64>>,
    failures: Mutex<Vec<FailedRelay>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn failures(&self) -> Vec<FailedRelay> {
        self.failures.lock().await.clone()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn load(&self, direction: &str) -> Result<Option<u64>> {
        Ok(self.cursors.lock().await.get(direction).copied())
    }

    async fn save(&self, direction: &str, position: u64) -> Result<()> {
        self.cursors
            .lock()
            .await
            .insert(direction.to_string(), position);
        Ok(())
    }

    async fn record_failure(&self, failure: &FailedRelay) -> Result<()> {
        self.failures.lock().await.push(failure.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_per_direction() {
        let store = MemoryCursorStore::new();
        assert_eq!(store.load("a->b").await.unwrap(), None);

        store.save("a->b", 10).await.unwrap();
        store.save("b->a", 3).await.unwrap();
        store.save("a->b", 12).await.unwrap();

        assert_eq!(store.load("a->b").await.unwrap(), Some(12));
        assert_eq!(store.load("b->a").await.unwrap(), Some(3));
    }
}
