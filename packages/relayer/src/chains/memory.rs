//! In-process chain backed by a [`BridgeInstance`]
//!
//! Implements both the event source and the submission interface so two
//! instances can be wired together without any node. Positions are event log
//! positions; every transaction is final as soon as it executes. Fault knobs
//! let callers simulate RPC failures, undecodable logs, and mints that sit in
//! the mempool or get dropped from it.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use bridge_core::{keccak256, BridgeError, BridgeInstance, SignaturePolicy};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::error::RelayError;
use crate::source::{EventBody, EventSource, ObservedEvent};
use crate::submit::{MintCall, MintSubmitter, TxHandle, TxReceipt, TxStatus};

#[derive(Debug, Clone)]
enum MemoryTx {
    /// Broadcast but not executed yet
    Held(MintCall),
    Mined(TxReceipt),
}

pub struct InMemoryChain {
    name: String,
    bridge: Arc<BridgeInstance>,
    relayer: Address,
    txs: Mutex<HashMap<TxHandle, MemoryTx>>,
    next_tx: AtomicU64,
    submissions: AtomicU32,
    fail_submissions: AtomicU32,
    fail_reads: AtomicU32,
    delay_confirmations: AtomicU32,
    drop_pending: AtomicU32,
    /// Undecodable entries, by position
    malformed: Mutex<BTreeMap<u64, Vec<String>>>,
}

impl InMemoryChain {
    pub fn new(name: impl Into<String>, bridge: Arc<BridgeInstance>, relayer: Address) -> Self {
        Self {
            name: name.into(),
            bridge,
            relayer,
            txs: Mutex::new(HashMap::new()),
            next_tx: AtomicU64::new(0),
            submissions: AtomicU32::new(0),
            fail_submissions: AtomicU32::new(0),
            fail_reads: AtomicU32::new(0),
            delay_confirmations: AtomicU32::new(0),
            drop_pending: AtomicU32::new(0),
            malformed: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn bridge(&self) -> &Arc<BridgeInstance> {
        &self.bridge
    }

    /// Same chain seen through another relayer account
    pub fn with_relayer(&self, relayer: Address) -> Self {
        Self::new(self.name.clone(), Arc::clone(&self.bridge), relayer)
    }

    /// Make the next `count` submissions fail as if the RPC were down
    pub fn fail_next_submissions(&self, count: u32) {
        self.fail_submissions.store(count, Ordering::SeqCst);
    }

    /// Hold mints in the mempool: the next `count` confirmation waits report
    /// them pending, and they execute on the first wait after that
    pub fn delay_next_confirmations(&self, count: u32) {
        self.delay_confirmations.store(count, Ordering::SeqCst);
    }

    /// Hold mints in the mempool and evict the next `count` of them when
    /// their confirmation is awaited
    pub fn drop_next_pending(&self, count: u32) {
        self.drop_pending.store(count, Ordering::SeqCst);
    }

    /// Mint submissions seen, failed ones included
    pub fn submissions(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Make the next `count` head/log reads fail
    pub fn fail_next_reads(&self, count: u32) {
        self.fail_reads.store(count, Ordering::SeqCst);
    }

    /// Attach an undecodable log entry to the latest position
    pub fn inject_malformed(&self, reason: impl Into<String>) {
        let position = self.bridge.event_head().max(1);
        self.malformed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry(position)
            .or_default()
            .push(reason.into());
    }

    fn take_fault(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn read_fault(&self) -> Result<(), RelayError> {
        if Self::take_fault(&self.fail_reads) {
            return Err(RelayError::TransientSubmissionFailure(format!(
                "{}: connection reset while reading logs",
                self.name
            )));
        }
        Ok(())
    }

    fn next_tx_hash(&self) -> B256 {
        let sequence = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let mut preimage = self.name.as_bytes().to_vec();
        preimage.extend_from_slice(&sequence.to_be_bytes());
        keccak256(&preimage)
    }

    fn holds_mints(&self) -> bool {
        self.delay_confirmations.load(Ordering::SeqCst) > 0 || self.drop_pending.load(Ordering::SeqCst) > 0
    }

    fn execute(&self, call: &MintCall, tx_hash: B256) -> Result<TxReceipt, BridgeError> {
        let settlement = self.bridge.mint(
            self.relayer,
            call.from,
            call.to,
            call.amount,
            call.nonce,
            call.user_signature.clone(),
            &call.owner_signatures,
        )?;

        let position = settlement
            .event
            .as_ref()
            .map(|e| e.position)
            .unwrap_or_else(|| self.bridge.event_head());
        debug!(chain = %self.name, %tx_hash, position, "Mint executed");
        Ok(TxReceipt {
            tx_hash,
            position,
            success: true,
            revert_reason: None,
        })
    }
}

#[async_trait]
impl EventSource for InMemoryChain {
    fn chain_name(&self) -> &str {
        &self.name
    }

    async fn head(&self) -> Result<u64, RelayError> {
        self.read_fault()?;
        let injected = self
            .malformed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .next_back()
            .copied()
            .unwrap_or_default();
        Ok(self.bridge.event_head().max(injected))
    }

    async fn events(&self, from: u64, to: u64) -> Result<Vec<ObservedEvent>, RelayError> {
        self.read_fault()?;
        let mut events: Vec<ObservedEvent> = self
            .bridge
            .events_in_range(from, to)
            .into_iter()
            .map(|logged| ObservedEvent {
                position: logged.position,
                log_index: 0,
                body: EventBody::Bridge(logged.event),
            })
            .collect();

        let malformed = self.malformed.lock().unwrap_or_else(|p| p.into_inner());
        for (position, reasons) in malformed.range(from..=to) {
            for (i, reason) in reasons.iter().enumerate() {
                events.push(ObservedEvent {
                    position: *position,
                    log_index: i as u64 + 1,
                    body: EventBody::Malformed {
                        reason: reason.clone(),
                    },
                });
            }
        }
        events.sort_by_key(|e| (e.position, e.log_index));
        Ok(events)
    }
}

#[async_trait]
impl MintSubmitter for InMemoryChain {
    fn chain_name(&self) -> &str {
        &self.name
    }

    fn bridge_address(&self) -> Address {
        self.bridge.address()
    }

    fn relayer_address(&self) -> Address {
        self.relayer
    }

    async fn policy(&self) -> Result<SignaturePolicy, RelayError> {
        Ok(self.bridge.policy().clone())
    }

    async fn submit(&self, call: &MintCall) -> Result<TxHandle, RelayError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if Self::take_fault(&self.fail_submissions) {
            return Err(RelayError::TransientSubmissionFailure(format!(
                "{}: connection refused",
                self.name
            )));
        }

        let handle = TxHandle {
            tx_hash: self.next_tx_hash(),
        };
        let tx = if self.holds_mints() {
            debug!(chain = %self.name, tx_hash = %handle.tx_hash, "Mint held in mempool");
            MemoryTx::Held(call.clone())
        } else {
            MemoryTx::Mined(self.execute(call, handle.tx_hash)?)
        };
        self.txs.lock().unwrap_or_else(|p| p.into_inner()).insert(handle, tx);
        Ok(handle)
    }

    async fn await_confirmation(&self, handle: &TxHandle, _timeout: Duration) -> Result<TxStatus, RelayError> {
        let mut txs = self.txs.lock().unwrap_or_else(|p| p.into_inner());
        let call = match txs.get(handle) {
            None => return Ok(TxStatus::Dropped),
            Some(MemoryTx::Mined(receipt)) => return Ok(TxStatus::Mined(receipt.clone())),
            Some(MemoryTx::Held(call)) => call.clone(),
        };

        if Self::take_fault(&self.drop_pending) {
            txs.remove(handle);
            return Ok(TxStatus::Dropped);
        }
        if Self::take_fault(&self.delay_confirmations) {
            return Ok(TxStatus::Pending);
        }

        // Included now; the state may have moved since broadcast
        let receipt = self.execute(&call, handle.tx_hash).unwrap_or_else(|e| TxReceipt {
            tx_hash: handle.tx_hash,
            position: self.bridge.event_head(),
            success: false,
            revert_reason: Some(e.to_string()),
        });
        txs.insert(*handle, MemoryTx::Mined(receipt.clone()));
        Ok(TxStatus::Mined(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::testing::{dev_address, ether, test_instance, RELAYER_KEY};

    #[tokio::test]
    async fn test_events_include_injected_malformed() {
        let (bridge, _) = test_instance(1);
        let chain = InMemoryChain::new("chain-a", Arc::new(bridge), dev_address(RELAYER_KEY));

        chain.bridge().deposit_eth(dev_address(0), ether(1)).unwrap();
        chain.inject_malformed("truncated data");
        chain.bridge().deposit_eth(dev_address(0), ether(1)).unwrap();

        assert_eq!(chain.head().await.unwrap(), 2);
        let events = chain.events(1, 2).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!((events[0].position, events[0].log_index), (1, 0));
        assert!(matches!(events[1].body, EventBody::Malformed { .. }));
        assert_eq!(events[2].position, 2);
    }

    #[tokio::test]
    async fn test_read_faults_are_transient() {
        let (bridge, _) = test_instance(1);
        let chain = InMemoryChain::new("chain-a", Arc::new(bridge), dev_address(RELAYER_KEY));
        chain.fail_next_reads(1);
        assert!(chain.head().await.is_err());
        assert_eq!(chain.head().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_held_mint_reverts_if_nonce_taken_meanwhile() {
        use alloy::primitives::U256;
        use bridge_core::testing::{mint_signatures, user_signature, BRIDGE_B, USER_KEY};

        let (bridge, _) = test_instance(2);
        let chain = InMemoryChain::new("chain-b", Arc::new(bridge), dev_address(RELAYER_KEY));
        chain.bridge().deposit_eth(dev_address(0), ether(1)).unwrap();

        let user = dev_address(USER_KEY);
        let nonce = U256::from(1u64);
        let call = MintCall {
            from: user,
            to: user,
            amount: ether(1),
            nonce,
            user_signature: user_signature(USER_KEY, user, ether(1), nonce),
            owner_signatures: mint_signatures(BRIDGE_B, user, user, ether(1), nonce, &[0, 1]),
        };

        chain.delay_next_confirmations(1);
        let handle = chain.submit(&call).await.unwrap();
        assert_eq!(chain.await_confirmation(&handle, Duration::ZERO).await.unwrap(), TxStatus::Pending);

        // Someone else lands the same mint first
        chain
            .bridge()
            .mint(dev_address(0), user, user, ether(1), nonce, call.user_signature.clone(), &call.owner_signatures)
            .unwrap();

        match chain.await_confirmation(&handle, Duration::ZERO).await.unwrap() {
            TxStatus::Mined(receipt) => {
                assert!(!receipt.success);
                assert!(receipt.revert_reason.unwrap().contains("Nonce already used"));
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(chain.submissions(), 1);
    }
}
