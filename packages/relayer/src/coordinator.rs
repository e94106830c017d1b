//! Relayer coordinator: one direction of burn → mint relaying
//!
//! Polls the source for finalized `Transfer` events with step `Burn`, collects
//! a threshold of validator signatures over the destination's mint attestation
//! and submits the mint. Every relay walks
//! `Observed → AttestationCollecting → Submitted → Confirmed | Failed`.
//!
//! The destination nonce registry is the only idempotency authority: a replay
//! rejection on submit means another relayer (or an earlier run) already
//! minted, and is reported as [`RelayOutcome::AlreadyRelayed`]. Any number of
//! coordinators may therefore watch the same source concurrently.
//!
//! The cursor only advances past a position once every event at that position
//! has reached a terminal outcome. Failed relays are recorded for operator
//! attention and do not block later transfers. A broadcast mint is never sent
//! twice: its handle is kept and awaited until the destination reports it
//! mined or dropped, and the cursor holds before it in the meantime.

use alloy::primitives::{Address, B256};
use bridge_core::{
    recover_signer, AttestationMessage, BridgeError, BridgeEvent, Channel, SignaturePolicy,
    SignatureSet, Step, TransferRecord,
};
use chrono::Utc;
use eyre::Result;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::bounded_cache::BoundedHashCache;
use crate::cursor::{CursorStore, FailedRelay};
use crate::error::{classify_error, ErrorClass, RelayError};
use crate::metrics;
use crate::retry::{with_retry, RetryConfig, RetryOutcome};
use crate::signers::ValidatorSigner;
use crate::source::{EventBody, EventSource, ObservedEvent};
use crate::status::{SharedStatus, StatusBoard};
use crate::submit::{MintCall, MintSubmitter, TxHandle, TxReceipt, TxStatus};

/// Completed relays remembered to short-circuit re-scans
const COMPLETED_CACHE_SIZE: usize = 10_000;
const COMPLETED_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub poll_interval: Duration,
    /// Maximum positions scanned per poll
    pub max_block_range: u64,
    /// Per-validator signing deadline
    pub signature_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub retry: RetryConfig,
    /// First position scanned when no cursor is stored
    pub start_position: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_block_range: 1000,
            signature_timeout: Duration::from_secs(10),
            confirmation_timeout: Duration::from_secs(120),
            retry: RetryConfig::default(),
            start_position: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Observed,
    AttestationCollecting,
    Submitted,
    Confirmed,
    Failed,
}

impl RelayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayState::Observed => "observed",
            RelayState::AttestationCollecting => "attestation_collecting",
            RelayState::Submitted => "submitted",
            RelayState::Confirmed => "confirmed",
            RelayState::Failed => "failed",
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal outcome of one relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Minted { tx_hash: B256, position: u64 },
    /// The destination had already consumed the mint nonce
    AlreadyRelayed,
    /// Retries exhausted or permanently rejected; recorded for the operator
    Failed(RelayError),
    /// Shutdown requested before submission; the event stays unprocessed
    Cancelled,
    /// Broadcast but neither mined nor dropped yet; awaited again next poll
    Unresolved { tx_hash: B256 },
}

/// What one poll did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Scanned range, `None` when the source had nothing new
    pub range: Option<(u64, u64)>,
    pub minted: usize,
    pub already_relayed: usize,
    pub failed: usize,
    pub malformed: usize,
    pub cancelled: bool,
    /// Stopped on a broadcast mint that has not resolved
    pub unresolved: Option<B256>,
    pub cursor: u64,
}

pub struct RelayerCoordinator {
    direction: String,
    config: CoordinatorConfig,
    source: Arc<dyn EventSource>,
    destination: Arc<dyn MintSubmitter>,
    signers: Vec<Arc<dyn ValidatorSigner>>,
    cursor_store: Arc<dyn CursorStore>,
    status: SharedStatus,
    shutdown: Option<watch::Receiver<bool>>,
    completed: Mutex<BoundedHashCache>,
    /// Broadcast mints by attestation digest, until mined or dropped
    broadcasts: Mutex<HashMap<B256, TxHandle>>,
    in_flight: AtomicUsize,
}

impl RelayerCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        source: Arc<dyn EventSource>,
        destination: Arc<dyn MintSubmitter>,
        signers: Vec<Arc<dyn ValidatorSigner>>,
        cursor_store: Arc<dyn CursorStore>,
    ) -> Self {
        let direction = format!("{}->{}", source.chain_name(), destination.chain_name());
        Self {
            direction,
            config,
            source,
            destination,
            signers,
            cursor_store,
            status: Arc::new(RwLock::new(StatusBoard::default())),
            shutdown: None,
            completed: Mutex::new(BoundedHashCache::new(COMPLETED_CACHE_SIZE, COMPLETED_CACHE_TTL)),
            broadcasts: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Report into a status board shared with other coordinators
    pub fn with_status(mut self, status: SharedStatus) -> Self {
        self.status = status;
        self
    }

    /// Stop submitting once `true` is sent on `shutdown`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn direction(&self) -> &str {
        &self.direction
    }

    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Poll until shutdown
    pub async fn run(&self) -> Result<()> {
        info!(
            direction = %self.direction,
            signers = self.signers.len(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Relayer coordinator started"
        );
        let mut shutdown = self.shutdown.clone();
        let mut poll_failures = 0u32;

        loop {
            if self.is_cancelled() {
                break;
            }

            match self.poll_once().await {
                Ok(summary) => {
                    poll_failures = 0;
                    if summary.range.is_some() {
                        debug!(direction = %self.direction, ?summary, "Poll complete");
                    }
                }
                Err(e) => {
                    poll_failures = poll_failures.saturating_add(1);
                    warn!(
                        direction = %self.direction,
                        error = %e,
                        consecutive = poll_failures,
                        "Poll failed, backing off"
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_delay(&self.config, poll_failures)) => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        info!(direction = %self.direction, "Relayer coordinator stopped");
        Ok(())
    }

    /// Scan one range of the source and relay every burn in it
    pub async fn poll_once(&self) -> Result<PollSummary> {
        let cursor = match self.cursor_store.load(&self.direction).await? {
            Some(position) => position,
            None => self.config.start_position.saturating_sub(1),
        };
        let mut summary = PollSummary {
            cursor,
            ..Default::default()
        };

        let head = self.source.head().await?;
        {
            let mut status = self.status.write().await;
            let entry = status.direction(&self.direction);
            entry.cursor = cursor;
            entry.source_head = head;
            entry.last_poll = Some(Utc::now());
        }
        if head <= cursor {
            return Ok(summary);
        }

        let from = cursor + 1;
        let to = head.min(cursor.saturating_add(self.config.max_block_range));
        summary.range = Some((from, to));
        let events = self.source.events(from, to).await?;
        debug!(direction = %self.direction, from, to, count = events.len(), "Fetched source events");

        for event in &events {
            // Everything before this position is terminal
            let done = event.position.saturating_sub(1);
            if done > summary.cursor {
                self.save_cursor(done).await?;
                summary.cursor = done;
            }

            match self.process_event(event).await {
                Some(RelayOutcome::Minted { .. }) => summary.minted += 1,
                Some(RelayOutcome::AlreadyRelayed) => summary.already_relayed += 1,
                Some(RelayOutcome::Failed(_)) => summary.failed += 1,
                Some(RelayOutcome::Cancelled) => {
                    summary.cancelled = true;
                    break;
                }
                Some(RelayOutcome::Unresolved { tx_hash }) => {
                    summary.unresolved = Some(tx_hash);
                    break;
                }
                None if matches!(event.body, EventBody::Malformed { .. }) => summary.malformed += 1,
                None => {}
            }
        }

        if !summary.cancelled && summary.unresolved.is_none() {
            self.save_cursor(to).await?;
            summary.cursor = to;
        }
        Ok(summary)
    }

    async fn save_cursor(&self, position: u64) -> Result<()> {
        self.cursor_store.save(&self.direction, position).await?;
        metrics::record_cursor(&self.direction, position);
        self.status.write().await.direction(&self.direction).cursor = position;
        Ok(())
    }

    /// Relay the event if it is a burn; `None` for anything skipped
    async fn process_event(&self, event: &ObservedEvent) -> Option<RelayOutcome> {
        match &event.body {
            EventBody::Malformed { reason } => {
                let error = RelayError::UnknownEventShape(reason.clone());
                warn!(
                    direction = %self.direction,
                    position = event.position,
                    log_index = event.log_index,
                    error = %error,
                    "Skipping undecodable source event"
                );
                metrics::record_malformed_event(&self.direction);
                self.status
                    .write()
                    .await
                    .direction(&self.direction)
                    .malformed_skipped += 1;
                None
            }
            EventBody::Bridge(BridgeEvent::Transfer(record)) if record.step == Step::Burn => {
                metrics::record_event_observed(&self.direction);
                Some(self.relay(record, event.position).await)
            }
            EventBody::Bridge(other) => {
                debug!(
                    direction = %self.direction,
                    position = event.position,
                    event = other.name(),
                    "Ignoring non-burn event"
                );
                None
            }
        }
    }

    /// Drive one burn to a terminal outcome
    pub async fn relay(&self, record: &TransferRecord, position: u64) -> RelayOutcome {
        let started = Instant::now();
        let digest = MintCall::attestation(record, self.destination.bridge_address()).digest();

        info!(
            direction = %self.direction,
            state = %RelayState::Observed,
            position,
            from = %record.from,
            to = %record.to,
            amount = %record.amount,
            nonce = %record.nonce,
            "Burn observed"
        );

        if self.completed_contains(&digest) {
            debug!(direction = %self.direction, nonce = %record.nonce, "Relay already completed, skipping");
            return RelayOutcome::AlreadyRelayed;
        }

        // The destination would reject this anyway; don't bother the validators
        if let Err(e) = check_user_intent(record) {
            return self.fail(record, position, e.into()).await;
        }

        self.set_in_flight(1).await;
        let result = self.drive(record, &digest).await;
        self.set_in_flight(-1).await;

        match result {
            Ok(RetryOutcome::Done(receipt)) => {
                self.mark_completed(digest);
                metrics::record_relay_confirmed(&self.direction, "minted", started.elapsed().as_secs_f64());
                self.status.write().await.direction(&self.direction).minted += 1;
                info!(
                    direction = %self.direction,
                    state = %RelayState::Confirmed,
                    nonce = %record.nonce,
                    tx_hash = %receipt.tx_hash,
                    dest_position = receipt.position,
                    "Mint confirmed"
                );
                RelayOutcome::Minted {
                    tx_hash: receipt.tx_hash,
                    position: receipt.position,
                }
            }
            Ok(RetryOutcome::AlreadyProcessed(e)) => {
                self.mark_completed(digest);
                metrics::record_relay_confirmed(
                    &self.direction,
                    "already_relayed",
                    started.elapsed().as_secs_f64(),
                );
                self.status.write().await.direction(&self.direction).already_relayed += 1;
                info!(
                    direction = %self.direction,
                    state = %RelayState::Confirmed,
                    nonce = %record.nonce,
                    reason = %e,
                    "Mint already relayed"
                );
                RelayOutcome::AlreadyRelayed
            }
            Err(RelayError::Cancelled) => {
                info!(direction = %self.direction, nonce = %record.nonce, "Relay cancelled before submission");
                RelayOutcome::Cancelled
            }
            Err(RelayError::ConfirmationPending(tx_hash)) => {
                warn!(
                    direction = %self.direction,
                    state = %RelayState::Submitted,
                    position,
                    nonce = %record.nonce,
                    %tx_hash,
                    "Mint still unresolved, holding cursor"
                );
                self.status.write().await.direction(&self.direction).unresolved += 1;
                RelayOutcome::Unresolved { tx_hash }
            }
            Err(e) => self.fail(record, position, e).await,
        }
    }

    /// Broadcast once, then wait on that broadcast until it resolves
    ///
    /// A new broadcast is only made after the destination reports the
    /// previous one dropped. If the wait runs out of retries while the mint
    /// is still pending the handle is kept and `ConfirmationPending` returned.
    async fn drive(&self, record: &TransferRecord, digest: &B256) -> Result<RetryOutcome<TxReceipt>, RelayError> {
        let mut drops = 0u32;
        loop {
            let handle = match self.broadcast_for(digest) {
                Some(handle) => {
                    debug!(direction = %self.direction, tx_hash = %handle.tx_hash, "Awaiting earlier broadcast");
                    handle
                }
                None => {
                    let submitted = with_retry(&self.config.retry, |attempt| {
                        self.submit_attempt(record, digest, attempt)
                    })
                    .await?;
                    match submitted {
                        RetryOutcome::Done(handle) => {
                            self.remember_broadcast(*digest, handle);
                            handle
                        }
                        RetryOutcome::AlreadyProcessed(e) => return Ok(RetryOutcome::AlreadyProcessed(e)),
                    }
                }
            };

            let confirmed = with_retry(&self.config.retry, |attempt| {
                self.confirm_attempt(record, &handle, attempt)
            })
            .await;
            match confirmed {
                Ok(RetryOutcome::Done(Some(receipt))) => {
                    self.forget_broadcast(digest);
                    return Ok(RetryOutcome::Done(receipt));
                }
                Ok(RetryOutcome::Done(None)) => {
                    self.forget_broadcast(digest);
                    drops += 1;
                    if drops > self.config.retry.max_retries {
                        return Err(RelayError::TransientSubmissionFailure(format!(
                            "mint dropped {} times on {}",
                            drops,
                            self.destination.chain_name()
                        )));
                    }
                    warn!(
                        direction = %self.direction,
                        nonce = %record.nonce,
                        tx_hash = %handle.tx_hash,
                        drops,
                        "Mint dropped by destination, resubmitting"
                    );
                }
                Ok(RetryOutcome::AlreadyProcessed(e)) => {
                    self.forget_broadcast(digest);
                    return Ok(RetryOutcome::AlreadyProcessed(e));
                }
                Err(e) if e.class() == ErrorClass::Permanent => {
                    self.forget_broadcast(digest);
                    return Err(e);
                }
                Err(e) => {
                    debug!(direction = %self.direction, tx_hash = %handle.tx_hash, error = %e, "Confirmation wait exhausted");
                    return Err(RelayError::ConfirmationPending(handle.tx_hash));
                }
            }
        }
    }

    /// Attest and broadcast. Cancellation is honoured here only, while
    /// nothing is in flight on the destination.
    async fn submit_attempt(&self, record: &TransferRecord, digest: &B256, attempt: u32) -> Result<TxHandle, RelayError> {
        let policy = self.destination.policy().await?;

        info!(
            direction = %self.direction,
            state = %RelayState::AttestationCollecting,
            nonce = %record.nonce,
            attempt,
            required = policy.required(),
            "Collecting validator signatures"
        );
        let signatures = self.collect_signatures(digest, &policy).await?;

        if self.is_cancelled() {
            return Err(RelayError::Cancelled);
        }

        let call = MintCall::from_record(record, signatures);
        let handle = self.destination.submit(&call).await?;
        info!(
            direction = %self.direction,
            state = %RelayState::Submitted,
            nonce = %record.nonce,
            tx_hash = %handle.tx_hash,
            fee_recipient = %self.destination.relayer_address(),
            attempt,
            "Mint submitted"
        );
        Ok(handle)
    }

    /// One wait on a broadcast mint; `None` when the destination dropped it
    async fn confirm_attempt(
        &self,
        record: &TransferRecord,
        handle: &TxHandle,
        attempt: u32,
    ) -> Result<Option<TxReceipt>, RelayError> {
        let status = self
            .destination
            .await_confirmation(handle, self.config.confirmation_timeout)
            .await?;
        match status {
            TxStatus::Mined(receipt) if receipt.success => Ok(Some(receipt)),
            TxStatus::Mined(receipt) => Err(revert_error(record, &receipt)),
            TxStatus::Pending => {
                debug!(direction = %self.direction, tx_hash = %handle.tx_hash, attempt, "Mint pending");
                Err(RelayError::ConfirmationPending(handle.tx_hash))
            }
            TxStatus::Dropped => Ok(None),
        }
    }

    /// Ask every validator in parallel; keep distinct owner signatures that recover correctly
    async fn collect_signatures(&self, digest: &B256, policy: &SignaturePolicy) -> Result<SignatureSet, RelayError> {
        let timeout = self.config.signature_timeout;
        let requests = self.signers.iter().map(|signer| {
            let signer = Arc::clone(signer);
            let digest = *digest;
            async move {
                let address = signer.address();
                (address, tokio::time::timeout(timeout, signer.sign_digest(digest)).await)
            }
        });

        let mut set = SignatureSet::new();
        let mut seen: HashSet<Address> = HashSet::new();
        for (validator, result) in join_all(requests).await {
            let signature = match result {
                Ok(Ok(signature)) => signature,
                Ok(Err(e)) => {
                    warn!(direction = %self.direction, %validator, error = %e, "Validator failed to sign");
                    continue;
                }
                Err(_) => {
                    warn!(direction = %self.direction, %validator, ?timeout, "Validator signing timed out");
                    continue;
                }
            };

            match recover_signer(digest, &signature) {
                Ok(signer) if signer != validator => {
                    warn!(direction = %self.direction, %validator, recovered = %signer, "Signature recovers to another address");
                }
                Ok(signer) if !policy.is_owner(&signer) => {
                    warn!(direction = %self.direction, %validator, "Validator is not a destination owner");
                }
                Ok(signer) if !seen.insert(signer) => {
                    debug!(direction = %self.direction, %validator, "Duplicate validator signature dropped");
                }
                Ok(signer) => set.push(signer, signature),
                Err(fault) => {
                    warn!(direction = %self.direction, %validator, error = %fault, "Unusable validator signature");
                }
            }
        }

        metrics::record_signatures(&self.direction, set.len());
        if set.len() < policy.required() {
            return Err(RelayError::AttestationIncomplete {
                got: set.len(),
                required: policy.required(),
            });
        }
        Ok(set)
    }

    async fn fail(&self, record: &TransferRecord, position: u64, error: RelayError) -> RelayOutcome {
        error!(
            direction = %self.direction,
            state = %RelayState::Failed,
            position,
            nonce = %record.nonce,
            error = %error,
            "Relay failed, needs operator attention"
        );
        metrics::record_relay_failed(&self.direction, error.kind());

        let failure = FailedRelay {
            direction: self.direction.clone(),
            position,
            from: record.from,
            to: record.to,
            amount: record.amount,
            nonce: record.nonce,
            error: error.to_string(),
            failed_at: Utc::now(),
        };
        if let Err(e) = self.cursor_store.record_failure(&failure).await {
            error!(direction = %self.direction, error = %e, "Failed to persist relay failure");
        }
        {
            let mut status = self.status.write().await;
            status.direction(&self.direction).failed += 1;
            status.push_failure(&failure);
        }
        RelayOutcome::Failed(error)
    }

    fn completed_contains(&self, digest: &B256) -> bool {
        self.completed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(digest)
    }

    fn broadcast_for(&self, digest: &B256) -> Option<TxHandle> {
        self.broadcasts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(digest)
            .copied()
    }

    fn remember_broadcast(&self, digest: B256, handle: TxHandle) {
        self.broadcasts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(digest, handle);
    }

    fn forget_broadcast(&self, digest: &B256) {
        self.broadcasts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(digest);
    }

    fn mark_completed(&self, digest: B256) {
        self.completed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(digest);
    }

    async fn set_in_flight(&self, delta: isize) {
        let count = if delta >= 0 {
            self.in_flight.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1
        };
        metrics::set_in_flight(&self.direction, count);
        self.status.write().await.direction(&self.direction).in_flight = count;
    }
}

/// The burn record must carry the holder's own intent signature
fn check_user_intent(record: &TransferRecord) -> Result<(), BridgeError> {
    let digest = AttestationMessage::UserIntent {
        from: record.from,
        to: record.to,
        amount: record.amount,
        nonce: record.nonce,
    }
    .digest();
    let recovered = recover_signer(&digest, &record.signature).ok();
    if recovered != Some(record.from) {
        return Err(BridgeError::InvalidUserSignature {
            expected: record.from,
            recovered,
        });
    }
    Ok(())
}

/// Map a mined-but-reverted mint to the relay taxonomy
fn revert_error(record: &TransferRecord, receipt: &TxReceipt) -> RelayError {
    let reason = receipt
        .revert_reason
        .clone()
        .unwrap_or_else(|| format!("mint {} reverted", receipt.tx_hash));
    match classify_error(&reason) {
        ErrorClass::AlreadyProcessed => RelayError::Rejected(BridgeError::ReplayedNonce {
            channel: Channel::Mint,
            nonce: record.nonce,
        }),
        _ => RelayError::Reverted(reason),
    }
}

/// Sleep before the next poll: the interval, or backoff after repeated failures
fn poll_delay(config: &CoordinatorConfig, consecutive_failures: u32) -> Duration {
    match consecutive_failures {
        0 => config.poll_interval,
        n => config
            .retry
            .backoff_for_attempt(n - 1)
            .max(config.poll_interval),
    }
}

async fn wait_for_shutdown(shutdown: &mut Option<watch::Receiver<bool>>) {
    match shutdown {
        Some(rx) => {
            if rx.wait_for(|stop| *stop).await.is_err() {
                // Sender gone without a shutdown request
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use bridge_core::testing::{dev_address, ether, user_signature, USER_KEY};

    fn burn_record(signature_key: usize) -> TransferRecord {
        let to = dev_address(USER_KEY);
        TransferRecord {
            from: dev_address(USER_KEY),
            to,
            amount: ether(1),
            date: 0,
            nonce: U256::from(1u64),
            signature: user_signature(signature_key, to, ether(1), U256::from(1u64)),
            step: Step::Burn,
        }
    }

    #[test]
    fn test_user_intent_check() {
        assert!(check_user_intent(&burn_record(USER_KEY)).is_ok());
        assert!(matches!(
            check_user_intent(&burn_record(0)),
            Err(BridgeError::InvalidUserSignature { .. })
        ));
    }

    fn reverted(reason: Option<&str>) -> TxReceipt {
        TxReceipt {
            tx_hash: B256::repeat_byte(9),
            position: 10,
            success: false,
            revert_reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_revert_reason_mapping() {
        let record = burn_record(USER_KEY);

        let replay = revert_error(&record, &reverted(Some("execution reverted: Nonce already used")));
        assert_eq!(replay.class(), ErrorClass::AlreadyProcessed);

        let unfunded = revert_error(&record, &reverted(Some("execution reverted: Insufficient ETH balance")));
        assert!(matches!(unfunded, RelayError::Reverted(ref m) if m.contains("Insufficient ETH balance")));
        assert_eq!(unfunded.class(), ErrorClass::Permanent);

        // No reason recovered; still not retried
        assert_eq!(revert_error(&record, &reverted(None)).class(), ErrorClass::Permanent);
    }

    #[test]
    fn test_poll_delay_backs_off_on_failures() {
        let config = CoordinatorConfig {
            poll_interval: Duration::from_secs(1),
            retry: RetryConfig {
                max_retries: 5,
                initial_backoff: Duration::from_secs(2),
                max_backoff: Duration::from_secs(30),
                backoff_multiplier: 2.0,
            },
            ..Default::default()
        };

        assert_eq!(poll_delay(&config, 0), Duration::from_secs(1));
        assert_eq!(poll_delay(&config, 1), Duration::from_secs(2));
        assert_eq!(poll_delay(&config, 3), Duration::from_secs(8));
        assert_eq!(poll_delay(&config, 20), Duration::from_secs(30));
    }

    #[test]
    fn test_relay_state_labels() {
        assert_eq!(RelayState::AttestationCollecting.to_string(), "attestation_collecting");
        assert_eq!(RelayState::Failed.as_str(), "failed");
    }
}
