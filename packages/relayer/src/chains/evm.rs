//! EVM chain client for the bridge contract
//!
//! Reads `Transfer`/`EthDeposited`/`EthSent` logs as the event source and
//! submits `mint` transactions as the destination. Before broadcasting, the
//! mint is simulated with `eth_call` so contract rejections (most importantly
//! `"Nonce already used"`) are classified without spending gas.
//!
//! A mined mint that reverted is replayed with `eth_call` against the latest
//! state to recover its revert reason, which receipts do not carry.
//!
//! # Transaction Building
//!
//! Uses Alloy's `ProviderBuilder::with_recommended_fillers()` to populate
//! nonce, gas limit and fees for the relayer wallet.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolEvent;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use bridge_core::{BridgeError, BridgeEvent, Channel, SignaturePolicy, Step, TransferRecord};
use eyre::{Result, WrapErr};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::error::{classify_error, ErrorClass, RelayError};
use crate::source::{EventBody, EventSource, ObservedEvent};
use crate::submit::{MintCall, MintSubmitter, TxHandle, TxReceipt, TxStatus};

/// Upper bound when enumerating `owners(i)`
const MAX_OWNERS: u64 = 64;
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

sol! {
    /// Mirror bridge contract interface
    #[sol(rpc)]
    contract MirrorBridge {
        event Transfer(
            address from,
            address to,
            uint256 amount,
            uint256 date,
            uint256 nonce,
            bytes signature,
            uint8 step
        );
        event EthDeposited(address from, uint256 amount);
        event EthSent(address caller, address to, uint256 amount);

        function depositEth() external payable;
        function transferEth(address to, uint256 amount, uint256 nonce, bytes[] signatures) external;
        function burn(address to, uint256 amount, uint256 nonce, bytes signature) external;
        function mint(
            address from,
            address to,
            uint256 amount,
            uint256 nonce,
            bytes signature,
            bytes[] ownerSignatures
        ) external;

        function owners(uint256 index) external view returns (address);
        function requiredSignatures() external view returns (uint256);
    }
}

/// Decode one bridge log; `None` for logs of other events
pub fn decode_log(log: &Log) -> Option<ObservedEvent> {
    let topic0 = *log.topics().first()?;
    let log_index = log.log_index.unwrap_or_default();
    let Some(position) = log.block_number else {
        return Some(ObservedEvent {
            position: 0,
            log_index,
            body: EventBody::Malformed {
                reason: "log without block number".to_string(),
            },
        });
    };

    let body = if topic0 == MirrorBridge::Transfer::SIGNATURE_HASH {
        match log.log_decode::<MirrorBridge::Transfer>() {
            Ok(decoded) => {
                let event = decoded.inner.data;
                match Step::from_u8(event.step) {
                    Some(step) => EventBody::Bridge(BridgeEvent::Transfer(TransferRecord {
                        from: event.from,
                        to: event.to,
                        amount: event.amount,
                        date: event.date.saturating_to::<u64>(),
                        nonce: event.nonce,
                        signature: event.signature,
                        step,
                    })),
                    None => EventBody::Malformed {
                        reason: format!("unknown transfer step {}", event.step),
                    },
                }
            }
            Err(e) => EventBody::Malformed {
                reason: format!("undecodable Transfer log: {e}"),
            },
        }
    } else if topic0 == MirrorBridge::EthDeposited::SIGNATURE_HASH {
        match log.log_decode::<MirrorBridge::EthDeposited>() {
            Ok(decoded) => EventBody::Bridge(BridgeEvent::EthDeposited {
                from: decoded.inner.data.from,
                amount: decoded.inner.data.amount,
            }),
            Err(e) => EventBody::Malformed {
                reason: format!("undecodable EthDeposited log: {e}"),
            },
        }
    } else if topic0 == MirrorBridge::EthSent::SIGNATURE_HASH {
        match log.log_decode::<MirrorBridge::EthSent>() {
            Ok(decoded) => EventBody::Bridge(BridgeEvent::EthSent {
                caller: decoded.inner.data.caller,
                to: decoded.inner.data.to,
                amount: decoded.inner.data.amount,
            }),
            Err(e) => EventBody::Malformed {
                reason: format!("undecodable EthSent log: {e}"),
            },
        }
    } else {
        return None;
    };

    Some(ObservedEvent {
        position,
        log_index,
        body,
    })
}

/// Map a raw RPC/contract error to the relay taxonomy
fn rpc_error(context: &str, error: impl fmt::Display, nonce: Option<U256>) -> RelayError {
    let message = format!("{context}: {error}");
    match (classify_error(&message), nonce) {
        (ErrorClass::AlreadyProcessed, Some(nonce)) => RelayError::Rejected(BridgeError::ReplayedNonce {
            channel: Channel::Mint,
            nonce,
        }),
        (ErrorClass::Permanent, _) => RelayError::Reverted(message),
        _ => RelayError::TransientSubmissionFailure(message),
    }
}

pub struct EvmChain {
    name: String,
    rpc_url: String,
    provider: RootProvider<Http<Client>>,
    bridge_address: Address,
    finality_blocks: u64,
    relayer: PrivateKeySigner,
    policy: OnceCell<SignaturePolicy>,
    /// Broadcast mints not yet observed mined or dropped
    submitted: Mutex<HashMap<B256, MintCall>>,
}

impl fmt::Debug for EvmChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmChain")
            .field("name", &self.name)
            .field("rpc_url", &self.rpc_url)
            .field("bridge_address", &self.bridge_address)
            .field("finality_blocks", &self.finality_blocks)
            .field("relayer", &self.relayer.address())
            .finish()
    }
}

impl EvmChain {
    pub fn new(config: &ChainConfig, relayer_private_key: &str) -> Result<Self> {
        let url = config.rpc_url.parse().wrap_err("Failed to parse RPC URL")?;
        let provider = ProviderBuilder::new().on_http(url);
        let bridge_address =
            Address::from_str(&config.bridge_address).wrap_err("Invalid bridge address")?;
        let relayer: PrivateKeySigner = relayer_private_key
            .trim()
            .parse()
            .wrap_err("Invalid relayer private key")?;

        info!(
            chain = %config.name,
            chain_id = config.chain_id,
            bridge = %bridge_address,
            relayer = %relayer.address(),
            "EVM chain client initialized"
        );

        Ok(Self {
            name: config.name.clone(),
            rpc_url: config.rpc_url.clone(),
            provider,
            bridge_address,
            finality_blocks: config.finality_blocks,
            relayer,
            policy: OnceCell::new(),
            submitted: Mutex::new(HashMap::new()),
        })
    }

    async fn load_policy(&self) -> Result<SignaturePolicy, RelayError> {
        let contract = MirrorBridge::new(self.bridge_address, &self.provider);

        let required = contract
            .requiredSignatures()
            .call()
            .await
            .map_err(|e| rpc_error("requiredSignatures", e, None))?
            ._0
            .saturating_to::<usize>();

        // Public array getter reverts past the end
        let mut owners = Vec::new();
        for index in 0..MAX_OWNERS {
            match contract.owners(U256::from(index)).call().await {
                Ok(owner) => owners.push(owner._0),
                Err(e) if index > 0 && classify_error(&e.to_string()) != ErrorClass::Transient => break,
                Err(e) => return Err(rpc_error("owners", e, None)),
            }
        }

        debug!(chain = %self.name, owners = owners.len(), required, "Loaded destination owner set");
        SignaturePolicy::new(owners, required).map_err(RelayError::Rejected)
    }

    fn take_submitted(&self, tx_hash: &B256) -> Option<MintCall> {
        self.submitted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(tx_hash)
    }

    /// Re-run a reverted mint as a call to read the contract's reason
    async fn revert_reason(&self, call: &MintCall) -> Option<String> {
        let contract = MirrorBridge::new(self.bridge_address, &self.provider);
        let replay = contract
            .mint(
                call.from,
                call.to,
                call.amount,
                call.nonce,
                call.user_signature.clone(),
                call.owner_signatures.signatures(),
            )
            .from(self.relayer.address())
            .call()
            .await;
        replay.err().map(|e| e.to_string())
    }
}

#[async_trait]
impl EventSource for EvmChain {
    fn chain_name(&self) -> &str {
        &self.name
    }

    async fn head(&self) -> Result<u64, RelayError> {
        let block = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| rpc_error("eth_blockNumber", e, None))?;
        Ok(block.saturating_sub(self.finality_blocks))
    }

    async fn events(&self, from: u64, to: u64) -> Result<Vec<ObservedEvent>, RelayError> {
        let filter = Filter::new()
            .address(self.bridge_address)
            .from_block(from)
            .to_block(to);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| rpc_error("eth_getLogs", e, None))?;

        let mut events: Vec<ObservedEvent> = logs.iter().filter_map(decode_log).collect();
        events.sort_by_key(|e| (e.position, e.log_index));
        Ok(events)
    }
}

#[async_trait]
impl MintSubmitter for EvmChain {
    fn chain_name(&self) -> &str {
        &self.name
    }

    fn bridge_address(&self) -> Address {
        self.bridge_address
    }

    fn relayer_address(&self) -> Address {
        self.relayer.address()
    }

    async fn policy(&self) -> Result<SignaturePolicy, RelayError> {
        self.policy
            .get_or_try_init(|| self.load_policy())
            .await
            .cloned()
    }

    async fn submit(&self, call: &MintCall) -> Result<TxHandle, RelayError> {
        let wallet = EthereumWallet::from(self.relayer.clone());
        let url = self
            .rpc_url
            .parse()
            .map_err(|e| RelayError::TransientSubmissionFailure(format!("invalid RPC URL: {e}")))?;
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(url);
        let contract = MirrorBridge::new(self.bridge_address, &provider);

        let mint = contract.mint(
            call.from,
            call.to,
            call.amount,
            call.nonce,
            call.user_signature.clone(),
            call.owner_signatures.signatures(),
        );

        // Simulate first; reverts surface here with their reason
        mint.call()
            .await
            .map_err(|e| rpc_error("mint simulation", e, Some(call.nonce)))?;

        let pending = mint
            .send()
            .await
            .map_err(|e| rpc_error("mint send", e, Some(call.nonce)))?;
        let tx_hash = *pending.tx_hash();
        self.submitted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(tx_hash, call.clone());

        info!(
            chain = %self.name,
            tx_hash = %tx_hash,
            nonce = %call.nonce,
            "Mint transaction sent"
        );
        Ok(TxHandle { tx_hash })
    }

    async fn await_confirmation(&self, handle: &TxHandle, timeout: Duration) -> Result<TxStatus, RelayError> {
        let started = Instant::now();
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(handle.tx_hash)
                .await
                .map_err(|e| rpc_error("eth_getTransactionReceipt", e, None))?;

            if let Some(receipt) = receipt {
                let success = receipt.status();
                let call = self.take_submitted(&handle.tx_hash);
                let revert_reason = match (success, call) {
                    (false, Some(call)) => self.revert_reason(&call).await,
                    _ => None,
                };
                if !success {
                    warn!(
                        chain = %self.name,
                        tx_hash = %handle.tx_hash,
                        reason = revert_reason.as_deref().unwrap_or("unknown"),
                        "Mint transaction reverted"
                    );
                }
                return Ok(TxStatus::Mined(TxReceipt {
                    tx_hash: handle.tx_hash,
                    position: receipt.block_number.unwrap_or_default(),
                    success,
                    revert_reason,
                }));
            }

            if started.elapsed() >= timeout {
                let known = self
                    .provider
                    .get_transaction_by_hash(handle.tx_hash)
                    .await
                    .map_err(|e| rpc_error("eth_getTransactionByHash", e, None))?;
                if known.is_some() {
                    debug!(chain = %self.name, tx_hash = %handle.tx_hash, ?timeout, "Mint still pending");
                    return Ok(TxStatus::Pending);
                }
                warn!(chain = %self.name, tx_hash = %handle.tx_hash, "Mint transaction dropped by the node");
                self.take_submitted(&handle.tx_hash);
                return Ok(TxStatus::Dropped);
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData};

    fn rpc_log(data: LogData, block: Option<u64>, index: u64) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0xaa),
                data,
            },
            block_number: block,
            log_index: Some(index),
            ..Default::default()
        }
    }

    fn burn_event(step: u8) -> MirrorBridge::Transfer {
        MirrorBridge::Transfer {
            from: Address::repeat_byte(1),
            to: Address::repeat_byte(2),
            amount: U256::from(50u64),
            date: U256::from(1_700_000_000u64),
            nonce: U256::from(3u64),
            signature: Bytes::from(vec![7u8; 65]),
            step,
        }
    }

    #[test]
    fn test_decode_burn_transfer() {
        let log = rpc_log(burn_event(0).encode_log_data(), Some(12), 4);
        let observed = decode_log(&log).unwrap();

        assert_eq!(observed.position, 12);
        assert_eq!(observed.log_index, 4);
        match observed.body {
            EventBody::Bridge(BridgeEvent::Transfer(record)) => {
                assert_eq!(record.step, Step::Burn);
                assert_eq!(record.amount, U256::from(50u64));
                assert_eq!(record.nonce, U256::from(3u64));
                assert_eq!(record.date, 1_700_000_000);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_unknown_step_is_malformed() {
        let log = rpc_log(burn_event(9).encode_log_data(), Some(1), 0);
        assert!(matches!(decode_log(&log).unwrap().body, EventBody::Malformed { .. }));
    }

    #[test]
    fn test_truncated_data_is_malformed() {
        let mut data = burn_event(0).encode_log_data();
        data = LogData::new_unchecked(data.topics().to_vec(), Bytes::from(vec![0u8; 10]));
        let log = rpc_log(data, Some(1), 0);
        assert!(matches!(decode_log(&log).unwrap().body, EventBody::Malformed { .. }));
    }

    #[test]
    fn test_foreign_event_ignored() {
        let data = LogData::new_unchecked(vec![B256::repeat_byte(0x55)], Bytes::new());
        assert!(decode_log(&rpc_log(data, Some(1), 0)).is_none());
    }

    #[test]
    fn test_deposit_event() {
        let event = MirrorBridge::EthDeposited {
            from: Address::repeat_byte(1),
            amount: U256::from(2u64),
        };
        let observed = decode_log(&rpc_log(event.encode_log_data(), Some(3), 1)).unwrap();
        assert_eq!(
            observed.body,
            EventBody::Bridge(BridgeEvent::EthDeposited {
                from: Address::repeat_byte(1),
                amount: U256::from(2u64),
            })
        );
    }

    #[test]
    fn test_rpc_error_mapping() {
        let replay = rpc_error("mint simulation", "execution reverted: Nonce already used", Some(U256::from(1u64)));
        assert!(matches!(replay, RelayError::Rejected(ref e) if e.is_replay()));

        let revert = rpc_error("mint simulation", "execution reverted: Insufficient signatures", Some(U256::from(1u64)));
        assert!(matches!(revert, RelayError::Reverted(_)));

        let down = rpc_error("eth_getLogs", "connection refused", None);
        assert!(matches!(down, RelayError::TransientSubmissionFailure(_)));
    }
}
