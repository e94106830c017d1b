//! Wires both relay directions from configuration and runs them together

use eyre::{eyre, Result, WrapErr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{error, info};

use crate::chains::EvmChain;
use crate::config::Config;
use crate::coordinator::RelayerCoordinator;
use crate::cursor::{CursorStore, MemoryCursorStore};
use crate::db;
use crate::signers::{LocalSigner, RemoteSigner, ValidatorSigner};
use crate::status::{SharedStatus, StatusBoard};

/// Owns one coordinator per direction
pub struct RelayManager {
    coordinators: Vec<RelayerCoordinator>,
    status: SharedStatus,
}

impl RelayManager {
    /// Build A→B and B→A coordinators over the configured EVM chains
    pub async fn new(config: &Config, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let chain_a = Arc::new(EvmChain::new(&config.chain_a, &config.relayer_private_key)?);
        let chain_b = Arc::new(EvmChain::new(&config.chain_b, &config.relayer_private_key)?);

        let signers = build_signers(config)?;
        let cursor_store = build_cursor_store(config).await?;

        let status: SharedStatus = Arc::new(RwLock::new(StatusBoard::default()));
        let coordinators = vec![
            RelayerCoordinator::new(
                config.relay.coordinator(config.chain_a.start_block),
                chain_a.clone(),
                chain_b.clone(),
                signers.clone(),
                Arc::clone(&cursor_store),
            ),
            RelayerCoordinator::new(
                config.relay.coordinator(config.chain_b.start_block),
                chain_b,
                chain_a,
                signers,
                cursor_store,
            ),
        ]
        .into_iter()
        .map(|c| c.with_status(Arc::clone(&status)).with_shutdown(shutdown.clone()))
        .collect::<Vec<_>>();

        info!(
            directions = ?coordinators.iter().map(|c| c.direction().to_string()).collect::<Vec<_>>(),
            "Relay manager created"
        );
        Ok(Self { coordinators, status })
    }

    pub fn from_coordinators(coordinators: Vec<RelayerCoordinator>, status: SharedStatus) -> Self {
        Self { coordinators, status }
    }

    pub fn status(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    /// Run all coordinators concurrently until they stop
    /// Returns the first coordinator error, if any
    pub async fn run(self) -> Result<()> {
        let mut join_set = tokio::task::JoinSet::new();
        for coordinator in self.coordinators {
            join_set.spawn(async move { coordinator.run().await });
        }

        let mut result = Ok(());
        while let Some(done) = join_set.join_next().await {
            match done {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = ?e, "A coordinator stopped with error");
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
                Err(e) => {
                    error!(error = ?e, "A coordinator task panicked");
                    if result.is_ok() {
                        result = Err(eyre!("coordinator task panicked: {}", e));
                    }
                }
            }
        }
        result
    }
}

fn build_signers(config: &Config) -> Result<Vec<Arc<dyn ValidatorSigner>>> {
    let timeout = Duration::from_millis(config.relay.signature_timeout_ms);
    let mut signers: Vec<Arc<dyn ValidatorSigner>> = Vec::new();

    for key in &config.validators.local_keys {
        signers.push(Arc::new(LocalSigner::from_private_key(key)?));
    }
    for remote in &config.validators.remote {
        signers.push(Arc::new(RemoteSigner::new(remote.address, remote.url.clone(), timeout)?));
    }

    info!(
        local = config.validators.local_keys.len(),
        remote = config.validators.remote.len(),
        required = config.required_signatures,
        "Validator signers configured"
    );
    Ok(signers)
}

async fn build_cursor_store(config: &Config) -> Result<Arc<dyn CursorStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            db::run_migrations(&pool)
                .await
                .wrap_err("Relay cursor schema is not up to date")?;
            info!("Relay cursors persisted in Postgres");
            Ok(Arc::new(db::PgCursorStore::new(pool)))
        }
        None => {
            info!("DATABASE_URL not set, relay cursors kept in memory");
            Ok(Arc::new(MemoryCursorStore::new()))
        }
    }
}
