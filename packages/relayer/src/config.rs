use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;

use crate::coordinator::CoordinatorConfig;
use crate::retry::RetryConfig;

/// Main configuration for the relayer
#[derive(Clone)]
pub struct Config {
    pub chain_a: ChainConfig,
    pub chain_b: ChainConfig,
    /// Key that submits mint transactions on both sides
    pub relayer_private_key: String,
    pub validators: ValidatorConfig,
    pub required_signatures: usize,
    pub relay: RelayConfig,
    /// Postgres cursor persistence; in-memory when unset
    pub database_url: Option<String>,
    pub api_port: u16,
}

/// Custom Debug that redacts keys and the database URL (may contain credentials).
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("chain_a", &self.chain_a)
            .field("chain_b", &self.chain_b)
            .field("relayer_private_key", &"<redacted>")
            .field("validators", &self.validators)
            .field("required_signatures", &self.required_signatures)
            .field("relay", &self.relay)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("api_port", &self.api_port)
            .finish()
    }
}

/// One side of the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub bridge_address: String,
    /// First block scanned when no cursor is stored
    pub start_block: u64,
    pub finality_blocks: u64,
}

#[derive(Clone, Default)]
pub struct ValidatorConfig {
    pub local_keys: Vec<String>,
    pub remote: Vec<RemoteSignerConfig>,
}

/// Custom Debug that redacts local keys to prevent accidental log leakage.
impl fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("local_keys", &format!("<{} redacted>", self.local_keys.len()))
            .field("remote", &self.remote)
            .finish()
    }
}

impl ValidatorConfig {
    pub fn count(&self) -> usize {
        self.local_keys.len() + self.remote.len()
    }
}

/// Remote signing service, configured as `address@url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSignerConfig {
    pub address: Address,
    pub url: String,
}

impl FromStr for RemoteSignerConfig {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let (address, url) = s
            .trim()
            .split_once('@')
            .ok_or_else(|| eyre!("remote signer must be address@url, got {}", s))?;
        let address = Address::from_str(address.trim())
            .wrap_err_with(|| format!("Invalid remote signer address {}", address))?;
        let url = url.trim();
        if url.is_empty() {
            return Err(eyre!("remote signer {} has an empty URL", address));
        }
        Ok(Self {
            address,
            url: url.to_string(),
        })
    }
}

/// Polling, timeouts and retry budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub poll_interval_ms: u64,
    pub max_block_range: u64,
    pub signature_timeout_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_block_range: default_max_block_range(),
            signature_timeout_ms: 10_000,
            confirmation_timeout_ms: 120_000,
            retry_max_attempts: 5,
            retry_initial_backoff_ms: 2_000,
            retry_max_backoff_ms: 60_000,
        }
    }
}

impl RelayConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry_max_attempts,
            initial_backoff: Duration::from_millis(self.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry_max_backoff_ms),
            ..RetryConfig::default()
        }
    }

    /// Coordinator settings for a source starting at `start_block`
    pub fn coordinator(&self, start_block: u64) -> CoordinatorConfig {
        CoordinatorConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_block_range: self.max_block_range,
            signature_timeout: Duration::from_millis(self.signature_timeout_ms),
            confirmation_timeout: Duration::from_millis(self.confirmation_timeout_ms),
            retry: self.retry(),
            start_position: start_block,
        }
    }
}

/// Default functions
fn default_poll_interval() -> u64 {
    1000
}

fn default_max_block_range() -> u64 {
    1000
}

fn default_finality_blocks() -> u64 {
    1
}

fn default_api_port() -> u16 {
    9090
}

/// Variable lookup; the process environment outside tests
trait Lookup {
    fn get(&self, key: &str) -> Option<String>;

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| eyre!("{} environment variable is required", key))
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key).filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse()
                .wrap_err_with(|| format!("{} has an invalid value", key)),
            None => Ok(default),
        }
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Self::from_lookup(&vars)
    }

    fn from_lookup(vars: &impl Lookup) -> Result<Self> {
        let chain_a = Self::chain_from_lookup(vars, "CHAIN_A", "chain-a")?;
        let chain_b = Self::chain_from_lookup(vars, "CHAIN_B", "chain-b")?;

        let remote = vars
            .list("REMOTE_SIGNER_URLS")
            .iter()
            .map(|entry| entry.parse())
            .collect::<Result<Vec<RemoteSignerConfig>>>()?;

        let config = Self {
            chain_a,
            chain_b,
            relayer_private_key: vars.required("RELAYER_PRIVATE_KEY")?,
            validators: ValidatorConfig {
                local_keys: vars.list("VALIDATOR_PRIVATE_KEYS"),
                remote,
            },
            required_signatures: vars
                .required("REQUIRED_SIGNATURES")?
                .trim()
                .parse()
                .wrap_err("REQUIRED_SIGNATURES must be a valid usize")?,
            relay: RelayConfig {
                poll_interval_ms: vars.parsed("POLL_INTERVAL_MS", default_poll_interval())?,
                max_block_range: vars.parsed("MAX_BLOCK_RANGE", default_max_block_range())?,
                signature_timeout_ms: vars.parsed("SIGNATURE_TIMEOUT_MS", 10_000)?,
                confirmation_timeout_ms: vars.parsed("CONFIRMATION_TIMEOUT_MS", 120_000)?,
                retry_max_attempts: vars.parsed("RETRY_MAX_ATTEMPTS", 5)?,
                retry_initial_backoff_ms: vars.parsed("RETRY_INITIAL_BACKOFF_MS", 2_000)?,
                retry_max_backoff_ms: vars.parsed("RETRY_MAX_BACKOFF_MS", 60_000)?,
            },
            database_url: vars.get("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            api_port: vars.parsed("API_PORT", default_api_port())?,
        };

        config.validate()?;
        Ok(config)
    }

    fn chain_from_lookup(vars: &impl Lookup, prefix: &str, default_name: &str) -> Result<ChainConfig> {
        let key = |suffix: &str| format!("{}_{}", prefix, suffix);
        Ok(ChainConfig {
            name: vars
                .get(&key("NAME"))
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default_name.to_string()),
            rpc_url: vars.required(&key("RPC_URL"))?,
            chain_id: vars
                .required(&key("CHAIN_ID"))?
                .trim()
                .parse()
                .wrap_err_with(|| format!("{} must be a valid u64", key("CHAIN_ID")))?,
            bridge_address: vars.required(&key("BRIDGE_ADDRESS"))?,
            start_block: vars.parsed(&key("START_BLOCK"), 0)?,
            finality_blocks: vars.parsed(&key("FINALITY_BLOCKS"), default_finality_blocks())?,
        })
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.required_signatures == 0 {
            return Err(eyre!("REQUIRED_SIGNATURES must be at least 1"));
        }
        if self.validators.count() < self.required_signatures {
            return Err(eyre!(
                "{} validator signers configured but REQUIRED_SIGNATURES is {}",
                self.validators.count(),
                self.required_signatures
            ));
        }
        for chain in [&self.chain_a, &self.chain_b] {
            Address::from_str(&chain.bridge_address)
                .wrap_err_with(|| format!("Invalid bridge address for {}", chain.name))?;
        }
        if self.chain_a.name == self.chain_b.name {
            return Err(eyre!("both chains are named {}", self.chain_a.name));
        }
        if self.chain_a.rpc_url == self.chain_b.rpc_url
            && self.chain_a.bridge_address.eq_ignore_ascii_case(&self.chain_b.bridge_address)
        {
            return Err(eyre!("CHAIN_A and CHAIN_B point at the same bridge instance"));
        }
        if self.relay.max_block_range == 0 {
            return Err(eyre!("MAX_BLOCK_RANGE must be at least 1"));
        }
        Ok(())
    }
}
