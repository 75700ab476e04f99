//! Relay configuration
//!
//! Loaded once at startup from the environment (a `.env` file is honored)
//! and passed down explicitly. Nothing else in the crate reads env vars.

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use eyre::{eyre, Result, WrapErr};

use crate::address::is_evm_address;
use crate::chain::ChainSettings;
use crate::redact::Redacted;
use crate::retry::RetryConfig;
use crate::signer::{Credential, SignerSettings, DEFAULT_ACCOUNT_PREFIX, DEFAULT_DERIVATION_PATH};

/// Main configuration for the relay
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cosmos: CosmosConfig,
    pub evm: EvmConfig,
    pub bridge: BridgeConfig,
    pub retry: RetryConfig,
}

/// HTTP listener and limiter
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Seconds to replenish one request of quota per peer
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    /// Timeout for outbound HTTP calls to chain endpoints
    pub http_timeout_secs: u64,
    pub skip_preflight: bool,
}

/// Hub chain (Cosmos side)
#[derive(Debug, Clone)]
pub struct CosmosConfig {
    /// gRPC-gateway REST endpoint used for signing and broadcast
    pub rest_url: String,
    /// Tendermint RPC endpoint used by preflight checks
    pub rpc_url: String,
    pub chain_id: String,
    /// Service credential used by `/bridge`
    pub mnemonic: Credential,
    pub account_prefix: String,
    pub derivation_path: String,
    pub fee_amount: u128,
    pub fee_denom: String,
    pub gas_adjustment: f64,
    pub gas_limit: Option<u64>,
}

/// EVM side of the hub chain
#[derive(Debug, Clone)]
pub struct EvmConfig {
    pub rpc_url: String,
    /// Additional RPC URLs for fallback (tried in order when primary fails)
    pub rpc_fallback_urls: Vec<String>,
    pub chain_id: u64,
}

impl EvmConfig {
    /// All RPC URLs: primary followed by fallbacks.
    pub fn all_rpc_urls(&self) -> Vec<String> {
        let mut urls = vec![self.rpc_url.clone()];
        urls.extend(self.rpc_fallback_urls.iter().cloned());
        urls
    }
}

/// Bridge route parameters
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// ERC20 contract converted by `/bridge`
    pub token_contract: String,
    pub source_port: String,
    pub source_channel: String,
    /// Prefix produced by `/convert-address`
    pub destination_prefix: String,
    pub timeout_revision_number: u64,
    pub timeout_revision_height: u64,
    /// Relative timestamp timeout; 0 disables it
    pub timeout_seconds: u64,
}

/// Default functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_rate_limit_per_second() -> u64 {
    1
}

fn default_rate_limit_burst() -> u32 {
    10
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_fee_amount() -> u128 {
    2000
}

fn default_fee_denom() -> String {
    "ukava".to_string()
}

fn default_gas_adjustment() -> f64 {
    1.4
}

fn default_source_port() -> String {
    "transfer".to_string()
}

fn default_destination_prefix() -> String {
    "sei".to_string()
}

fn default_timeout_seconds() -> u64 {
    600
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    0
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| eyre!("{} environment variable is required", name))
}

fn optional<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated RPC URL string into individual trimmed URLs.
pub fn parse_rpc_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
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
        let server = ServerConfig {
            bind_address: optional("BIND_ADDRESS", default_bind_address()),
            port: optional("PORT", default_port()),
            rate_limit_per_second: optional(
                "RATE_LIMIT_PER_SECOND",
                default_rate_limit_per_second(),
            ),
            rate_limit_burst: optional("RATE_LIMIT_BURST", default_rate_limit_burst()),
            http_timeout_secs: optional("HTTP_TIMEOUT_SECS", default_http_timeout_secs()),
            skip_preflight: optional("SKIP_PREFLIGHT", false),
        };

        let cosmos = CosmosConfig {
            rest_url: required("COSMOS_REST_URL")?,
            rpc_url: required("COSMOS_RPC_URL")?,
            chain_id: required("COSMOS_CHAIN_ID")?,
            mnemonic: Redacted(required("COSMOS_MNEMONIC")?),
            account_prefix: optional("COSMOS_ACCOUNT_PREFIX", DEFAULT_ACCOUNT_PREFIX.to_string()),
            derivation_path: optional(
                "COSMOS_DERIVATION_PATH",
                DEFAULT_DERIVATION_PATH.to_string(),
            ),
            fee_amount: optional("FEE_AMOUNT", default_fee_amount()),
            fee_denom: optional("FEE_DENOM", default_fee_denom()),
            gas_adjustment: optional("GAS_ADJUSTMENT", default_gas_adjustment()),
            gas_limit: env::var("GAS_LIMIT").ok().and_then(|v| v.trim().parse().ok()),
        };

        let evm_rpc_urls = parse_rpc_urls(&required("EVM_RPC_URL")?);
        if evm_rpc_urls.is_empty() {
            return Err(eyre!("EVM_RPC_URL cannot be empty"));
        }

        let evm = EvmConfig {
            rpc_url: evm_rpc_urls[0].clone(),
            rpc_fallback_urls: evm_rpc_urls[1..].to_vec(),
            chain_id: required("EVM_CHAIN_ID")?
                .trim()
                .parse()
                .wrap_err("EVM_CHAIN_ID must be a valid u64")?,
        };

        let bridge = BridgeConfig {
            token_contract: required("TOKEN_CONTRACT_ADDRESS")?,
            source_port: optional("IBC_SOURCE_PORT", default_source_port()),
            source_channel: required("IBC_SOURCE_CHANNEL")?,
            destination_prefix: optional(
                "DESTINATION_ACCOUNT_PREFIX",
                default_destination_prefix(),
            ),
            timeout_revision_number: optional("IBC_TIMEOUT_REVISION_NUMBER", 0),
            timeout_revision_height: optional("IBC_TIMEOUT_REVISION_HEIGHT", 0),
            timeout_seconds: optional("IBC_TIMEOUT_SECONDS", default_timeout_seconds()),
        };

        let retry = RetryConfig::new(
            optional("RETRY_ATTEMPTS", default_retry_attempts()),
            Duration::from_millis(optional("RETRY_BACKOFF_MS", default_retry_backoff_ms())),
        );

        let config = Config {
            server,
            cosmos,
            evm,
            bridge,
            retry,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cosmos.rest_url.is_empty() {
            return Err(eyre!("cosmos.rest_url cannot be empty"));
        }

        if self.cosmos.rpc_url.is_empty() {
            return Err(eyre!("cosmos.rpc_url cannot be empty"));
        }

        if self.cosmos.chain_id.is_empty() {
            return Err(eyre!("cosmos.chain_id cannot be empty"));
        }

        let mnemonic_words = self.cosmos.mnemonic.expose().split_whitespace().count();
        if mnemonic_words < 12 {
            return Err(eyre!("cosmos.mnemonic must have at least 12 words"));
        }

        if self.cosmos.account_prefix.is_empty() {
            return Err(eyre!("cosmos.account_prefix cannot be empty"));
        }

        if self.cosmos.fee_denom.is_empty() {
            return Err(eyre!("cosmos.fee_denom cannot be empty"));
        }

        if !self.cosmos.gas_adjustment.is_finite() || self.cosmos.gas_adjustment < 1.0 {
            return Err(eyre!("cosmos.gas_adjustment must be a finite value of at least 1.0"));
        }

        if self.evm.rpc_url.is_empty() {
            return Err(eyre!("evm.rpc_url cannot be empty"));
        }

        if !is_evm_address(&self.bridge.token_contract) || !self.bridge.token_contract.starts_with("0x")
        {
            return Err(eyre!(
                "bridge.token_contract must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        if self.bridge.source_port.is_empty() || self.bridge.source_channel.is_empty() {
            return Err(eyre!("bridge.source_port and bridge.source_channel cannot be empty"));
        }

        if self.bridge.destination_prefix.is_empty() {
            return Err(eyre!("bridge.destination_prefix cannot be empty"));
        }

        if self.server.rate_limit_per_second == 0 || self.server.rate_limit_burst == 0 {
            return Err(eyre!("rate limit period and burst must be greater than 0"));
        }

        Ok(())
    }

    /// Settings handed to every chain client
    pub fn chain_settings(&self) -> ChainSettings {
        ChainSettings {
            rest_url: self.cosmos.rest_url.clone(),
            chain_id: self.cosmos.chain_id.clone(),
            fee_denom: self.cosmos.fee_denom.clone(),
            fee_amount: self.cosmos.fee_amount,
            gas_adjustment: self.cosmos.gas_adjustment,
            gas_limit: self.cosmos.gas_limit,
            request_timeout: Duration::from_secs(self.server.http_timeout_secs),
            retry: self.retry.clone(),
        }
    }

    pub fn signer_settings(&self) -> SignerSettings {
        SignerSettings {
            account_prefix: self.cosmos.account_prefix.clone(),
            derivation_path: self.cosmos.derivation_path.clone(),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.server.http_timeout_secs)
    }
}
