//! Hub chain client: signing, gas simulation and broadcast
//!
//! Talks to the chain's gRPC-gateway REST surface:
//!
//! - `GET  /cosmos/auth/v1beta1/accounts/{address}` - account number and sequence
//! - `POST /cosmos/tx/v1beta1/simulate` - gas estimation
//! - `POST /cosmos/tx/v1beta1/txs` - broadcast (`BROADCAST_MODE_SYNC`)
//!
//! Account lookup and simulation are idempotent and go through
//! [`with_retry`]; the broadcast is attempted once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::messages::{TransactionBatch, TransactionResult};
use crate::retry::{with_retry, RetryConfig};
use crate::signer::{AccountInfo, CosmosSigner, FeeSpec};

/// Endpoint, fee and retry settings shared by every client handle
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub rest_url: String,
    pub chain_id: String,
    pub fee_denom: String,
    pub fee_amount: u128,
    /// Multiplier applied to simulated gas
    pub gas_adjustment: f64,
    /// Fixed gas limit; skips simulation when set
    pub gas_limit: Option<u64>,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl ChainSettings {
    /// Gas limit for a simulated usage, rounded up
    pub fn adjusted_gas(&self, gas_used: u64) -> u64 {
        ((gas_used as f64) * self.gas_adjustment).ceil() as u64
    }

    fn fee(&self, gas_limit: u64) -> FeeSpec {
        FeeSpec {
            denom: self.fee_denom.clone(),
            amount: self.fee_amount,
            gas_limit,
        }
    }
}

/// Signs and submits a batch as one transaction
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn sign_and_broadcast(
        &self,
        signer: &CosmosSigner,
        batch: &TransactionBatch,
    ) -> Result<TransactionResult, BridgeError>;
}

/// Produces a fresh client handle per call
pub trait ChainClientFactory: Send + Sync {
    fn connect(&self) -> Result<Box<dyn ChainClient>, BridgeError>;
}

// ============================================================================
// REST Implementation
// ============================================================================

pub struct RestClientFactory {
    settings: Arc<ChainSettings>,
}

impl RestClientFactory {
    pub fn new(settings: ChainSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }
}

impl ChainClientFactory for RestClientFactory {
    fn connect(&self) -> Result<Box<dyn ChainClient>, BridgeError> {
        Ok(Box::new(RestChainClient::new(self.settings.clone())?))
    }
}

pub struct RestChainClient {
    client: Client,
    base_url: String,
    settings: Arc<ChainSettings>,
}

impl RestChainClient {
    pub fn new(settings: Arc<ChainSettings>) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| BridgeError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.rest_url.trim_end_matches('/').to_string(),
            settings,
        })
    }

    /// Current account number and sequence
    pub async fn account_info(&self, address: &str) -> Result<AccountInfo, BridgeError> {
        let url = format!("{}/cosmos/auth/v1beta1/accounts/{}", self.base_url, address);
        let response = self.client.get(&url).send().await?;
        let data = read_json(response).await?;

        let account = data
            .get("account")
            .ok_or_else(|| BridgeError::Connection("Missing 'account' field in response".into()))?;

        Ok(AccountInfo {
            account_number: account_field(account, "account_number"),
            sequence: account_field(account, "sequence"),
        })
    }

    /// Gas used by a simulated execution of `tx_bytes`
    pub async fn simulate(&self, tx_bytes: &[u8]) -> Result<u64, BridgeError> {
        let url = format!("{}/cosmos/tx/v1beta1/simulate", self.base_url);
        let request = serde_json::json!({ "tx_bytes": encode_tx(tx_bytes) });

        let response = self.client.post(&url).json(&request).send().await?;
        let data = read_json(response).await?;

        data.get("gas_info")
            .and_then(|g| g.get("gas_used"))
            .and_then(as_u64)
            .ok_or_else(|| BridgeError::Connection(format!("Missing gas_info in simulation: {}", data)))
    }

    async fn broadcast(&self, tx_bytes: &[u8]) -> Result<TransactionResult, BridgeError> {
        let url = format!("{}/cosmos/tx/v1beta1/txs", self.base_url);
        let request = serde_json::json!({
            "tx_bytes": encode_tx(tx_bytes),
            "mode": "BROADCAST_MODE_SYNC"
        });

        info!(url = %url, "Broadcasting transaction");

        let response = self.client.post(&url).json(&request).send().await?;
        let body = read_json(response).await?;

        let tx_response = body.get("tx_response").ok_or_else(|| {
            BridgeError::Connection(format!("Missing tx_response in broadcast result: {}", body))
        })?;

        let code = tx_response.get("code").and_then(as_code).unwrap_or(0);
        if code != 0 {
            let raw_log = tx_response
                .get("raw_log")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            return Err(BridgeError::Broadcast {
                code,
                log: raw_log.to_string(),
            });
        }

        let txhash = tx_response
            .get("txhash")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if txhash.is_empty() {
            return Err(BridgeError::Connection(
                "Broadcast response carried no txhash".into(),
            ));
        }

        Ok(TransactionResult {
            transaction_hash: txhash.to_string(),
            height: tx_response
                .get("height")
                .and_then(as_u64)
                .filter(|h| *h > 0),
            gas_used: tx_response
                .get("gas_used")
                .and_then(as_u64)
                .filter(|g| *g > 0),
        })
    }
}

#[async_trait]
impl ChainClient for RestChainClient {
    async fn sign_and_broadcast(
        &self,
        signer: &CosmosSigner,
        batch: &TransactionBatch,
    ) -> Result<TransactionResult, BridgeError> {
        let settings = &self.settings;
        let address = signer.address_str();
        let address = address.as_str();

        let account = with_retry(&settings.retry, "account_query", move |_| {
            self.account_info(address)
        })
        .await?;

        let messages = batch.to_any_vec();

        let gas_limit = match settings.gas_limit {
            Some(limit) => limit,
            None => {
                let probe = signer.sign(
                    messages.clone(),
                    batch.memo(),
                    &settings.fee(0),
                    account,
                    &settings.chain_id,
                )?;
                let probe = probe.as_slice();
                let gas_used =
                    with_retry(&settings.retry, "simulate", move |_| self.simulate(probe)).await?;
                settings.adjusted_gas(gas_used)
            }
        };

        debug!(
            signer = %address,
            sequence = account.sequence,
            account_number = account.account_number,
            gas_limit,
            messages = %batch.describe(),
            "Signing transaction"
        );

        let tx_bytes = signer.sign(
            messages,
            batch.memo(),
            &settings.fee(gas_limit),
            account,
            &settings.chain_id,
        )?;

        self.broadcast(&tx_bytes).await
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn encode_tx(tx_bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(tx_bytes)
}

/// Parse a JSON body, classifying HTTP failures.
///
/// 5xx answers are connection problems (retryable). 4xx answers are the
/// chain refusing the request; the gRPC-gateway `code` is kept when present.
async fn read_json(response: Response) -> Result<Value, BridgeError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        return Err(BridgeError::Connection(format!("HTTP {}: {}", status, text)));
    }

    let parsed: Option<Value> = serde_json::from_str(&text).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("code"))
        .and_then(as_code)
        .unwrap_or_else(|| u32::from(status.as_u16()));
    let log = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or(text);

    Err(BridgeError::Broadcast { code, log })
}

/// Numbers arrive as JSON strings from the gateway; accept both forms
fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// ABCI codes are u32; larger values saturate
fn as_code(value: &Value) -> Option<u32> {
    as_u64(value).map(|c| u32::try_from(c).unwrap_or(u32::MAX))
}

/// Look up a numeric account field, descending into wrapped account types
/// (`base_account` for EthAccount, `base_vesting_account.base_account` for vesting).
fn account_field(account: &Value, field: &str) -> u64 {
    account
        .get(field)
        .or_else(|| account.get("base_account").and_then(|b| b.get(field)))
        .or_else(|| {
            account
                .get("base_vesting_account")
                .and_then(|v| v.get("base_account"))
                .and_then(|b| b.get(field))
        })
        .and_then(as_u64)
        .unwrap_or(0)
}
