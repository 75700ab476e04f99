//! Transaction Composer
//!
//! Turns validated requests into message batches and submits them:
//!
//! - `/bridge`: `[Convert, Transfer]` signed by the service credential. The
//!   service account converts, receives the coin and sends the IBC transfer.
//! - `/ibc-transfer`: `[Transfer]` signed by the credential in the request.
//!
//! Submissions for the same signing account are serialized through
//! [`CredentialLocks`].

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info};

use crate::address::{decode_bech32_address, encode_evm_address};
use crate::chain::ChainClientFactory;
use crate::config::Config;
use crate::error::BridgeError;
use crate::locks::CredentialLocks;
use crate::messages::{
    ChainMessage, ConvertMessage, TimeoutHeight, TokenAmount, TransactionBatch, TransactionResult,
    TransferMessage,
};
use crate::metrics;
use crate::signer::{Credential, CosmosSigner, SignerSettings};
use crate::types::{BridgeOrder, TransferOrder};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Route and credential settings for composed transactions
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// ERC20 contract converted by `/bridge`
    pub token_contract: String,
    pub source_port: String,
    /// Channel used by `/bridge`
    pub source_channel: String,
    pub timeout_height: TimeoutHeight,
    /// Relative timestamp timeout; 0 disables it
    pub timeout_seconds: u64,
    pub signer: SignerSettings,
    /// Service credential signing `/bridge` batches
    pub service_credential: Credential,
}

impl ComposerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            token_contract: config.bridge.token_contract.clone(),
            source_port: config.bridge.source_port.clone(),
            source_channel: config.bridge.source_channel.clone(),
            timeout_height: TimeoutHeight {
                revision_number: config.bridge.timeout_revision_number,
                revision_height: config.bridge.timeout_revision_height,
            },
            timeout_seconds: config.bridge.timeout_seconds,
            signer: config.signer_settings(),
            service_credential: config.cosmos.mnemonic.clone(),
        }
    }
}

pub struct TransactionComposer {
    config: ComposerConfig,
    factory: Arc<dyn ChainClientFactory>,
    locks: CredentialLocks,
}

impl TransactionComposer {
    pub fn new(config: ComposerConfig, factory: Arc<dyn ChainClientFactory>) -> Self {
        Self {
            config,
            factory,
            locks: CredentialLocks::default(),
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Convert then transfer, in that order, on behalf of `signer`.
    ///
    /// The signing account is the convert initiator (as 0x-hex), the
    /// convert receiver and the transfer sender. `sourceAccount` is only
    /// recorded in the memo. An explicit intermediate account must be the
    /// signing account.
    pub fn compose_bridge(
        &self,
        order: &BridgeOrder,
        signer: &CosmosSigner,
    ) -> Result<TransactionBatch, BridgeError> {
        let intermediate = signer.address_str();
        if let Some(account) = &order.intermediate_account {
            if *account != intermediate {
                return Err(BridgeError::Validation(format!(
                    "intermediateAccount must be the relay account {}",
                    intermediate
                )));
            }
        }
        let (account_bytes, _) = decode_bech32_address(&intermediate)?;

        let mut batch = TransactionBatch::new();
        batch.push(ChainMessage::Convert(ConvertMessage {
            initiator: encode_evm_address(&account_bytes),
            receiver: intermediate.clone(),
            token_contract: self.config.token_contract.clone(),
            amount: order.amount.clone(),
        }));
        batch.push(ChainMessage::Transfer(TransferMessage {
            source_port: self.config.source_port.clone(),
            source_channel: self.config.source_channel.clone(),
            token: TokenAmount {
                denom: order.denomination.clone(),
                amount: order.amount.clone(),
            },
            sender: intermediate,
            receiver: order.destination_account.clone(),
            timeout_height: self.config.timeout_height,
            timeout_timestamp: self.timeout_timestamp(),
            memo: String::new(),
        }));

        Ok(batch.with_memo(format!("bridge from {}", order.source_account)))
    }

    /// Single transfer on the channel named by the request
    pub fn compose_transfer(&self, order: &TransferOrder) -> TransactionBatch {
        let mut batch = TransactionBatch::new();
        batch.push(ChainMessage::Transfer(TransferMessage {
            source_port: self.config.source_port.clone(),
            source_channel: order.channel.clone(),
            token: TokenAmount {
                denom: order.denomination.clone(),
                amount: order.amount.clone(),
            },
            sender: order.source_account.clone(),
            receiver: order.destination_account.clone(),
            timeout_height: self.config.timeout_height,
            timeout_timestamp: self.timeout_timestamp(),
            memo: String::new(),
        }));
        batch
    }

    /// Submit a bridge batch signed by the service credential
    pub async fn bridge(&self, order: &BridgeOrder) -> Result<TransactionResult, BridgeError> {
        let signer =
            CosmosSigner::from_credential(&self.config.service_credential, &self.config.signer)?;
        let batch = self.compose_bridge(order, &signer)?;
        self.submit(&signer, &batch).await
    }

    /// Submit a transfer signed by the caller's credential
    pub async fn ibc_transfer(
        &self,
        order: &TransferOrder,
    ) -> Result<TransactionResult, BridgeError> {
        let batch = self.compose_transfer(order);
        let signer = CosmosSigner::from_credential(&order.credential, &self.config.signer)?;
        self.submit(&signer, &batch).await
    }

    /// Sign and broadcast `batch` while holding the signer's account lock
    pub async fn submit(
        &self,
        signer: &CosmosSigner,
        batch: &TransactionBatch,
    ) -> Result<TransactionResult, BridgeError> {
        let address = signer.address_str();
        let operation = batch.describe();

        let _guard = self.locks.acquire(&address).await;
        let start = Instant::now();

        let client = self.factory.connect()?;
        let result = client.sign_and_broadcast(signer, batch).await;

        metrics::BROADCAST_LATENCY
            .with_label_values(&[operation.as_str()])
            .observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(tx) => {
                metrics::BROADCASTS
                    .with_label_values(&[operation.as_str(), "success"])
                    .inc();
                info!(
                    tx_hash = %tx.transaction_hash,
                    signer = %address,
                    messages = %operation,
                    "Transaction broadcast"
                );
            }
            Err(e) => {
                metrics::BROADCASTS
                    .with_label_values(&[operation.as_str(), "failure"])
                    .inc();
                error!(
                    signer = %address,
                    messages = %operation,
                    error = %e,
                    "Transaction failed"
                );
            }
        }

        result
    }

    /// Absolute IBC timeout in unix nanoseconds, or 0 when disabled
    fn timeout_timestamp(&self) -> u64 {
        if self.config.timeout_seconds == 0 {
            return 0;
        }
        let now = Utc::now()
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0);
        now.saturating_add(self.config.timeout_seconds.saturating_mul(NANOS_PER_SECOND))
    }
}
