//! Cosmos Transaction Signing
//!
//! Derives a secp256k1 key from a BIP39 recovery phrase and signs
//! direct-mode transactions with cosmrs.
//!
//! ## Features
//!
//! - Mnemonic-based key derivation (configurable BIP44 path, Kava coin type 459 by default)
//! - bech32 account address for any prefix
//! - `SignDoc` construction and signing for an arbitrary list of `Any` messages

use std::fmt;

use bip39::Mnemonic;
use cosmrs::{
    bip32::DerivationPath,
    crypto::secp256k1::SigningKey,
    tx::{self, Fee, SignDoc, SignerInfo},
    AccountId, Any, Coin,
};

use crate::error::BridgeError;
use crate::redact::Redacted;

/// Kava derivation path (BIP44 coin type 459)
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/459'/0'/0/0";

/// Default bech32 account prefix of the hub chain
pub const DEFAULT_ACCOUNT_PREFIX: &str = "kava";

/// Secret recovery phrase. Never printed.
pub type Credential = Redacted<String>;

/// How a credential is turned into an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerSettings {
    pub account_prefix: String,
    pub derivation_path: String,
}

impl Default for SignerSettings {
    fn default() -> Self {
        Self {
            account_prefix: DEFAULT_ACCOUNT_PREFIX.to_string(),
            derivation_path: DEFAULT_DERIVATION_PATH.to_string(),
        }
    }
}

/// Account state needed to sign (sequence = nonce)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// Fee attached to a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSpec {
    pub denom: String,
    pub amount: u128,
    pub gas_limit: u64,
}

/// Signing key plus derived account address
pub struct CosmosSigner {
    signing_key: SigningKey,
    address: AccountId,
}

impl fmt::Debug for CosmosSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosSigner")
            .field("address", &self.address.to_string())
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

impl CosmosSigner {
    /// Derive a signer from a recovery phrase
    pub fn from_credential(
        credential: &Credential,
        settings: &SignerSettings,
    ) -> Result<Self, BridgeError> {
        let mnemonic = Mnemonic::parse(credential.expose().trim())
            .map_err(|e| BridgeError::Signing(format!("Invalid mnemonic: {}", e)))?;

        let seed = mnemonic.to_seed("");
        let path: DerivationPath = settings
            .derivation_path
            .parse()
            .map_err(|e| BridgeError::Signing(format!("Invalid derivation path: {:?}", e)))?;

        let signing_key = SigningKey::derive_from_path(seed, &path)
            .map_err(|e| BridgeError::Signing(format!("Failed to derive signing key: {}", e)))?;

        let address = signing_key
            .public_key()
            .account_id(&settings.account_prefix)
            .map_err(|e| BridgeError::Signing(format!("Failed to get account ID: {}", e)))?;

        Ok(Self {
            signing_key,
            address,
        })
    }

    pub fn address(&self) -> &AccountId {
        &self.address
    }

    pub fn address_str(&self) -> String {
        self.address.to_string()
    }

    pub fn public_key(&self) -> cosmrs::crypto::PublicKey {
        self.signing_key.public_key()
    }

    /// Build, sign and serialize a transaction carrying `messages`
    pub fn sign(
        &self,
        messages: Vec<Any>,
        memo: &str,
        fee: &FeeSpec,
        account: AccountInfo,
        chain_id: &str,
    ) -> Result<Vec<u8>, BridgeError> {
        let body = tx::Body::new(messages, memo, 0u32);

        let signer_info = SignerInfo::single_direct(Some(self.public_key()), account.sequence);

        let fee_coin = Coin {
            denom: fee
                .denom
                .parse()
                .map_err(|e| BridgeError::Signing(format!("Invalid fee denom '{}': {}", fee.denom, e)))?,
            amount: fee.amount,
        };
        let auth_info = signer_info.auth_info(Fee::from_amount_and_gas(fee_coin, fee.gas_limit));

        let chain_id = chain_id
            .parse()
            .map_err(|_| BridgeError::Signing(format!("Invalid chain ID '{}'", chain_id)))?;

        let sign_doc = SignDoc::new(&body, &auth_info, &chain_id, account.account_number)
            .map_err(|e| BridgeError::Signing(format!("Failed to create sign doc: {}", e)))?;

        let tx_raw = sign_doc
            .sign(&self.signing_key)
            .map_err(|e| BridgeError::Signing(format!("Failed to sign transaction: {}", e)))?;

        tx_raw
            .to_bytes()
            .map_err(|e| BridgeError::Signing(format!("Failed to serialize transaction: {}", e)))
    }
}
