//! Request and response bodies of the HTTP surface
//!
//! Every request field is optional at the serde level so that an empty body
//! and a body with missing keys both reach `validate()`, which answers with
//! the single "Missing required fields" message.

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::redact::Redacted;
use crate::signer::Credential;

/// `POST /bridge`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeRequest {
    /// Origin of the funds, recorded in the transaction memo
    pub source_account: Option<String>,
    /// Hub-chain account that converts and sends; must be the relay account
    pub intermediate_account: Option<String>,
    /// Recipient on the counterparty chain
    pub destination_account: Option<String>,
    pub amount: Option<String>,
    pub denomination: Option<String>,
}

/// `POST /convert-address`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvertAddressRequest {
    pub source_account: Option<String>,
}

/// `POST /ibc-transfer`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IbcTransferRequest {
    pub credential: Option<Credential>,
    pub source_account: Option<String>,
    pub destination_account: Option<String>,
    pub amount: Option<String>,
    pub denomination: Option<String>,
    pub channel: Option<String>,
}

/// Validated `/bridge` input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOrder {
    pub source_account: String,
    pub intermediate_account: Option<String>,
    pub destination_account: String,
    pub amount: String,
    pub denomination: String,
}

/// Validated `/ibc-transfer` input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOrder {
    pub credential: Credential,
    pub source_account: String,
    pub destination_account: String,
    pub amount: String,
    pub denomination: String,
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub transaction_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertAddressResponse {
    pub destination_account_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IbcTransferResponse {
    pub status: String,
    pub transaction_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Take a field that must be present and non-blank
fn present(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Amounts are positive integers in base units that fit in a u128
pub fn validate_amount(amount: &str) -> Result<(), BridgeError> {
    if !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BridgeError::Validation(format!(
            "Invalid amount '{}': expected a positive integer",
            amount
        )));
    }
    match amount.parse::<u128>() {
        Ok(0) => Err(BridgeError::Validation(
            "Invalid amount: must be greater than zero".to_string(),
        )),
        Ok(_) => Ok(()),
        Err(_) => Err(BridgeError::Validation(format!(
            "Invalid amount '{}': out of range",
            amount
        ))),
    }
}

impl BridgeRequest {
    pub fn validate(&self) -> Result<BridgeOrder, BridgeError> {
        let (Some(source_account), Some(destination_account), Some(amount), Some(denomination)) = (
            present(&self.source_account),
            present(&self.destination_account),
            present(&self.amount),
            present(&self.denomination),
        ) else {
            return Err(BridgeError::missing_fields());
        };

        validate_amount(&amount)?;

        Ok(BridgeOrder {
            source_account,
            intermediate_account: present(&self.intermediate_account),
            destination_account,
            amount,
            denomination,
        })
    }
}

impl ConvertAddressRequest {
    pub fn validate(&self) -> Result<String, BridgeError> {
        present(&self.source_account).ok_or_else(BridgeError::missing_fields)
    }
}

impl IbcTransferRequest {
    pub fn validate(&self) -> Result<TransferOrder, BridgeError> {
        let credential = self
            .credential
            .as_ref()
            .map(|c| c.expose().trim().to_string())
            .filter(|c| !c.is_empty());

        let (
            Some(credential),
            Some(source_account),
            Some(destination_account),
            Some(amount),
            Some(denomination),
            Some(channel),
        ) = (
            credential,
            present(&self.source_account),
            present(&self.destination_account),
            present(&self.amount),
            present(&self.denomination),
            present(&self.channel),
        )
        else {
            return Err(BridgeError::missing_fields());
        };

        validate_amount(&amount)?;

        Ok(TransferOrder {
            credential: Redacted(credential),
            source_account,
            destination_account,
            amount,
            denomination,
            channel,
        })
    }
}
