//! EVM ↔ Cosmos Address Conversion
//!
//! An EVM account and a Cosmos secp256k1 account on an Ethermint-style chain
//! share the same 20 raw bytes; only the textual encoding differs:
//!
//! ```text
//! 0x-prefixed hex (40 chars)  <->  bech32(prefix, raw 20 bytes)
//! ```
//!
//! Conversion is purely local. No chain is queried.

use bech32::{self, FromBase32, ToBase32, Variant};

use crate::error::BridgeError;

/// Converts EVM hex addresses into bech32 accounts with a fixed prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressConverter {
    prefix: String,
}

impl AddressConverter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Convert a 0x-prefixed (or bare) hex EVM address to a bech32 account
    pub fn convert(&self, evm_address: &str) -> Result<String, BridgeError> {
        let raw = parse_evm_address(evm_address)?;
        encode_bech32_address(&raw, &self.prefix)
    }

    /// Inverse of [`convert`](Self::convert). The bech32 prefix must match.
    pub fn to_evm(&self, bech32_address: &str) -> Result<String, BridgeError> {
        let (raw, hrp) = decode_bech32_address(bech32_address)?;
        if hrp != self.prefix {
            return Err(BridgeError::AddressFormat(format!(
                "expected prefix '{}', got '{}'",
                self.prefix, hrp
            )));
        }
        Ok(encode_evm_address(&raw))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a 0x-prefixed hex EVM address to 20 bytes
pub fn parse_evm_address(addr: &str) -> Result<[u8; 20], BridgeError> {
    let hex_str = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .unwrap_or(addr);

    if hex_str.len() != 40 {
        return Err(BridgeError::AddressFormat(format!(
            "expected 40 hex chars, got {}",
            hex_str.len()
        )));
    }

    let bytes =
        hex::decode(hex_str).map_err(|e| BridgeError::AddressFormat(format!("bad hex: {}", e)))?;

    let mut result = [0u8; 20];
    result.copy_from_slice(&bytes);
    Ok(result)
}

/// Encode 20 bytes to EVM hex string with 0x prefix
pub fn encode_evm_address(bytes: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a bech32 address to raw 20 bytes
///
/// Returns (raw_bytes, hrp) where hrp is the human-readable prefix
pub fn decode_bech32_address(addr: &str) -> Result<([u8; 20], String), BridgeError> {
    let (hrp, data, _variant) = bech32::decode(addr)
        .map_err(|e| BridgeError::AddressFormat(format!("invalid bech32 address: {}", e)))?;

    let bytes = Vec::<u8>::from_base32(&data)
        .map_err(|e| BridgeError::AddressFormat(format!("invalid base32 data: {}", e)))?;

    if bytes.len() != 20 {
        return Err(BridgeError::AddressFormat(format!(
            "expected 20 bytes, got {}",
            bytes.len()
        )));
    }

    let mut result = [0u8; 20];
    result.copy_from_slice(&bytes);
    Ok((result, hrp))
}

/// Encode raw 20 bytes to a bech32 address with given prefix
pub fn encode_bech32_address(bytes: &[u8; 20], hrp: &str) -> Result<String, BridgeError> {
    bech32::encode(hrp, bytes.to_base32(), Variant::Bech32)
        .map_err(|e| BridgeError::AddressFormat(format!("failed to encode bech32: {}", e)))
}

/// True when the string parses as a 20-byte EVM hex address
pub fn is_evm_address(addr: &str) -> bool {
    parse_evm_address(addr).is_ok()
}
