//! Error types for the bridge relay
//!
//! Every failure that crosses a module boundary is a [`BridgeError`]. The
//! HTTP layer only distinguishes validation failures (answered 400) from
//! everything else (logged, answered 500).

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    // ========================================================================
    // Caller Errors
    // ========================================================================

    #[error("{0}")]
    Validation(String),

    #[error("Invalid address format: {0}")]
    AddressFormat(String),

    // ========================================================================
    // Chain Errors
    // ========================================================================

    #[error("Connection failure: {0}")]
    Connection(String),

    #[error("Signing failure: {0}")]
    Signing(String),

    #[error("Broadcast rejected (code {code}): {log}")]
    Broadcast { code: u32, log: String },

    #[error("Gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<BridgeError>,
    },
}

/// Coarse classification used for retry decisions and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    AddressFormat,
    Connection,
    Signing,
    Broadcast,
    RetryExhausted,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::AddressFormat => "address_format",
            ErrorKind::Connection => "connection",
            ErrorKind::Signing => "signing",
            ErrorKind::Broadcast => "broadcast",
            ErrorKind::RetryExhausted => "retry_exhausted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Validation(_) => ErrorKind::Validation,
            BridgeError::AddressFormat(_) => ErrorKind::AddressFormat,
            BridgeError::Connection(_) => ErrorKind::Connection,
            BridgeError::Signing(_) => ErrorKind::Signing,
            BridgeError::Broadcast { .. } => ErrorKind::Broadcast,
            BridgeError::RetryExhausted { .. } => ErrorKind::RetryExhausted,
        }
    }

    /// Only transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Connection(_))
    }

    pub fn missing_fields() -> Self {
        BridgeError::Validation("Missing required fields".to_string())
    }
}

/// Map reqwest transport failures; anything reqwest reports is a connection problem
impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        BridgeError::Connection(e.to_string())
    }
}
