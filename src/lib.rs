//! Bridge Relay: ERC20 to IBC forwarding service
//!
//! HTTP service in front of a Kava-style hub chain:
//!
//! - **Address Conversion** - EVM hex accounts re-encoded as bech32 for any prefix
//! - **Transaction Composer** - `[Convert, Transfer]` batches submitted as one transaction
//! - **Chain Client** - direct-mode signing, gas simulation and broadcast over REST
//! - **Retry** - bounded retry of idempotent chain calls
//! - **API** - axum handlers, rate limiting, health and metrics
//!
//! The binary in `main.rs` wires these together from environment configuration.

pub mod address;
pub mod api;
pub mod chain;
pub mod composer;
pub mod config;
pub mod error;
pub mod locks;
pub mod messages;
pub mod metrics;
pub mod preflight;
pub mod redact;
pub mod retry;
pub mod signer;
pub mod types;

pub use address::AddressConverter;
pub use chain::{ChainClient, ChainClientFactory, ChainSettings, RestClientFactory};
pub use composer::{ComposerConfig, TransactionComposer};
pub use config::Config;
pub use error::{BridgeError, ErrorKind};
pub use messages::{ChainMessage, TransactionBatch, TransactionResult};
pub use retry::{with_retry, RetryConfig};
