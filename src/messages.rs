//! Chain messages and transaction batches
//!
//! Two message types are submitted to the hub chain:
//!
//! - `MsgConvertERC20ToCoin` (Kava `evmutil`): converts an ERC20 balance held
//!   by an EVM account into the native SDK coin owned by a bech32 account.
//! - `MsgTransfer` (ICS-20): sends a coin over an IBC channel.
//!
//! The protobuf structs below mirror the upstream `.proto` definitions field
//! for field (same tags), so the encoded bytes are what the chain decodes.

use cosmrs::Any;
use prost::Message;

/// Type URL of the `evmutil` ERC20 → coin conversion
pub const CONVERT_ERC20_TYPE_URL: &str = "/kava.evmutil.v1beta1.MsgConvertERC20ToCoin";

/// Type URL of the ICS-20 transfer
pub const IBC_TRANSFER_TYPE_URL: &str = "/ibc.applications.transfer.v1.MsgTransfer";

// ============================================================================
// Domain Messages
// ============================================================================

/// ERC20 → native coin conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertMessage {
    /// EVM hex address holding the ERC20 balance
    pub initiator: String,
    /// bech32 account receiving the native coin
    pub receiver: String,
    /// ERC20 contract being converted
    pub token_contract: String,
    /// Integer amount in base units
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    pub denom: String,
    pub amount: String,
}

/// IBC client height. `0/0` disables the height timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutHeight {
    pub revision_number: u64,
    pub revision_height: u64,
}

/// ICS-20 transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMessage {
    pub source_port: String,
    pub source_channel: String,
    pub token: TokenAmount,
    pub sender: String,
    pub receiver: String,
    pub timeout_height: TimeoutHeight,
    /// Absolute unix time in nanoseconds; 0 disables the timestamp timeout
    pub timeout_timestamp: u64,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainMessage {
    Convert(ConvertMessage),
    Transfer(TransferMessage),
}

impl ChainMessage {
    /// Discriminator the remote chain uses to decode the message
    pub fn type_url(&self) -> &'static str {
        match self {
            ChainMessage::Convert(_) => CONVERT_ERC20_TYPE_URL,
            ChainMessage::Transfer(_) => IBC_TRANSFER_TYPE_URL,
        }
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            ChainMessage::Convert(_) => "convert",
            ChainMessage::Transfer(_) => "transfer",
        }
    }

    /// Encode into a protobuf `Any` ready for a transaction body
    pub fn to_any(&self) -> Any {
        let value = match self {
            ChainMessage::Convert(m) => MsgConvertErc20ToCoin::from(m).encode_to_vec(),
            ChainMessage::Transfer(m) => MsgTransfer::from(m).encode_to_vec(),
        };
        Any {
            type_url: self.type_url().to_string(),
            value,
        }
    }
}

/// Ordered messages submitted as one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionBatch {
    messages: Vec<ChainMessage>,
    memo: String,
}

impl TransactionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn push(&mut self, message: ChainMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChainMessage] {
        &self.messages
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Message labels in submission order, e.g. `convert,transfer`
    pub fn describe(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.label())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn to_any_vec(&self) -> Vec<Any> {
        self.messages.iter().map(ChainMessage::to_any).collect()
    }
}

/// Outcome of an accepted broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
    pub transaction_hash: String,
    pub height: Option<u64>,
    pub gas_used: Option<u64>,
}

impl TransactionResult {
    pub fn new(transaction_hash: impl Into<String>) -> Self {
        Self {
            transaction_hash: transaction_hash.into(),
            height: None,
            gas_used: None,
        }
    }
}

// ============================================================================
// Protobuf Wire Types
// ============================================================================

/// `cosmos.base.v1beta1.Coin`
#[derive(Clone, PartialEq, Message)]
pub struct ProtoCoin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

/// `ibc.core.client.v1.Height`
#[derive(Clone, PartialEq, Message)]
pub struct ProtoHeight {
    #[prost(uint64, tag = "1")]
    pub revision_number: u64,
    #[prost(uint64, tag = "2")]
    pub revision_height: u64,
}

/// `kava.evmutil.v1beta1.MsgConvertERC20ToCoin`
#[derive(Clone, PartialEq, Message)]
pub struct MsgConvertErc20ToCoin {
    #[prost(string, tag = "1")]
    pub initiator: String,
    #[prost(string, tag = "2")]
    pub receiver: String,
    #[prost(string, tag = "3")]
    pub kava_erc20_address: String,
    #[prost(string, tag = "4")]
    pub amount: String,
}

/// `ibc.applications.transfer.v1.MsgTransfer`
#[derive(Clone, PartialEq, Message)]
pub struct MsgTransfer {
    #[prost(string, tag = "1")]
    pub source_port: String,
    #[prost(string, tag = "2")]
    pub source_channel: String,
    #[prost(message, optional, tag = "3")]
    pub token: Option<ProtoCoin>,
    #[prost(string, tag = "4")]
    pub sender: String,
    #[prost(string, tag = "5")]
    pub receiver: String,
    #[prost(message, optional, tag = "6")]
    pub timeout_height: Option<ProtoHeight>,
    #[prost(uint64, tag = "7")]
    pub timeout_timestamp: u64,
    #[prost(string, tag = "8")]
    pub memo: String,
}

impl From<&ConvertMessage> for MsgConvertErc20ToCoin {
    fn from(m: &ConvertMessage) -> Self {
        Self {
            initiator: m.initiator.clone(),
            receiver: m.receiver.clone(),
            kava_erc20_address: m.token_contract.clone(),
            amount: m.amount.clone(),
        }
    }
}

impl From<&TransferMessage> for MsgTransfer {
    fn from(m: &TransferMessage) -> Self {
        Self {
            source_port: m.source_port.clone(),
            source_channel: m.source_channel.clone(),
            token: Some(ProtoCoin {
                denom: m.token.denom.clone(),
                amount: m.token.amount.clone(),
            }),
            sender: m.sender.clone(),
            receiver: m.receiver.clone(),
            timeout_height: Some(ProtoHeight {
                revision_number: m.timeout_height.revision_number,
                revision_height: m.timeout_height.revision_height,
            }),
            timeout_timestamp: m.timeout_timestamp,
            memo: m.memo.clone(),
        }
    }
}
