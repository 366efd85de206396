use alloy_primitives::Bytes;
use thiserror::Error;

use crate::models::{swap::SwapState, TxHash};

/// Errors surfaced by a swap attempt.
///
/// Every variant except `TransactionReverted` ends an attempt in [`SwapState::Failed`]. None of
/// them is retried: a recoverable error means the caller may start a new attempt with a fresh
/// quote and nonce.
/// Variants:
/// - `WalletNotConnected`: no signing account is available. Fatal until a wallet is connected.
/// - `QuoteUnavailable`: the simulation reverted or the pool has no liquidity.
/// - `SignatureRejected`: the user declined to sign. No chain interaction happened.
/// - `Declined`: the user did not confirm the quoted swap.
/// - `NonceStale`: the registry rejected a permit built from an outdated nonce.
/// - `TransactionRejected`: the node refused the transaction, e.g. insufficient funds or gas.
/// - `TransactionReverted`: the transaction was mined but the protocol declined the trade.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwapError {
    #[error("Wallet not connected")]
    WalletNotConnected,
    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(String),
    #[error("Signature rejected by the user")]
    SignatureRejected,
    #[error("Swap declined by the user")]
    Declined,
    #[error("Permit nonce is stale, restart the swap")]
    NonceStale,
    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),
    #[error("Transaction {tx_hash} reverted")]
    TransactionReverted { tx_hash: TxHash },
    #[error("Chain read failed: {0}")]
    ChainRead(String),
    #[error("Encoding failed: {0}")]
    Encoding(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Swap attempt already in state {0}")]
    AttemptConsumed(SwapState),
}

impl SwapError {
    /// The state an attempt ends in when it halts with this error.
    pub fn terminal_state(&self) -> SwapState {
        match self {
            SwapError::TransactionReverted { .. } => SwapState::Reverted,
            _ => SwapState::Failed,
        }
    }

    /// Whether a fresh attempt may succeed where this one failed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SwapError::WalletNotConnected | SwapError::InvalidRequest(_) | SwapError::Encoding(_)
        )
    }
}

/// Failure of a read-only contract call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    /// The call executed and reverted, carrying the raw revert data.
    #[error("Call reverted with data {data}")]
    Reverted { data: Bytes },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Failed to decode return data: {0}")]
    Decode(String),
}

impl From<CallError> for SwapError {
    fn from(err: CallError) -> Self {
        SwapError::ChainRead(err.to_string())
    }
}

/// Failure of the typed-data signing capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignerError {
    #[error("User rejected the signature request")]
    Rejected,
    #[error("Signer error: {0}")]
    Other(String),
}

impl From<SignerError> for SwapError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Rejected => SwapError::SignatureRejected,
            SignerError::Other(msg) => SwapError::TransactionRejected(msg),
        }
    }
}

/// Failure of the broadcast capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BroadcastError {
    #[error("User rejected the transaction")]
    UserRejected,
    /// The node refused the transaction. Revert data is present when the node simulated the
    /// call before accepting it.
    #[error("Transaction rejected: {message}")]
    Rejected { message: String, revert_data: Option<Bytes> },
    #[error("Transport error: {0}")]
    Transport(String),
}
