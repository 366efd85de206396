use alloy::sol_types::SolError;
use v4_swap_common::error::{BroadcastError, SwapError};

use crate::abi::{ExecutionFailed, InvalidNonce};

/// Whether `data` is Permit2's `InvalidNonce()`, bare or wrapped in the router's
/// `ExecutionFailed`.
pub fn is_invalid_nonce(data: &[u8]) -> bool {
    if InvalidNonce::abi_decode(data).is_ok() {
        return true;
    }
    ExecutionFailed::abi_decode(data)
        .map(|failed| is_invalid_nonce(&failed.message))
        .unwrap_or(false)
}

/// Maps a broadcast failure onto the swap error taxonomy.
pub fn classify_broadcast_error(err: BroadcastError) -> SwapError {
    match err {
        BroadcastError::UserRejected => SwapError::SignatureRejected,
        BroadcastError::Rejected { revert_data: Some(data), .. } if is_invalid_nonce(&data) => {
            SwapError::NonceStale
        }
        BroadcastError::Rejected { message, .. } => SwapError::TransactionRejected(message),
        BroadcastError::Transport(message) => SwapError::TransactionRejected(message),
    }
}
