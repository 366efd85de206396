use std::fmt::Display;

use alloy::{
    primitives::Bytes,
    transports::{RpcError as AlloyRpcError, TransportErrorKind},
};
use thiserror::Error;
use v4_swap_common::error::CallError;

/// Alloy RPC error type alias for convenience.
pub(crate) type AlloyError = AlloyRpcError<TransportErrorKind>;

#[derive(Error, Debug)]
pub struct ReqwestError {
    pub msg: String,
    #[source]
    pub source: AlloyError,
}

impl Display for ReqwestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.msg, self.source)
    }
}

#[derive(Error, Debug)]
pub enum RPCError {
    #[error("RPC setup error: {0}")]
    SetupError(String),
    #[error("Request error: {0}")]
    RequestError(ReqwestError),
}

impl RPCError {
    pub(super) fn from_alloy<S: ToString>(msg: S, error: AlloyError) -> Self {
        RPCError::RequestError(ReqwestError { msg: msg.to_string(), source: error })
    }

    /// Revert data carried by a JSON-RPC error response, if the node executed and reverted.
    pub fn revert_data(&self) -> Option<Bytes> {
        match self {
            RPCError::RequestError(e) => e
                .source
                .as_error_resp()
                .and_then(|payload| payload.as_revert_data()),
            RPCError::SetupError(_) => None,
        }
    }
}

impl From<RPCError> for CallError {
    fn from(err: RPCError) -> Self {
        match err.revert_data() {
            Some(data) => CallError::Reverted { data },
            None => CallError::Transport(err.to_string()),
        }
    }
}

/// Extension trait for adding RPC context to Results containing Alloy errors.
///
/// Similar to `anyhow::Context`, converts Alloy RPC errors into `RPCError` with a message.
///
/// # Example
/// ```ignore
/// use crate::rpc::errors::RpcResultExt;
///
/// result.rpc_context(format!("Failed to read balance of {address}"))?;
///
/// // Or with lazy evaluation (avoids format! on success path):
/// result.with_rpc_context(|| format!("Failed to read balance of {address}"))?;
/// ```
pub(crate) trait RpcResultExt<T> {
    /// Wraps the error with context, converting it to an `RPCError`.
    fn rpc_context<C: Display>(self, context: C) -> Result<T, RPCError>;

    /// Wraps the error with lazily-evaluated context.
    fn with_rpc_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T, RPCError>;
}

impl<T> RpcResultExt<T> for Result<T, AlloyError> {
    fn rpc_context<C: Display>(self, context: C) -> Result<T, RPCError> {
        self.map_err(|e| RPCError::from_alloy(context.to_string(), e))
    }

    fn with_rpc_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T, RPCError> {
        self.map_err(|e| RPCError::from_alloy(f().to_string(), e))
    }
}
