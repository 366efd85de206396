use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, Bytes, Signature, U256};
use async_trait::async_trait;

use crate::{
    error::{BroadcastError, CallError, SignerError},
    models::{
        swap::{ReceiptStatus, TransactionCall},
        TxHash,
    },
};

/// Read-only access to contract state and simulations.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Executes `data` against `to` without creating a transaction.
    ///
    /// Returns the raw return data, or [`CallError::Reverted`] with the revert data if the call
    /// reverted.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, CallError>;

    /// Native balance of `account` at the latest block.
    async fn get_balance(&self, account: Address) -> Result<U256, CallError>;
}

/// A wallet able to sign EIP-712 typed data.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// The connected account, if any.
    fn account(&self) -> Option<Address>;

    /// Asks the account holder to sign `typed_data`. Declining yields [`SignerError::Rejected`].
    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature, SignerError>;
}

/// A wallet able to submit transactions and report their outcome.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait TransactionBroadcaster: Send + Sync {
    async fn send_transaction(&self, call: TransactionCall) -> Result<TxHash, BroadcastError>;

    /// Waits until the transaction is mined.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ReceiptStatus, BroadcastError>;
}
