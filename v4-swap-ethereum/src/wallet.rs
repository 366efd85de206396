//! A wallet backed by a local private key and a JSON-RPC node.

use alloy::{
    dyn_abi::TypedData,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Signature},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::{local::PrivateKeySigner, Signer},
};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;
use v4_swap_common::{
    error::{BroadcastError, SignerError},
    models::{
        swap::{ReceiptStatus, TransactionCall},
        TxHash,
    },
    traits::{TransactionBroadcaster, TypedDataSigner},
};

use crate::rpc::errors::AlloyError;

/// EIP-1193 code for a request the user declined.
const USER_REJECTED_CODE: i64 = 4001;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),
}

/// Signs and sends with a private key held in memory. Gas, fees, nonce and chain id are filled
/// by the provider.
pub struct LocalWallet {
    signer: PrivateKeySigner,
    provider: DynProvider,
}

impl LocalWallet {
    pub fn new(private_key: &str, rpc_url: &str) -> Result<Self, WalletError> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| WalletError::InvalidKey(format!("{e}")))?;
        let url: Url = rpc_url
            .parse()
            .map_err(|e| WalletError::InvalidUrl(format!("{e}")))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_http(url)
            .erased();

        Ok(Self { signer, provider })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

/// Maps a node error onto [`BroadcastError`], keeping revert data from gas estimation.
fn broadcast_error(err: AlloyError) -> BroadcastError {
    match err.as_error_resp() {
        Some(payload) if payload.code == USER_REJECTED_CODE => BroadcastError::UserRejected,
        Some(payload) => BroadcastError::Rejected {
            message: payload.message.to_string(),
            revert_data: payload.as_revert_data(),
        },
        None => BroadcastError::Transport(err.to_string()),
    }
}

#[async_trait]
impl TypedDataSigner for LocalWallet {
    fn account(&self) -> Option<Address> {
        Some(self.signer.address())
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature, SignerError> {
        self.signer
            .sign_dynamic_typed_data(typed_data)
            .await
            .map_err(|e| SignerError::Other(e.to_string()))
    }
}

#[async_trait]
impl TransactionBroadcaster for LocalWallet {
    #[instrument(level = "debug", skip(self, call), fields(to = %call.to, value = %call.value))]
    async fn send_transaction(&self, call: TransactionCall) -> Result<TxHash, BroadcastError> {
        let request = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(call.to)
            .with_input(call.data)
            .with_value(call.value);
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(broadcast_error)?;
        debug!(tx_hash = %pending.tx_hash(), "Transaction sent");
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ReceiptStatus, BroadcastError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .get_receipt()
            .await
            .map_err(|e| BroadcastError::Transport(e.to_string()))?;
        if receipt.status() {
            Ok(ReceiptStatus::Success)
        } else {
            Ok(ReceiptStatus::Reverted)
        }
    }
}
