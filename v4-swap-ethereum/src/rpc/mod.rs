use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, U256, U64},
    rpc::{
        client::{ClientBuilder, ReqwestClient},
        types::{BlockNumberOrTag, TransactionInput, TransactionRequest},
    },
    transports::http::reqwest,
};
use async_trait::async_trait;
use tracing::instrument;
use v4_swap_common::{error::CallError, traits::ChainReader};

pub mod errors;

use errors::{RPCError, RpcResultExt};

/// This struct wraps the ReqwestClient and provides the read-only Ethereum RPC methods the swap
/// builder needs.
/// It is cheap to clone, as the `inner` internally uses an Arc for the ReqwestClient.
#[derive(Clone, Debug)]
pub struct EthereumRpcClient {
    inner: ReqwestClient,
}

impl EthereumRpcClient {
    /// Creates a new EthereumRpcClient with the given RPC URL.
    ///
    /// Requests are sent once. A failed read surfaces to the caller, which decides whether to
    /// start over.
    pub fn new(rpc_url: &str) -> Result<Self, RPCError> {
        let url = rpc_url
            .parse()
            .map_err(|e| RPCError::SetupError(format!("Invalid RPC URL: {}", e)))?;

        let http_client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RPCError::SetupError(format!("Failed to create HTTP client: {e}")))?;

        let rpc = ClientBuilder::default().http_with_client(http_client, url);

        Ok(Self { inner: rpc })
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn eth_chain_id(&self) -> Result<u64, RPCError> {
        let chain_id: U64 = self
            .inner
            .request_noparams("eth_chainId")
            .await
            .rpc_context("Failed to get chain id")?;

        Ok(chain_id.to::<u64>())
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn eth_get_balance(
        &self,
        block_id: BlockNumberOrTag,
        address: Address,
    ) -> Result<U256, RPCError> {
        self.inner
            .request("eth_getBalance", (address, block_id))
            .await
            .with_rpc_context(|| {
                format!("Failed to get balance for address {address}, block {block_id}")
            })
    }

    /// Executes a new message call immediately without creating a transaction on the blockchain.
    /// See https://ethereum.org/en/developers/docs/apis/json-rpc/#eth_call
    ///
    /// Returns the output data from the call or an error if the call failed. A reverted call
    /// keeps its revert data, see [`RPCError::revert_data`].
    #[instrument(level = "debug", skip(self, request))]
    pub async fn eth_call(
        &self,
        request: TransactionRequest,
        block: BlockNumberOrTag,
    ) -> Result<Bytes, RPCError> {
        self.inner
            .request("eth_call", (&request, block))
            .await
            .with_rpc_context(|| format!("Failed to send an eth_call request for block {block}"))
    }
}

#[async_trait]
impl ChainReader for EthereumRpcClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, CallError> {
        let request = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(data));
        Ok(self
            .eth_call(request, BlockNumberOrTag::Latest)
            .await?)
    }

    async fn get_balance(&self, account: Address) -> Result<U256, CallError> {
        Ok(self
            .eth_get_balance(BlockNumberOrTag::Latest, account)
            .await?)
    }
}
