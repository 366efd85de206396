//! Common test fixtures for v4-swap-ethereum tests.
//!
//! `FakeChain` stands in for the node: it answers quoter and Permit2 reads, keeps the Permit2
//! nonce of a single owner/token/spender triple and checks permits of submitted router calls
//! against it. `FakeWallet` signs with a fixed local key.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use alloy::{
    dyn_abi::TypedData,
    primitives::{address, aliases::U160, keccak256, Address, Bytes, Signature, U256},
    signers::{local::PrivateKeySigner, Signer},
    sol_types::{SolCall, SolError, SolValue},
};
use async_trait::async_trait;
use v4_swap_common::{
    error::{BroadcastError, CallError, SignerError},
    models::{
        swap::{ReceiptStatus, TransactionCall},
        TxHash,
    },
    traits::{ChainReader, TransactionBroadcaster, TypedDataSigner},
};

use crate::{abi, erc20::balanceOfCall};

pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
pub const ROUTER: Address = address!("3a9d48ab9751398bbfa63ad67599bb04e4bdf98b");
pub const PERMIT2: Address = address!("000000000022D473030F116dDEE9F6B43aC78BA3");
pub const QUOTER: Address = address!("61B3f2011A92d183C7dbaDBdA940a7555Ccf9227");
pub const USDT: Address = address!("bAce3798896B6e8dcBBe26B7A698150c98ba67d0");

// First default anvil account.
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Debug, Default)]
struct ChainState {
    /// Quoter answers keyed by the exact amount. `None` reverts.
    quotes: HashMap<U256, Option<U256>>,
    allowance_amount: U160,
    allowance_expiration: u64,
    nonce: u64,
    token_balance: U256,
    native_balance: U256,
    receipt: Option<ReceiptStatus>,
    sent: Vec<TransactionCall>,
}

#[derive(Debug, Default)]
pub struct FakeChain {
    state: Mutex<ChainState>,
    tx_counter: AtomicU64,
}

impl FakeChain {
    pub fn new() -> Self {
        let chain = Self::default();
        chain.set_receipt(ReceiptStatus::Success);
        chain
    }

    pub fn with_quote(self, exact_amount: U256, other_side: Option<U256>) -> Self {
        self.state
            .lock()
            .unwrap()
            .quotes
            .insert(exact_amount, other_side);
        self
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        self.state.lock().unwrap().nonce = nonce;
        self
    }

    pub fn with_allowance(self, amount: U160, expiration: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.allowance_amount = amount;
            state.allowance_expiration = expiration;
        }
        self
    }

    pub fn with_balances(self, native: U256, token: U256) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.native_balance = native;
            state.token_balance = token;
        }
        self
    }

    pub fn set_receipt(&self, status: ReceiptStatus) {
        self.state.lock().unwrap().receipt = Some(status);
    }

    pub fn nonce(&self) -> u64 {
        self.state.lock().unwrap().nonce
    }

    pub fn sent(&self) -> Vec<TransactionCall> {
        self.state.lock().unwrap().sent.clone()
    }

    fn quote(&self, params: &abi::QuoteExactSingleParams) -> Result<Bytes, CallError> {
        let state = self.state.lock().unwrap();
        match state
            .quotes
            .get(&U256::from(params.exactAmount))
        {
            Some(Some(amount)) => Ok((*amount, U256::from(90_000u64))
                .abi_encode_params()
                .into()),
            _ => Err(CallError::Reverted { data: Bytes::new() }),
        }
    }

    /// Applies the permits of a router call, rejecting it like a node would if a permit nonce
    /// does not match the registry.
    fn apply_permits(&self, data: &[u8]) -> Result<(), BroadcastError> {
        let call = abi::executeCall::abi_decode(data).map_err(|e| BroadcastError::Rejected {
            message: format!("invalid calldata: {e}"),
            revert_data: None,
        })?;
        let mut state = self.state.lock().unwrap();
        for (index, (command, input)) in call
            .commands
            .iter()
            .zip(call.inputs.iter())
            .enumerate()
        {
            if *command != 0x0a {
                continue;
            }
            let (permit, _signature) =
                <(abi::PermitSingle, Bytes)>::abi_decode_params(input).unwrap();
            if permit.details.nonce.to::<u64>() != state.nonce {
                let revert = abi::ExecutionFailed {
                    commandIndex: U256::from(index),
                    message: abi::InvalidNonce {}.abi_encode().into(),
                };
                return Err(BroadcastError::Rejected {
                    message: "execution reverted".to_string(),
                    revert_data: Some(revert.abi_encode().into()),
                });
            }
            state.nonce += 1;
            state.allowance_amount = permit.details.amount;
            state.allowance_expiration = permit.details.expiration.to::<u64>();
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, CallError> {
        if to == QUOTER {
            if let Ok(call) = abi::quoteExactInputSingleCall::abi_decode(&data) {
                return self.quote(&call.params);
            }
            if let Ok(call) = abi::quoteExactOutputSingleCall::abi_decode(&data) {
                return self.quote(&call.params);
            }
        }
        let state = self.state.lock().unwrap();
        if to == PERMIT2 && abi::allowanceCall::abi_decode(&data).is_ok() {
            return Ok((
                state.allowance_amount,
                U256::from(state.allowance_expiration),
                U256::from(state.nonce),
            )
                .abi_encode_params()
                .into());
        }
        if balanceOfCall::abi_decode(&data).is_ok() {
            return Ok(state.token_balance.abi_encode().into());
        }
        Err(CallError::Transport(format!("unexpected call to {to}")))
    }

    async fn get_balance(&self, _account: Address) -> Result<U256, CallError> {
        Ok(self.state.lock().unwrap().native_balance)
    }
}

#[async_trait]
impl TransactionBroadcaster for FakeChain {
    async fn send_transaction(&self, call: TransactionCall) -> Result<TxHash, BroadcastError> {
        if call.to != ROUTER {
            return Err(BroadcastError::Transport(format!("unexpected recipient {}", call.to)));
        }
        self.apply_permits(&call.data)?;
        let counter = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let mut preimage = call.data.to_vec();
        preimage.extend_from_slice(&counter.to_be_bytes());
        let hash = keccak256(preimage);
        self.state
            .lock()
            .unwrap()
            .sent
            .push(call);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, _tx_hash: TxHash) -> Result<ReceiptStatus, BroadcastError> {
        self.state
            .lock()
            .unwrap()
            .receipt
            .ok_or_else(|| BroadcastError::Transport("no receipt".to_string()))
    }
}

/// A wallet backed by [`TEST_PRIVATE_KEY`].
pub struct FakeWallet {
    signer: PrivateKeySigner,
    reject: bool,
}

impl FakeWallet {
    pub fn new() -> Self {
        Self { signer: TEST_PRIVATE_KEY.parse().unwrap(), reject: false }
    }

    /// A wallet whose user declines every signature request.
    pub fn rejecting() -> Self {
        Self { reject: true, ..Self::new() }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl TypedDataSigner for FakeWallet {
    fn account(&self) -> Option<Address> {
        Some(self.signer.address())
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature, SignerError> {
        if self.reject {
            return Err(SignerError::Rejected);
        }
        self.signer
            .sign_dynamic_typed_data(typed_data)
            .await
            .map_err(|e| SignerError::Other(e.to_string()))
    }
}
