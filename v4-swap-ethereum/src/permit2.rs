//! Permit2 allowance reads and signed single-token permits.

use std::sync::Arc;

use alloy::{
    dyn_abi::TypedData,
    primitives::{aliases::U160, Address, U256},
    sol_types::{eip712_domain, Eip712Domain, SolCall},
};
use chrono::Utc;
use tracing::{debug, instrument};
use v4_swap_common::{
    error::SwapError,
    models::permit::{PermitAllowance, PermitSingle},
    traits::{ChainReader, TypedDataSigner},
};

use crate::{abi, router::planner::to_u48};

/// Unix timestamp `window_secs` from now.
pub fn deadline_after(window_secs: u64) -> u64 {
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    now.saturating_add(window_secs)
}

pub fn permit2_domain(chain_id: u64, permit2: Address) -> Eip712Domain {
    eip712_domain! {
        name: "Permit2",
        chain_id: chain_id,
        verifying_contract: permit2,
    }
}

pub struct PermitSigner {
    reader: Arc<dyn ChainReader>,
    signer: Arc<dyn TypedDataSigner>,
    permit2: Address,
    chain_id: u64,
}

impl PermitSigner {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        signer: Arc<dyn TypedDataSigner>,
        permit2: Address,
        chain_id: u64,
    ) -> Self {
        Self { reader, signer, permit2, chain_id }
    }

    /// The signing account. Fails with `WalletNotConnected` when none is available.
    pub fn owner(&self) -> Result<Address, SwapError> {
        self.signer
            .account()
            .ok_or(SwapError::WalletNotConnected)
    }

    /// Reads the registry allowance of `owner` for `token` and `spender`.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_allowance(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
    ) -> Result<PermitAllowance, SwapError> {
        let calldata = abi::allowanceCall { user: owner, token, spender }.abi_encode();
        let data = self
            .reader
            .call(self.permit2, calldata.into())
            .await?;
        let allowance = abi::allowanceCall::abi_decode_returns(&data)
            .map_err(|e| SwapError::ChainRead(format!("Failed to decode allowance: {e}")))?;

        Ok(PermitAllowance {
            amount: allowance.amount,
            expiration: allowance.expiration.to::<u64>(),
            nonce: allowance.nonce.to::<u64>(),
        })
    }

    /// Reads the current nonce and signs a permit allowing `spender` to pull `amount` of `token`
    /// until `deadline`.
    pub async fn build_permit(
        &self,
        token: Address,
        amount: U256,
        spender: Address,
        deadline: u64,
    ) -> Result<PermitSingle, SwapError> {
        let owner = self.owner()?;
        let allowance = self
            .fetch_allowance(owner, token, spender)
            .await?;
        self.sign_permit(token, amount, spender, allowance.nonce, deadline)
            .await
    }

    /// Signs a permit with an already known `nonce`. The permit expires and its signature
    /// deadline passes at `deadline`.
    #[instrument(level = "debug", skip(self))]
    pub async fn sign_permit(
        &self,
        token: Address,
        amount: U256,
        spender: Address,
        nonce: u64,
        deadline: u64,
    ) -> Result<PermitSingle, SwapError> {
        self.owner()?;
        let amount = U160::checked_from_limbs_slice(amount.as_limbs())
            .ok_or_else(|| SwapError::Encoding(format!("permit amount {amount} exceeds uint160")))?;
        let message = abi::PermitSingle {
            details: abi::PermitDetails {
                token,
                amount,
                expiration: to_u48("expiration", deadline)
                    .map_err(|e| SwapError::Encoding(e.to_string()))?,
                nonce: to_u48("nonce", nonce).map_err(|e| SwapError::Encoding(e.to_string()))?,
            },
            spender,
            sigDeadline: U256::from(deadline),
        };
        let typed_data =
            TypedData::from_struct(&message, Some(permit2_domain(self.chain_id, self.permit2)));

        let signature = self
            .signer
            .sign_typed_data(&typed_data)
            .await?;
        debug!(nonce, "Permit signed");

        Ok(PermitSingle {
            token,
            amount,
            expiration: deadline,
            nonce,
            spender,
            sig_deadline: U256::from(deadline),
            signature,
        })
    }
}
