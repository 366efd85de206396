use alloy_primitives::{aliases::U160, Address, Signature, B256, U256};
use serde::{Deserialize, Serialize};

/// Allowance stored by the authorization registry for an (owner, token, spender) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermitAllowance {
    pub amount: U160,
    /// Unix timestamp after which the allowance is no longer usable.
    pub expiration: u64,
    /// Next nonce the registry accepts for a signed permit.
    pub nonce: u64,
}

impl PermitAllowance {
    /// Whether the stored allowance already covers `amount` until after `deadline`.
    pub fn covers(&self, amount: U256, deadline: u64) -> bool {
        U256::from(self.amount) >= amount && self.expiration > deadline
    }
}

/// A signed single-token permit authorizing `spender` to pull `amount` of `token`.
///
/// The nonce is read fresh for every swap attempt. A permit whose nonce was consumed by another
/// permit in the meantime is rejected by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitSingle {
    pub token: Address,
    pub amount: U160,
    pub expiration: u64,
    pub nonce: u64,
    pub spender: Address,
    pub sig_deadline: U256,
    pub signature: Signature,
}

impl PermitSingle {
    /// The raw 65-byte `r || s || v` signature, as passed opaque to the router.
    pub fn signature_bytes(&self) -> [u8; 65] {
        self.signature.as_bytes()
    }

    /// The signature decomposed into `(v, r, s)` for entrypoints taking the components.
    pub fn split_signature(&self) -> (u8, B256, B256) {
        let v = 27 + u8::from(self.signature.v());
        let r = B256::from(self.signature.r().to_be_bytes::<32>());
        let s = B256::from(self.signature.s().to_be_bytes::<32>());
        (v, r, s)
    }
}
