//! Universal router commands and the v4 pool actions nested inside `V4_SWAP`.
//!
//! The router executes a byte string of commands, one byte each, with a parallel array of
//! ABI-encoded inputs. The `V4_SWAP` input is itself a sequence of pool actions with their own
//! parameter tuples, so the two levels are modelled as separate enums.

pub mod planner;

use alloy::{
    primitives::{aliases::U160, Address, Bytes, U256},
    sol_types::SolValue,
};
use thiserror::Error;

use crate::abi;

/// `ActionConstants.MSG_SENDER`: resolves to the caller of the router.
pub const MSG_SENDER: Address = Address::with_last_byte(1);
/// `ActionConstants.ADDRESS_THIS`: resolves to the router itself.
pub const ADDRESS_THIS: Address = Address::with_last_byte(2);
/// `ActionConstants.OPEN_DELTA`: settle or take the whole open delta of a currency.
pub const OPEN_DELTA: U256 = U256::ZERO;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("{field} value {value} does not fit its ABI type")]
    OutOfRange { field: &'static str, value: String },
    #[error("A permit cannot be attached when selling the native asset")]
    UnexpectedPermit,
}

/// Actions executed by the v4 router inside a `V4_SWAP` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum V4Action {
    SwapExactInSingle(abi::ExactInputSingleParams),
    SwapExactOutSingle(abi::ExactOutputSingleParams),
    /// Pays `amount` of `currency` to the pool manager, from the caller or from the router.
    Settle { currency: Address, amount: U256, payer_is_user: bool },
    /// Pays the whole debt of `currency`, reverting if it exceeds `max_amount`.
    SettleAll { currency: Address, max_amount: U256 },
    /// Takes `amount` of `currency` to `recipient`.
    Take { currency: Address, recipient: Address, amount: U256 },
    /// Takes the whole credit of `currency` to the caller, reverting below `min_amount`.
    TakeAll { currency: Address, min_amount: U256 },
}

impl V4Action {
    pub fn byte(&self) -> u8 {
        match self {
            V4Action::SwapExactInSingle(_) => 0x06,
            V4Action::SwapExactOutSingle(_) => 0x08,
            V4Action::Settle { .. } => 0x0b,
            V4Action::SettleAll { .. } => 0x0c,
            V4Action::Take { .. } => 0x0e,
            V4Action::TakeAll { .. } => 0x0f,
        }
    }

    pub fn encode_params(&self) -> Bytes {
        let encoded = match self {
            // The swap params are a dynamic struct and are read through an offset.
            V4Action::SwapExactInSingle(params) => params.abi_encode(),
            V4Action::SwapExactOutSingle(params) => params.abi_encode(),
            V4Action::Settle { currency, amount, payer_is_user } => {
                (*currency, *amount, *payer_is_user).abi_encode()
            }
            V4Action::SettleAll { currency, max_amount } => (*currency, *max_amount).abi_encode(),
            V4Action::Take { currency, recipient, amount } => {
                (*currency, *recipient, *amount).abi_encode()
            }
            V4Action::TakeAll { currency, min_amount } => (*currency, *min_amount).abi_encode(),
        };
        encoded.into()
    }
}

/// Top-level universal router commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterCommand {
    /// Grants the router a Permit2 allowance from a signed permit. The signature is passed
    /// opaque, as the 65-byte `r || s || v` concatenation.
    Permit2Permit { permit: abi::PermitSingle, signature: Bytes },
    /// Wraps `amount` of the attached native value and sends the wrapped token to `recipient`.
    WrapEth { recipient: Address, amount: U256 },
    /// Unwraps the router's whole wrapped-native balance to `recipient`, reverting below
    /// `amount_min`.
    UnwrapWeth { recipient: Address, amount_min: U256 },
    /// Sends the router's whole balance of `token` to `recipient`, reverting below
    /// `amount_min`.
    Sweep { token: Address, recipient: Address, amount_min: U160 },
    V4Swap { actions: Vec<V4Action> },
}

impl RouterCommand {
    pub fn byte(&self) -> u8 {
        match self {
            RouterCommand::Sweep { .. } => 0x04,
            RouterCommand::Permit2Permit { .. } => 0x0a,
            RouterCommand::WrapEth { .. } => 0x0b,
            RouterCommand::UnwrapWeth { .. } => 0x0c,
            RouterCommand::V4Swap { .. } => 0x10,
        }
    }

    pub fn encode_input(&self) -> Bytes {
        let encoded = match self {
            RouterCommand::Permit2Permit { permit, signature } => {
                (permit.clone(), signature.clone()).abi_encode_params()
            }
            RouterCommand::WrapEth { recipient, amount } => (*recipient, *amount).abi_encode(),
            RouterCommand::UnwrapWeth { recipient, amount_min } => {
                (*recipient, *amount_min).abi_encode()
            }
            RouterCommand::Sweep { token, recipient, amount_min } => {
                (*token, *recipient, *amount_min).abi_encode()
            }
            RouterCommand::V4Swap { actions } => {
                let action_bytes: Bytes = actions.iter().map(V4Action::byte).collect();
                let params: Vec<Bytes> = actions
                    .iter()
                    .map(V4Action::encode_params)
                    .collect();
                (action_bytes, params).abi_encode_params()
            }
        };
        encoded.into()
    }
}
