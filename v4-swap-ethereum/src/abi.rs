//! Solidity bindings for the contracts the swap builder talks to: the v4 quoter, the Permit2
//! registry and the universal router.

use alloy::{
    primitives::aliases::{I24, U24},
    sol,
};
use serde::Serialize;
use v4_swap_common::models::pool::PoolKey as PoolKeyModel;

use crate::router::EncodingError;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct PoolKey {
        address currency0;
        address currency1;
        uint24 fee;
        int24 tickSpacing;
        address hooks;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ExactInputSingleParams {
        PoolKey poolKey;
        bool zeroForOne;
        uint128 amountIn;
        uint128 amountOutMinimum;
        bytes hookData;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ExactOutputSingleParams {
        PoolKey poolKey;
        bool zeroForOne;
        uint128 amountOut;
        uint128 amountInMaximum;
        bytes hookData;
    }

    // V4Quoter
    #[derive(Debug, PartialEq, Eq)]
    struct QuoteExactSingleParams {
        PoolKey poolKey;
        bool zeroForOne;
        uint128 exactAmount;
        bytes hookData;
    }

    function quoteExactInputSingle(QuoteExactSingleParams memory params)
        external
        returns (uint256 amountOut, uint256 gasEstimate);

    function quoteExactOutputSingle(QuoteExactSingleParams memory params)
        external
        returns (uint256 amountIn, uint256 gasEstimate);

    // Permit2 (IAllowanceTransfer)
    #[derive(Debug, PartialEq, Eq, Serialize)]
    struct PermitDetails {
        address token;
        uint160 amount;
        uint48 expiration;
        uint48 nonce;
    }

    #[derive(Debug, PartialEq, Eq, Serialize)]
    struct PermitSingle {
        PermitDetails details;
        address spender;
        uint256 sigDeadline;
    }

    function allowance(address user, address token, address spender)
        external
        view
        returns (uint160 amount, uint48 expiration, uint48 nonce);

    error InvalidNonce();

    // UniversalRouter
    error ExecutionFailed(uint256 commandIndex, bytes message);

    function execute(bytes calldata commands, bytes[] calldata inputs, uint256 deadline)
        external
        payable;
}

impl TryFrom<&PoolKeyModel> for PoolKey {
    type Error = EncodingError;

    fn try_from(key: &PoolKeyModel) -> Result<Self, Self::Error> {
        let fee = U24::try_from(key.fee)
            .map_err(|_| EncodingError::OutOfRange { field: "fee", value: key.fee.to_string() })?;
        let tick_spacing = I24::try_from(key.tick_spacing).map_err(|_| {
            EncodingError::OutOfRange { field: "tickSpacing", value: key.tick_spacing.to_string() }
        })?;
        Ok(PoolKey {
            currency0: key.currency0.address(),
            currency1: key.currency1.address(),
            fee,
            tickSpacing: tick_spacing,
            hooks: key.hooks,
        })
    }
}
