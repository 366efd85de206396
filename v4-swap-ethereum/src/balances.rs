use alloy::primitives::{Address, U256};
use tracing::warn;
use v4_swap_common::{models::Token, traits::ChainReader};

use crate::erc20::{decode_balance_of, encode_balance_of};

/// Balances of one account. A balance whose read failed is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balances {
    pub native: Option<U256>,
    pub token: Option<U256>,
}

/// Reads the native balance of `account` and its balance of `token` concurrently.
///
/// The two reads fail independently. A native `token` reuses the native balance.
pub async fn fetch_balances(
    reader: &dyn ChainReader,
    account: Address,
    token: &Token,
) -> Balances {
    let token_balance = async {
        if token.is_native() {
            return None;
        }
        let data = reader
            .call(token.address, encode_balance_of(account).into())
            .await
            .map_err(|e| warn!(token = %token, error = %e, "Failed to read token balance"))
            .ok()?;
        decode_balance_of(&data)
            .map_err(|e| warn!(token = %token, error = %e, "Failed to decode token balance"))
            .ok()
    };
    let native_balance = async {
        reader
            .get_balance(account)
            .await
            .map_err(|e| warn!(error = %e, "Failed to read native balance"))
            .ok()
    };

    let (native, token_balance) = tokio::join!(native_balance, token_balance);
    let token_balance = if token.is_native() { native } else { token_balance };
    Balances { native, token: token_balance }
}
