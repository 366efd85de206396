pub mod permit;
pub mod pool;
pub mod quote;
pub mod swap;

use std::fmt;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Transaction hash literal type to uniquely identify a transaction in the chain.
pub type TxHash = B256;

/// The reserved all-zero address denotes the chain's native asset.
pub const NATIVE_CURRENCY: Address = Address::ZERO;

pub fn is_native(address: &Address) -> bool {
    *address == NATIVE_CURRENCY
}

/// A 32-byte, left-zero-padded representation of an [`Address`].
///
/// The router's action payloads reference currencies with this fixed width. Ordering is the
/// unsigned lexicographic byte order of the underlying word, which is identical to the order of
/// the wrapped addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyId(B256);

impl CurrencyId {
    pub fn address(&self) -> Address {
        Address::from_word(self.0)
    }

    pub fn as_word(&self) -> B256 {
        self.0
    }

    pub fn is_native(&self) -> bool {
        is_native(&self.address())
    }
}

impl From<Address> for CurrencyId {
    fn from(address: Address) -> Self {
        Self(address.into_word())
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address())
    }
}

/// A token known to the configuration: native asset or ERC-20.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(symbol: &str, address: Address, decimals: u8) -> Self {
        Self { symbol: symbol.to_string(), address, decimals }
    }

    pub fn is_native(&self) -> bool {
        is_native(&self.address)
    }

    /// One whole token expressed in raw units (`10^decimals`).
    pub fn one(&self) -> U256 {
        U256::from(10u8).pow(U256::from(self.decimals))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
