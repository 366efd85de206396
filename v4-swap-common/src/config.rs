//! Deployment configuration: contract addresses, the single supported pool and the known tokens.

use std::{collections::HashSet, fs, path::Path};

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    models::{pool::PoolKey, Token, NATIVE_CURRENCY},
    ordering::resolve,
};

/// Largest LP fee accepted by the pool manager, in hundredths of a bip.
pub const MAX_LP_FEE: u32 = 1_000_000;
/// Exclusive upper bound of a tick spacing (int24).
pub const MAX_TICK_SPACING: i32 = 1 << 23;
pub const DEFAULT_VALIDITY_WINDOW_SECS: u64 = 3600;
/// Largest token precision whose unit, `10^decimals`, fits in a uint256.
pub const MAX_TOKEN_DECIMALS: u8 = 77;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Unknown token: {0}")]
    UnknownToken(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub fee: u32,
    pub tick_spacing: i32,
    #[serde(default)]
    pub hooks: Address,
}

/// How the router settles native currency.
///
/// `Direct` pays native into the pool manager as is. `Wrapped` routes through the wrapped-native
/// token: native input is wrapped by the router first, and native output is taken as wrapped and
/// unwrapped to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum NativeSettlement {
    #[default]
    Direct,
    Wrapped { wrapped_native: Address },
}

impl NativeSettlement {
    pub fn wrapped_native(&self) -> Option<Address> {
        match self {
            NativeSettlement::Direct => None,
            NativeSettlement::Wrapped { wrapped_native } => Some(*wrapped_native),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    pub chain_id: u64,
    /// Universal router executing the command sequence.
    pub router: Address,
    /// Permit2 authorization registry.
    pub permit2: Address,
    /// Read-only quoter used for simulations.
    pub quoter: Address,
    pub pool: PoolConfig,
    #[serde(default)]
    pub native_settlement: NativeSettlement,
    #[serde(default = "default_validity_window")]
    pub validity_window_secs: u64,
    pub tokens: Vec<Token>,
}

fn default_validity_window() -> u64 {
    DEFAULT_VALIDITY_WINDOW_SECS
}

impl SwapConfig {
    /// Built-in Sepolia deployment.
    pub fn sepolia() -> Self {
        Self {
            chain_id: 11155111,
            router: address!("3a9d48ab9751398bbfa63ad67599bb04e4bdf98b"),
            permit2: address!("000000000022D473030F116dDEE9F6B43aC78BA3"),
            quoter: address!("61B3f2011A92d183C7dbaDBdA940a7555Ccf9227"),
            pool: PoolConfig { fee: 10_000, tick_spacing: 200, hooks: Address::ZERO },
            native_settlement: NativeSettlement::Direct,
            validity_window_secs: DEFAULT_VALIDITY_WINDOW_SECS,
            tokens: vec![
                Token::new("ETH", NATIVE_CURRENCY, 18),
                Token::new("USDT", address!("bAce3798896B6e8dcBBe26B7A698150c98ba67d0"), 18),
            ],
        }
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SwapConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.fee > MAX_LP_FEE {
            return Err(ConfigError::Invalid(format!(
                "pool fee {} exceeds {MAX_LP_FEE}",
                self.pool.fee
            )));
        }
        if self.pool.tick_spacing <= 0 || self.pool.tick_spacing >= MAX_TICK_SPACING {
            return Err(ConfigError::Invalid(format!(
                "tick spacing {} out of range",
                self.pool.tick_spacing
            )));
        }
        for (name, address) in
            [("router", self.router), ("permit2", self.permit2), ("quoter", self.quoter)]
        {
            if address.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} address is zero")));
            }
        }
        if let Some(wrapped) = self.native_settlement.wrapped_native() {
            if wrapped.is_zero() {
                return Err(ConfigError::Invalid("wrapped native address is zero".to_string()));
            }
        }
        let mut seen = HashSet::new();
        for token in &self.tokens {
            if !seen.insert(token.symbol.to_uppercase()) {
                return Err(ConfigError::Invalid(format!("duplicate token {}", token.symbol)));
            }
            if token.decimals > MAX_TOKEN_DECIMALS {
                return Err(ConfigError::Invalid(format!(
                    "token {} has {} decimals, at most {MAX_TOKEN_DECIMALS} are supported",
                    token.symbol, token.decimals
                )));
            }
        }
        Ok(())
    }

    /// Looks up a token by symbol, case-insensitively.
    pub fn token(&self, symbol: &str) -> Result<&Token, ConfigError> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| ConfigError::UnknownToken(symbol.to_string()))
    }

    /// The currency the pool holds for `token`: the wrapped-native token stands in for the native
    /// asset under wrapped settlement.
    pub fn pool_currency(&self, token: Address) -> Address {
        match self.native_settlement.wrapped_native() {
            Some(wrapped) if token == NATIVE_CURRENCY => wrapped,
            _ => token,
        }
    }

    /// Builds the key of the configured pool for a trade and reports its direction.
    ///
    /// Quoting and execution both derive their pool key here.
    pub fn pool_key(&self, token_in: Address, token_out: Address) -> (PoolKey, bool) {
        let (currencies, zero_for_one) =
            resolve(self.pool_currency(token_in), self.pool_currency(token_out));
        let key =
            PoolKey::new(currencies, self.pool.fee, self.pool.tick_spacing, self.pool.hooks);
        (key, zero_for_one)
    }
}
