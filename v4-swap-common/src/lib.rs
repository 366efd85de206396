pub mod config;
pub mod error;
pub mod models;
pub mod ordering;
pub mod traits;

pub use alloy_primitives::{Address, Bytes, B256, U256};
