pub mod abi;
pub mod balances;
pub mod erc20;
pub mod orchestrator;
pub mod permit2;
pub mod quoter;
pub mod revert;
pub mod router;
pub mod rpc;
pub mod wallet;

#[cfg(test)]
pub mod test_fixtures;

pub use orchestrator::{SwapHandle, SwapOrchestrator};
pub use rpc::{errors::RPCError, EthereumRpcClient};
pub use wallet::{LocalWallet, WalletError};
