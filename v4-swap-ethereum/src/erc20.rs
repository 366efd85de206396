use alloy::{
    core::sol,
    primitives::{Address, U256},
    sol_types::SolCall,
};

// ERC20 interface definition, reduced to what the swap builder reads.
// See EIP-20: https://eips.ethereum.org/EIPS/eip-20
sol! {
    function balanceOf(address _owner) public view returns (uint256 balance);
}

/// Encode balanceOf(address) call
pub fn encode_balance_of(owner: Address) -> Vec<u8> {
    balanceOfCall { _owner: owner }.abi_encode()
}

/// Decode balanceOf(address) return value
pub fn decode_balance_of(data: &[u8]) -> Result<U256, alloy::sol_types::Error> {
    balanceOfCall::abi_decode_returns(data)
}
