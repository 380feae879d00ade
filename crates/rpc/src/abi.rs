//! Contract interfaces for the view calls the portfolio needs.
//!
//! Encoding and decoding go through `alloy-sol-types`; return data from a
//! node is bounds-checked and malformed payloads surface as
//! [`RpcError::Malformed`].

use crate::error::{RpcError, RpcResult};
use alloy_primitives::Address;
use alloy_sol_types::{sol, SolCall};

sol! {
    /// ERC-20 metadata and balances.
    interface IERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
    }

    /// ERC-4626 share conversion.
    interface IERC4626 {
        function convertToAssets(uint256 shares) external view returns (uint256);
    }

    /// Compound v3 market (Comet).
    interface IComet {
        struct AssetInfo {
            uint8 offset;
            address asset;
            address priceFeed;
            uint64 scale;
            uint64 borrowCollateralFactor;
            uint64 liquidateCollateralFactor;
            uint64 liquidationFactor;
            uint128 supplyCap;
        }

        function baseToken() external view returns (address);
        function baseScale() external view returns (uint64);
        function balanceOf(address account) external view returns (uint256);
        function borrowBalanceOf(address account) external view returns (uint256);
        function numAssets() external view returns (uint8);
        function getAssetInfo(uint8 i) external view returns (AssetInfo memory);
        function collateralBalanceOf(address account, address asset) external view returns (uint128);
    }
}

/// Parse a `0x`-prefixed 20-byte hex address.
pub fn parse_address(address: &str) -> RpcResult<Address> {
    let trimmed = address.trim();
    if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
        return Err(RpcError::InvalidArgument(format!("not an Ethereum address: {}", address)));
    }
    trimmed
        .parse::<Address>()
        .map_err(|e| RpcError::InvalidArgument(format!("not an Ethereum address: {}: {}", address, e)))
}

/// Decode the return data of `C`.
pub fn decode_returns<C: SolCall>(data: &[u8]) -> RpcResult<C::Return> {
    C::abi_decode_returns(data)
        .map_err(|e| RpcError::Malformed(format!("{} return data: {}", C::SIGNATURE, e)))
}

/// Decode a `symbol()` return, accepting the `bytes32` form older tokens use.
pub fn decode_symbol(data: &[u8]) -> RpcResult<String> {
    match decode_returns::<IERC20::symbolCall>(data) {
        Ok(symbol) => Ok(symbol),
        Err(_) if data.len() == 32 => {
            let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
            String::from_utf8(data[..end].to_vec())
                .map_err(|e| RpcError::Malformed(format!("bytes32 symbol: {}", e)))
        }
        Err(e) => Err(e),
    }
}
