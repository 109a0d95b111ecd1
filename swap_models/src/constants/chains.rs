use error_stack::{Report, report};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::error::Error;

pub const NATIVE_TOKEN_EVM_ADDRESS: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
pub const EVM_NULL_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub const NATIVE_TOKEN_EVM_ADDRESSES: [&str; 2] = [NATIVE_TOKEN_EVM_ADDRESS, EVM_NULL_ADDRESS];

pub fn is_native_token_evm_address(address: &str) -> bool {
    NATIVE_TOKEN_EVM_ADDRESSES.contains(&address.to_lowercase().as_str())
}

/// 0x Exchange Proxy, the spender that must hold the ERC-20 allowance.
/// Deployed at the same address on Ethereum and Polygon.
pub const ZERO_X_EXCHANGE_PROXY: &str = "0xDef1C0ded9bec7F1a1670819833240f027b25EfF";

/// Checks the `0x` + 40 hex digits shape, case-insensitive.
pub fn is_evm_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, EnumIter, Hash)]
#[repr(u32)]
pub enum ChainId {
    Ethereum = 1,
    Polygon = 137,
    PolygonZkEvmCardona = 2442,
}

impl ChainId {
    pub fn supported_chains() -> Vec<ChainId> {
        ChainId::iter().collect()
    }

    pub fn native_symbol(&self) -> &'static str {
        match self {
            ChainId::Ethereum | ChainId::PolygonZkEvmCardona => "ETH",
            ChainId::Polygon => "MATIC",
        }
    }

    /// Spender the user approves before a swap on this chain.
    pub fn exchange_proxy(&self) -> &'static str {
        ZERO_X_EXCHANGE_PROXY
    }

    /// Chain-specific 0x API host. Cardona has no 0x deployment, so it
    /// falls back to the Polygon host.
    pub fn zero_x_api_url(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "https://api.0x.org",
            ChainId::Polygon | ChainId::PolygonZkEvmCardona => "https://polygon.api.0x.org",
        }
    }

    pub fn alchemy_rpc_url(&self, api_key: &str) -> String {
        let network = match self {
            ChainId::Ethereum => "eth-mainnet",
            ChainId::Polygon => "polygon-mainnet",
            ChainId::PolygonZkEvmCardona => "polygonzkevm-cardona",
        };
        format!("https://{network}.g.alchemy.com/v2/{api_key}")
    }

    pub fn explorer_url(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "https://etherscan.io",
            ChainId::Polygon => "https://polygonscan.com",
            ChainId::PolygonZkEvmCardona => "https://cardona-zkevm.polygonscan.com",
        }
    }

    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url())
    }

    pub fn is_native_token(self, address: &str) -> bool {
        is_native_token_evm_address(address)
    }
}

impl TryFrom<u32> for ChainId {
    type Error = Report<Error>;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        serde_json::from_str(&value.to_string()).map_err(|e| {
            Report::new(Error::ParseError)
                .attach_printable(format!("Failed to parse chain ID: {e}"))
        })
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ethereum => write!(f, "Ethereum"),
            Self::Polygon => write!(f, "Polygon"),
            Self::PolygonZkEvmCardona => write!(f, "Polygon zkEVM Cardona"),
        }
    }
}

impl TryFrom<&str> for ChainId {
    type Error = Report<Error>;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Ethereum" | "1" => Ok(Self::Ethereum),
            "Polygon" | "137" => Ok(Self::Polygon),
            "PolygonZkEvmCardona" | "Polygon zkEVM Cardona" | "2442" => {
                Ok(Self::PolygonZkEvmCardona)
            }
            _ => Err(report!(Error::ChainError(format!(
                "Invalid chain name: {value}"
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_display() {
        assert_eq!(ChainId::Ethereum.to_string(), "Ethereum");
        assert_eq!(ChainId::Polygon.to_string(), "Polygon");
        assert_eq!(
            ChainId::PolygonZkEvmCardona.to_string(),
            "Polygon zkEVM Cardona"
        );
    }

    #[test]
    fn test_is_native_token_evm_address() {
        assert!(is_native_token_evm_address(
            "0xEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEE"
        ));
        assert!(is_native_token_evm_address(EVM_NULL_ADDRESS));
        assert!(!is_native_token_evm_address(
            "0x1111111111111111111111111111111111111111"
        ));
        assert!(!is_native_token_evm_address(""));
    }

    #[test]
    fn test_is_evm_address() {
        assert!(is_evm_address(ZERO_X_EXCHANGE_PROXY));
        assert!(is_evm_address("0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270"));
        assert!(!is_evm_address("0x0d500b1d8e8ef31e21c99d1db9a6444d3adf127"));
        assert!(!is_evm_address("0d500b1d8e8ef31e21c99d1db9a6444d3adf1270"));
        assert!(!is_evm_address("0xzz500b1d8e8ef31e21c99d1db9a6444d3adf1270"));
    }

    #[test]
    fn test_from_u32() {
        assert_eq!(ChainId::try_from(1).expect("Should work"), ChainId::Ethereum);
        assert_eq!(ChainId::try_from(137).expect("Should work"), ChainId::Polygon);
        assert_eq!(
            ChainId::try_from(2442).expect("Should work"),
            ChainId::PolygonZkEvmCardona
        );
        assert!(ChainId::try_from(9999).is_err());
    }

    #[test]
    fn test_from_str() {
        assert_eq!(ChainId::try_from("137").unwrap(), ChainId::Polygon);
        assert_eq!(ChainId::try_from("Polygon").unwrap(), ChainId::Polygon);
        assert!(ChainId::try_from("Solana").is_err());
    }

    #[test]
    fn test_rpc_and_explorer_urls() {
        assert_eq!(
            ChainId::Polygon.alchemy_rpc_url("key"),
            "https://polygon-mainnet.g.alchemy.com/v2/key"
        );
        assert_eq!(
            ChainId::Polygon.explorer_tx_url("0xabc"),
            "https://polygonscan.com/tx/0xabc"
        );
        assert_eq!(ChainId::Polygon.native_symbol(), "MATIC");
        assert_eq!(ChainId::supported_chains().len(), 3);
    }
}
