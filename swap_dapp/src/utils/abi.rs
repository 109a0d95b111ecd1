//! Minimal ABI encoding for the ERC-20 calls the swap flow makes.

use crate::error::{Error, DappResult};
use error_stack::{ResultExt, report};
use swap_models::{
    constants::chains::is_evm_address,
    uint::{U256, parse_u256},
};
use tiny_keccak::{Hasher, Keccak};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Left-pads a 20-byte address into a 32-byte word (hex, no prefix).
pub fn encode_address(address: &str) -> DappResult<String> {
    if !is_evm_address(address) {
        return Err(report!(Error::ParseError)
            .attach_printable(format!("Invalid address {address}")));
    }
    Ok(format!("{:0>64}", address[2..].to_lowercase()))
}

pub fn encode_uint256(value: U256) -> String {
    format!("{:0>64}", format!("{value:x}"))
}

fn call_data(signature: &str, words: &[String]) -> String {
    let mut data = format!("0x{}", hex::encode(function_selector(signature)));
    for word in words {
        data.push_str(word);
    }
    data
}

pub fn approve_calldata(spender: &str, amount: U256) -> DappResult<String> {
    Ok(call_data(
        "approve(address,uint256)",
        &[encode_address(spender)?, encode_uint256(amount)],
    ))
}

pub fn allowance_calldata(owner: &str, spender: &str) -> DappResult<String> {
    Ok(call_data(
        "allowance(address,address)",
        &[encode_address(owner)?, encode_address(spender)?],
    ))
}

pub fn balance_of_calldata(owner: &str) -> DappResult<String> {
    Ok(call_data("balanceOf(address)", &[encode_address(owner)?]))
}

/// Decodes a single `uint256` return value (`0x`-prefixed, 32 bytes).
/// An empty `0x` result decodes as zero.
pub fn decode_uint256(result: &str) -> DappResult<U256> {
    let digits = result.strip_prefix("0x").unwrap_or(result);
    if digits.len() > 64 {
        return Err(report!(Error::ParseError)
            .attach_printable(format!("Return data longer than one word: {result}")));
    }
    parse_u256(&format!("0x{digits}")).change_context(Error::ParseError)
}

/// EIP-55 mixed-case checksum encoding.
pub fn to_checksum_address(address: &str) -> DappResult<String> {
    if !is_evm_address(address) {
        return Err(report!(Error::ParseError)
            .attach_printable(format!("Invalid address {address}")));
    }
    let lower = address[2..].to_lowercase();
    let hash = keccak256(lower.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }
    Ok(checksummed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "0x9ecdc9af2a8254dde8bbce8778efae695044cc9f";
    const PROXY: &str = "0xDef1C0ded9bec7F1a1670819833240f027b25EfF";

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(function_selector("approve(address,uint256)")), "095ea7b3");
        assert_eq!(hex::encode(function_selector("allowance(address,address)")), "dd62ed3e");
        assert_eq!(hex::encode(function_selector("balanceOf(address)")), "70a08231");
    }

    #[test]
    fn test_approve_calldata() {
        let data = approve_calldata(PROXY, U256::from(5u64)).unwrap();
        assert_eq!(data.len(), 2 + 8 + 64 * 2);
        assert!(data.starts_with("0x095ea7b3000000000000000000000000def1c0ded9bec7f1a1670819833240f027b25eff"));
        assert!(data.ends_with("0000000000000000000000000000000000000000000000000000000000000005"));
    }

    #[test]
    fn test_allowance_calldata_orders_owner_then_spender() {
        let data = allowance_calldata(OWNER, PROXY).unwrap();
        assert_eq!(&data[..10], "0xdd62ed3e");
        assert_eq!(&data[10 + 24..10 + 64], &OWNER[2..]);
        assert_eq!(&data[74 + 24..], "def1c0ded9bec7f1a1670819833240f027b25eff");
    }

    #[test]
    fn test_encode_rejects_bad_address() {
        assert!(balance_of_calldata("0x1234").is_err());
    }

    #[test]
    fn test_encode_uint256_pads_to_word() {
        assert_eq!(encode_uint256(U256::zero()), "0".repeat(64));
        assert_eq!(encode_uint256(U256::MAX), "f".repeat(64));
    }

    #[test]
    fn test_decode_uint256() {
        let word = format!("0x{}", encode_uint256(U256::from(9_950_000u64)));
        assert_eq!(decode_uint256(&word).unwrap(), U256::from(9_950_000u64));
        assert_eq!(decode_uint256("0x").unwrap(), U256::zero());
        assert!(decode_uint256(&format!("0x{}", "0".repeat(65))).is_err());
    }

    #[test]
    fn test_checksum_address() {
        assert_eq!(
            to_checksum_address("0xdef1c0ded9bec7f1a1670819833240f027b25eff").unwrap(),
            PROXY
        );
        assert_eq!(
            to_checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }
}
