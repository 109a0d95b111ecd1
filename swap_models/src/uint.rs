use crate::error::{Error, ModelResult};
use error_stack::report;
use serde::{Deserialize, Deserializer, Serializer};
use uint::construct_uint;

construct_uint! {
    pub struct U256(4);
}

/// `type(uint256).max`, the "unlimited" ERC-20 allowance.
pub const MAX_ALLOWANCE: U256 = U256::MAX;

/// Parses a decimal string or a `0x`-prefixed hex string.
pub fn parse_u256(text: &str) -> ModelResult<U256> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if hex.is_empty() {
            return Ok(U256::zero());
        }
        return U256::from_str_radix(hex, 16).map_err(|e| {
            report!(Error::ParseError).attach_printable(format!("Invalid hex quantity {text}: {e:?}"))
        });
    }
    U256::from_dec_str(text).map_err(|e| {
        report!(Error::ParseError).attach_printable(format!("Invalid decimal quantity {text}: {e:?}"))
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuantity {
    Text(String),
    Number(u64),
}

/// Serde adapter for amounts the 0x API encodes as decimal strings.
pub mod dec_str {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match RawQuantity::deserialize(deserializer)? {
            RawQuantity::Text(text) => parse_u256(&text).map_err(serde::de::Error::custom),
            RawQuantity::Number(n) => Ok(U256::from(n)),
        }
    }
}

pub mod opt_dec_str {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        match Option::<RawQuantity>::deserialize(deserializer)? {
            Some(RawQuantity::Text(text)) => parse_u256(&text)
                .map(Some)
                .map_err(serde::de::Error::custom),
            Some(RawQuantity::Number(n)) => Ok(Some(U256::from(n))),
            None => Ok(None),
        }
    }
}
