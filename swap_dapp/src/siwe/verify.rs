use chrono::{DateTime, Utc};
use error_stack::{Report, ResultExt as _, report};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::{error::Error, siwe::message::SiweMessage, utils::abi::keccak256};

/// EIP-191 `personal_sign` digest of `message`.
pub fn personal_sign_hash(message: &[u8]) -> [u8; 32] {
    let mut data = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    data.extend_from_slice(message);
    keccak256(&data)
}

/// Lowercase `0x` address of an uncompressed secp256k1 key.
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Recovers the signer of a 65-byte `r || s || v` personal-sign signature.
pub fn recover_address(message: &str, signature: &str) -> Result<String, Report<Error>> {
    let bytes = hex::decode(signature.trim_start_matches("0x"))
        .change_context(Error::SiweVerification("Signature is not hex".to_string()))?;
    if bytes.len() != 65 {
        return Err(report!(Error::SiweVerification(format!(
            "Signature must be 65 bytes, got {}",
            bytes.len()
        ))));
    }

    let signature = Signature::from_slice(&bytes[..64])
        .change_context(Error::SiweVerification("Malformed signature".to_string()))?;
    let v = match bytes[64] {
        27 | 28 => bytes[64] - 27,
        v => v,
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or_else(|| {
        report!(Error::SiweVerification(format!(
            "Invalid recovery id {}",
            bytes[64]
        )))
    })?;

    let hash = personal_sign_hash(message.as_bytes());
    let key = VerifyingKey::recover_from_prehash(&hash, &signature, recovery_id)
        .change_context(Error::SiweVerification("Could not recover signer".to_string()))?;
    Ok(address_of(&key))
}

/// What the server expects of a sign-in message.
#[derive(Debug, Clone)]
pub struct Expectations<'a> {
    pub nonce: &'a str,
    /// Any domain is accepted when unset
    pub domain: Option<&'a str>,
    /// Any chain is accepted when unset
    pub chain_id: Option<u64>,
    pub now: DateTime<Utc>,
}

/// Parses and checks a signed sign-in message, returning it on success.
pub fn verify_message(
    raw_message: &str,
    signature: &str,
    expected: &Expectations,
) -> Result<SiweMessage, Report<Error>> {
    let message: SiweMessage = raw_message.parse()?;

    if message.nonce != expected.nonce {
        return Err(report!(Error::SiweVerification("Nonce mismatch".to_string())));
    }
    if let Some(domain) = expected.domain {
        if message.domain != domain {
            return Err(report!(Error::SiweVerification(format!(
                "Domain mismatch: {}",
                message.domain
            ))));
        }
    }
    if let Some(chain_id) = expected.chain_id {
        if message.chain_id != chain_id {
            return Err(report!(Error::SiweVerification(format!(
                "Chain ID mismatch: {}",
                message.chain_id
            ))));
        }
    }
    if !message.is_valid_at(expected.now) {
        return Err(report!(Error::SiweVerification(
            "Message is expired or not yet valid".to_string()
        )));
    }

    let signer = recover_address(raw_message, signature)?;
    if !signer.eq_ignore_ascii_case(&message.address) {
        return Err(report!(Error::SiweVerification(format!(
            "Signature is from {signer}"
        ))));
    }
    Ok(message)
}
