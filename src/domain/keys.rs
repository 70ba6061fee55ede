use std::fmt;
use thiserror::Error;

pub const PUBLIC_KEY_LEN: usize = 32;
pub const PRIVATE_KEY_LEN: usize = 64;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum KeyParseError {
    #[error("key is empty")]
    Empty,

    #[error("invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn from_base58(value: &str) -> Result<Self, KeyParseError> {
        let bytes = decode(value)?;
        let bytes: [u8; PUBLIC_KEY_LEN] =
            bytes
                .try_into()
                .map_err(|bytes: Vec<u8>| KeyParseError::Length {
                    expected: PUBLIC_KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(bytes))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base58())
    }
}

/// A 64-byte ed25519 keypair in the wallet export format (secret || public).
#[derive(Clone, Eq, PartialEq)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    pub fn from_base58(value: &str) -> Result<Self, KeyParseError> {
        let bytes = decode(value)?;
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(KeyParseError::Length {
                expected: PRIVATE_KEY_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn public_key(&self) -> PublicKey {
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes.copy_from_slice(&self.0[PRIVATE_KEY_LEN - PUBLIC_KEY_LEN..]);
        PublicKey(bytes)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

fn decode(value: &str) -> Result<Vec<u8>, KeyParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(KeyParseError::Empty);
    }
    Ok(bs58::decode(trimmed).into_vec()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_accepts_32_byte_base58() {
        let encoded = bs58::encode([7u8; 32]).into_string();
        let key = PublicKey::from_base58(&encoded).expect("valid key");
        assert_eq!(key.to_base58(), encoded);
    }

    #[test]
    fn public_key_rejects_wrong_length_and_bad_alphabet() {
        let short = bs58::encode([1u8; 16]).into_string();
        assert_eq!(
            PublicKey::from_base58(&short),
            Err(KeyParseError::Length {
                expected: 32,
                actual: 16
            })
        );
        assert!(matches!(
            PublicKey::from_base58("0OIl"),
            Err(KeyParseError::Base58(_))
        ));
        assert_eq!(PublicKey::from_base58("   "), Err(KeyParseError::Empty));
    }

    #[test]
    fn private_key_exposes_trailing_public_half_and_redacts_debug() {
        let mut raw = [0u8; 64];
        raw[32..].copy_from_slice(&[9u8; 32]);
        let key = PrivateKey::from_base58(&bs58::encode(raw).into_string()).expect("valid key");
        assert_eq!(key.public_key(), PublicKey([9u8; 32]));
        assert_eq!(format!("{key:?}"), "PrivateKey(<redacted>)");
    }
}
