//! Keys, signatures and hashes in their text and borsh forms

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{Error as IoError, ErrorKind, Read, Write};
use std::str::FromStr;

use crate::errors::SenderError;

/// Text prefix of ed25519 keys and signatures
pub const ED25519_PREFIX: &str = "ed25519";

/// Borsh discriminant of the ed25519 key type
const ED25519_KEY_TYPE: u8 = 0;

fn decode_base58<const N: usize>(text: &str, what: &str) -> Result<[u8; N], SenderError> {
    let bytes = bs58::decode(text)
        .into_vec()
        .map_err(|e| SenderError::Serialization(format!("invalid base58 {}: {}", what, e)))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        SenderError::Serialization(format!(
            "invalid {} length: expected {} bytes, got {}",
            what,
            N,
            bytes.len()
        ))
    })
}

fn strip_key_type<'a>(text: &'a str, what: &str) -> Result<&'a str, SenderError> {
    match text.split_once(':') {
        Some((ED25519_PREFIX, data)) => Ok(data),
        Some((other, _)) => Err(SenderError::Serialization(format!(
            "unsupported {} type: {}",
            what, other
        ))),
        None => Ok(text),
    }
}

fn read_key_type<R: Read>(reader: &mut R) -> std::io::Result<()> {
    match u8::deserialize_reader(reader)? {
        ED25519_KEY_TYPE => Ok(()),
        other => Err(IoError::new(
            ErrorKind::InvalidData,
            format!("unsupported key type {}", other),
        )),
    }
}

// ============================================================================
// CryptoHash
// ============================================================================

/// 32-byte SHA-256 digest, rendered as base58
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, BorshSerialize, BorshDeserialize)]
pub struct CryptoHash(pub [u8; 32]);

impl CryptoHash {
    /// SHA-256 of `bytes`
    pub fn hash_bytes(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CryptoHash({})", self)
    }
}

impl FromStr for CryptoHash {
    type Err = SenderError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        decode_base58(text, "hash").map(Self)
    }
}

impl Serialize for CryptoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CryptoHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

// ============================================================================
// PublicKey
// ============================================================================

/// ed25519 public key, `ed25519:<base58>` in text form
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", ED25519_PREFIX, bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl FromStr for PublicKey {
    type Err = SenderError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let data = strip_key_type(text, "public key")?;
        decode_base58(data, "public key").map(Self)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

impl BorshSerialize for PublicKey {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&ED25519_KEY_TYPE, writer)?;
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for PublicKey {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        read_key_type(reader)?;
        Ok(Self(<[u8; 32]>::deserialize_reader(reader)?))
    }
}

// ============================================================================
// Signature
// ============================================================================

/// ed25519 signature over a transaction hash
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", ED25519_PREFIX, bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl FromStr for Signature {
    type Err = SenderError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let data = strip_key_type(text, "signature")?;
        decode_base58(data, "signature").map(Self)
    }
}

impl BorshSerialize for Signature {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&ED25519_KEY_TYPE, writer)?;
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for Signature {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        read_key_type(reader)?;
        Ok(Self(<[u8; 64]>::deserialize_reader(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_text_form() {
        let key = PublicKey([7u8; 32]);
        let text = key.to_string();
        assert!(text.starts_with("ed25519:"));
        assert_eq!(text.parse::<PublicKey>().unwrap(), key);

        // Bare base58 is accepted as ed25519
        let bare = bs58::encode([7u8; 32]).into_string();
        assert_eq!(bare.parse::<PublicKey>().unwrap(), key);
    }

    #[test]
    fn test_public_key_rejects_unknown_type() {
        let err = "secp256k1:abc".parse::<PublicKey>().unwrap_err();
        assert_eq!(err.error_type(), "SerializationError");
        assert!(err.to_string().contains("secp256k1"));
    }

    #[test]
    fn test_crypto_hash_rejects_wrong_length() {
        let short = bs58::encode([1u8; 16]).into_string();
        let err = short.parse::<CryptoHash>().unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes, got 16"));
    }

    #[test]
    fn test_public_key_borsh_layout() {
        let key = PublicKey([9u8; 32]);
        let bytes = borsh::to_vec(&key).unwrap();
        assert_eq!(bytes.len(), 33);
        assert_eq!(bytes[0], 0);
        assert_eq!(PublicKey::try_from_slice(&bytes).unwrap(), key);
    }

    #[test]
    fn test_hash_bytes_is_sha256() {
        // sha256("") = e3b0c442...
        let hash = CryptoHash::hash_bytes(b"");
        assert_eq!(hash.0[0], 0xe3);
        assert_eq!(hash.0[1], 0xb0);
        assert_eq!(hash.0[31], 0x55);
    }
}
