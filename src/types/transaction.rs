//! Unsigned and signed transactions

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use borsh::{BorshDeserialize, BorshSerialize};

use super::action::Action;
use super::crypto::{CryptoHash, PublicKey, Signature};
use crate::errors::{SenderError, SenderResult};

/// Transaction ready to be hashed and signed
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    /// Reference block; the transaction expires once this block is pruned
    pub block_hash: CryptoHash,
    pub actions: Vec<Action>,
}

impl Transaction {
    pub fn to_bytes(&self) -> SenderResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|e| SenderError::Serialization(e.to_string()))
    }

    /// SHA-256 of the borsh encoding; this is what gets signed
    pub fn get_hash(&self) -> SenderResult<CryptoHash> {
        Ok(CryptoHash::hash_bytes(&self.to_bytes()?))
    }
}

/// Ledger-ready transaction. Never reused across broadcast attempts.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction, signature: Signature) -> Self {
        Self {
            transaction,
            signature,
        }
    }

    pub fn hash(&self) -> SenderResult<CryptoHash> {
        self.transaction.get_hash()
    }

    pub fn to_bytes(&self) -> SenderResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|e| SenderError::Serialization(e.to_string()))
    }

    /// Wire form for `broadcast_tx_commit`
    pub fn to_base64(&self) -> SenderResult<String> {
        Ok(BASE64.encode(self.to_bytes()?))
    }

    pub fn from_base64(encoded: &str) -> SenderResult<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| SenderError::Serialization(format!("invalid base64: {}", e)))?;
        Self::try_from_slice(&bytes).map_err(|e| SenderError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            signer_id: "alice.testnet".to_string(),
            public_key: PublicKey([2u8; 32]),
            nonce: 42,
            receiver_id: "bob.testnet".to_string(),
            block_hash: CryptoHash([3u8; 32]),
            actions: vec![Action::transfer(10)],
        }
    }

    #[test]
    fn test_hash_changes_with_nonce() {
        let tx = sample();
        let mut bumped = tx.clone();
        bumped.nonce += 1;
        assert_ne!(tx.get_hash().unwrap(), bumped.get_hash().unwrap());
    }

    #[test]
    fn test_borsh_field_order() {
        let bytes = sample().to_bytes().unwrap();
        // signer_id: u32 len + "alice.testnet"
        assert_eq!(&bytes[0..4], &13u32.to_le_bytes());
        assert_eq!(&bytes[4..17], b"alice.testnet");
        // public key: type byte + 32 bytes, then nonce
        assert_eq!(bytes[17], 0);
        assert_eq!(&bytes[50..58], &42u64.to_le_bytes());
    }

    #[test]
    fn test_signed_transaction_wire_form_decodes() {
        let signed = SignedTransaction::new(sample(), Signature([5u8; 64]));
        let encoded = signed.to_base64().unwrap();
        let decoded = SignedTransaction::from_base64(&encoded).unwrap();
        assert_eq!(decoded.transaction.nonce, 42);
        assert_eq!(decoded.signature, signed.signature);
    }
}
