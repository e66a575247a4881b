//! In-process ed25519 key store

use async_trait::async_trait;
use dashmap::DashMap;
use ed25519_dalek::{Signer as _, SigningKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use super::Signer;
use crate::errors::{SenderError, SenderResult};
use crate::types::crypto::ED25519_PREFIX;
use crate::types::{PublicKey, Signature};

/// Signer holding ed25519 keys in memory, keyed by (network, account)
#[derive(Default)]
pub struct InMemorySigner {
    keys: DashMap<(String, String), SigningKey>,
}

impl InMemorySigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signer holding one key given as `ed25519:<base58>`
    pub fn from_secret_key(network_id: &str, account_id: &str, secret_key: &str) -> SenderResult<Self> {
        let signer = Self::new();
        signer.add_secret_key(network_id, account_id, secret_key)?;
        Ok(signer)
    }

    pub fn add_secret_key(&self, network_id: &str, account_id: &str, secret_key: &str) -> SenderResult<()> {
        let key = Self::parse_secret_key(secret_key)?;
        self.set_key(network_id, account_id, key);
        Ok(())
    }

    pub fn set_key(&self, network_id: &str, account_id: &str, key: SigningKey) {
        self.keys
            .insert((network_id.to_string(), account_id.to_string()), key);
    }

    /// Create and store a fresh key, returning its public half
    pub fn generate_key(&self, network_id: &str, account_id: &str) -> PublicKey {
        let key = SigningKey::generate(&mut OsRng);
        let public_key = PublicKey(key.verifying_key().to_bytes());
        self.set_key(network_id, account_id, key);
        public_key
    }

    /// Accepts a 64-byte keypair or a 32-byte seed, with or without the `ed25519:` prefix
    pub fn parse_secret_key(text: &str) -> SenderResult<SigningKey> {
        let data = match text.trim().split_once(':') {
            Some((ED25519_PREFIX, data)) => data,
            Some((other, _)) => {
                return Err(SenderError::Signing(format!("unsupported key type: {}", other)))
            }
            None => text.trim(),
        };
        let bytes = bs58::decode(data)
            .into_vec()
            .map_err(|e| SenderError::Signing(format!("invalid base58 secret key: {}", e)))?;

        match bytes.len() {
            64 => {
                let mut keypair = [0u8; 64];
                keypair.copy_from_slice(&bytes);
                SigningKey::from_keypair_bytes(&keypair)
                    .map_err(|e| SenderError::Signing(format!("invalid keypair: {}", e)))
            }
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                Ok(SigningKey::from_bytes(&seed))
            }
            other => Err(SenderError::Signing(format!(
                "invalid secret key length: expected 32 or 64 bytes, got {}",
                other
            ))),
        }
    }

    /// `ed25519:<base58 keypair>` form of a key
    pub fn secret_key_to_string(key: &SigningKey) -> String {
        format!(
            "{}:{}",
            ED25519_PREFIX,
            bs58::encode(key.to_keypair_bytes()).into_string()
        )
    }

    fn key_for(&self, account_id: &str, network_id: &str) -> Option<SigningKey> {
        self.keys
            .get(&(network_id.to_string(), account_id.to_string()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl Signer for InMemorySigner {
    async fn get_public_key(
        &self,
        account_id: &str,
        network_id: &str,
    ) -> SenderResult<Option<PublicKey>> {
        Ok(self
            .key_for(account_id, network_id)
            .map(|key| PublicKey(key.verifying_key().to_bytes())))
    }

    async fn sign_message(
        &self,
        message: &[u8],
        account_id: &str,
        network_id: &str,
    ) -> SenderResult<Signature> {
        let key = self
            .key_for(account_id, network_id)
            .ok_or_else(|| SenderError::KeyNotFound {
                account_id: account_id.to_string(),
                network_id: network_id.to_string(),
            })?;
        let digest = Sha256::digest(message);
        Ok(Signature(key.sign(digest.as_slice()).to_bytes()))
    }
}
