//! Builds and signs one transaction from fresh ledger state

use std::sync::Arc;
use tracing::debug;

use super::access_key::{next_nonce, AccessKeyResolver};
use crate::errors::{SenderError, SenderResult};
use crate::provider::{BlockReference, Provider};
use crate::signer::{sign_transaction, Signer};
use crate::types::{Action, CryptoHash, PublicKey, SignedTransaction};

/// Output of one signing round
#[derive(Debug, Clone)]
pub struct SignedAttempt {
    pub hash: CryptoHash,
    pub signed: SignedTransaction,
    /// Key the transaction was signed with, for eviction on `InvalidNonce`
    pub public_key: PublicKey,
}

/// Signs transactions for one account on one network
pub struct TransactionSigner {
    resolver: Arc<AccessKeyResolver>,
    provider: Arc<dyn Provider>,
    signer: Arc<dyn Signer>,
    account_id: String,
    network_id: String,
}

impl TransactionSigner {
    pub fn new(
        resolver: Arc<AccessKeyResolver>,
        provider: Arc<dyn Provider>,
        signer: Arc<dyn Signer>,
        account_id: impl Into<String>,
        network_id: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            provider,
            signer,
            account_id: account_id.into(),
            network_id: network_id.into(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    fn key_not_found(&self) -> SenderError {
        SenderError::KeyNotFound {
            account_id: self.account_id.clone(),
            network_id: self.network_id.clone(),
        }
    }

    /// Sign `actions` for `receiver_id` with the next nonce of the cached key
    /// and the latest final block as reference.
    pub async fn sign(&self, receiver_id: &str, actions: Vec<Action>) -> SenderResult<SignedAttempt> {
        let resolved = self
            .resolver
            .resolve(&self.account_id, &self.network_id)
            .await?
            .ok_or_else(|| self.key_not_found())?;

        let block = self.provider.block(&BlockReference::latest_final()).await?;
        let block_hash = block.header.hash;

        // The entry can vanish between resolve and here if a concurrent send evicted it
        let nonce = match self.resolver.cache().advance_nonce(&resolved.public_key)? {
            Some(nonce) => nonce,
            None => next_nonce(&resolved.public_key, resolved.access_key.nonce)?,
        };

        let (hash, signed) = sign_transaction(
            receiver_id,
            nonce,
            actions,
            block_hash,
            self.signer.as_ref(),
            &self.account_id,
            &self.network_id,
        )
        .await?;

        debug!(
            account_id = %self.account_id,
            receiver_id = %receiver_id,
            nonce = nonce,
            block_height = block.header.height,
            transaction_hash = %hash,
            "Signed transaction"
        );

        Ok(SignedAttempt {
            hash,
            signed,
            public_key: resolved.public_key,
        })
    }
}
