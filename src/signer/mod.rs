//! Signer abstraction
//!
//! A [`Signer`] holds key material per (network, account) and signs opaque
//! messages. [`sign_transaction`] turns a transaction's parts into a
//! [`SignedTransaction`] using whichever signer is plugged in.

mod in_memory;

pub use in_memory::InMemorySigner;

use async_trait::async_trait;

use crate::errors::{SenderError, SenderResult};
use crate::metrics::metrics;
use crate::types::{Action, CryptoHash, PublicKey, Signature, SignedTransaction, Transaction};

/// Async signer trait for signing transactions
#[async_trait]
pub trait Signer: Send + Sync {
    /// Public key held for `account_id` on `network_id`, if any
    async fn get_public_key(
        &self,
        account_id: &str,
        network_id: &str,
    ) -> SenderResult<Option<PublicKey>>;

    /// Sign the SHA-256 digest of `message`
    async fn sign_message(
        &self,
        message: &[u8],
        account_id: &str,
        network_id: &str,
    ) -> SenderResult<Signature>;
}

/// Build, hash and sign a transaction.
///
/// Returns the transaction hash alongside the signed transaction. Fails with
/// [`SenderError::KeyNotFound`] when the signer has no key for the account.
pub async fn sign_transaction(
    receiver_id: &str,
    nonce: u64,
    actions: Vec<Action>,
    block_hash: CryptoHash,
    signer: &dyn Signer,
    account_id: &str,
    network_id: &str,
) -> SenderResult<(CryptoHash, SignedTransaction)> {
    let public_key = signer
        .get_public_key(account_id, network_id)
        .await?
        .ok_or_else(|| SenderError::KeyNotFound {
            account_id: account_id.to_string(),
            network_id: network_id.to_string(),
        })?;

    let transaction = Transaction {
        signer_id: account_id.to_string(),
        public_key,
        nonce,
        receiver_id: receiver_id.to_string(),
        block_hash,
        actions,
    };

    let message = transaction.to_bytes()?;
    let hash = CryptoHash::hash_bytes(&message);
    let signature = signer.sign_message(&message, account_id, network_id).await?;

    metrics().transactions_signed.inc();
    Ok((hash, SignedTransaction::new(transaction, signature)))
}
