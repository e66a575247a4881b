//! Sign-and-submit loop with bounded backoff

use std::sync::Arc;
use tokio::time::sleep;
use tracing::debug;

use super::access_key::AccessKeyResolver;
use super::retry::{RetryDecision, RetryPolicy};
use super::tx_signer::TransactionSigner;
use crate::errors::{ErrorContext, SenderError, SenderResult};
use crate::metrics::metrics;
use crate::provider::Provider;
use crate::structured_logging::DiagnosticLogger;
use crate::types::{Action, CryptoHash, FinalExecutionOutcome, SignedTransaction};

/// Accepted submission
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub transaction_hash: CryptoHash,
    /// Transaction from the attempt the node accepted
    pub signed_transaction: SignedTransaction,
    pub outcome: FinalExecutionOutcome,
    /// Attempts used, including the accepted one
    pub attempts: u32,
}

/// Re-signs and submits until the node accepts the transaction, reports a
/// fatal error, or the attempt budget runs out.
///
/// Every attempt signs a new transaction with a fresh nonce and reference
/// block. `InvalidNonce` also drops the cached access key so the next attempt
/// re-reads the nonce from the node; `Expired` keeps it.
pub struct RetryingBroadcaster {
    tx_signer: Arc<TransactionSigner>,
    resolver: Arc<AccessKeyResolver>,
    provider: Arc<dyn Provider>,
    policy: RetryPolicy,
    diagnostics: DiagnosticLogger,
}

impl RetryingBroadcaster {
    pub fn new(
        tx_signer: Arc<TransactionSigner>,
        resolver: Arc<AccessKeyResolver>,
        provider: Arc<dyn Provider>,
        policy: RetryPolicy,
        diagnostics: DiagnosticLogger,
    ) -> Self {
        Self {
            tx_signer,
            resolver,
            provider,
            policy,
            diagnostics,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn broadcast(&self, receiver_id: &str, actions: &[Action]) -> SenderResult<Broadcast> {
        let max_attempts = self.policy.max_attempts;
        let mut last_hash = String::new();

        for attempt in 1..=max_attempts {
            let signed = match self.tx_signer.sign(receiver_id, actions.to_vec()).await {
                Ok(signed) => signed,
                Err(err) => {
                    metrics().broadcast_failed.inc();
                    debug!(
                        receiver_id = %receiver_id,
                        attempt = attempt,
                        error_type = %err.error_type(),
                        "Signing failed"
                    );
                    return Err(err);
                }
            };
            let hash = signed.hash.to_string();

            debug!(
                receiver_id = %receiver_id,
                attempt = attempt,
                max_attempts = max_attempts,
                nonce = signed.signed.transaction.nonce,
                transaction_hash = %hash,
                "Submitting transaction"
            );
            metrics().broadcast_attempts.inc();

            let err = match self.provider.send_transaction(&signed.signed).await {
                Ok(outcome) => {
                    metrics().broadcast_success.inc();
                    return Ok(Broadcast {
                        transaction_hash: signed.hash,
                        signed_transaction: signed.signed,
                        outcome,
                        attempts: attempt,
                    });
                }
                Err(err) => err,
            };

            match RetryDecision::classify(&err) {
                RetryDecision::EvictAndRetry => {
                    metrics().retries_invalid_nonce.inc();
                    self.diagnostics
                        .warn_retry(&hash, attempt, err.error_type(), &err.to_string());
                    self.resolver.evict(&signed.public_key);
                }
                RetryDecision::Retry => {
                    metrics().retries_expired.inc();
                    self.diagnostics
                        .warn_retry(&hash, attempt, err.error_type(), &err.to_string());
                }
                RetryDecision::Abort => {
                    metrics().broadcast_failed.inc();
                    self.diagnostics
                        .warn_failure(&hash, err.error_type(), &err.to_string());
                    return Err(err.with_context(ErrorContext::new(hash)));
                }
            }

            last_hash = hash;
            if attempt < max_attempts {
                let wait = self.policy.wait_after(attempt - 1);
                debug!(attempt = attempt, wait_ms = wait.as_millis() as u64, "Backing off");
                sleep(wait).await;
            }
        }

        metrics().retries_exhausted.inc();
        Err(SenderError::RetriesExceeded {
            attempts: max_attempts,
            transaction_hash: last_hash,
        })
    }
}
