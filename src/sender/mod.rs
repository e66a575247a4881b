//! Signing-and-broadcast engine
//!
//! [`TransactionSender`] wires the pieces together for one account:
//! - **access_key**: resolves and caches the access key of the signer's public key
//! - **tx_signer**: builds a transaction with the next nonce and a final block hash
//! - **broadcaster**: re-signs and resubmits on `InvalidNonce` / `Expired`
//! - **outcome**: logs receipts and turns failed statuses into errors
//!
//! Nonces are not coordinated across concurrent sends. Two sends on the same
//! access key may pick the same nonce, in which case one of them is rejected,
//! evicts the cached key and retries. Under sustained contention a send can
//! end in [`crate::SenderError::RetriesExceeded`]; callers that need throughput on
//! one account should serialize sends per key or use several keys.

mod access_key;
mod broadcaster;
mod outcome;
mod retry;
mod tx_signer;

pub use access_key::{AccessKeyCache, AccessKeyResolver, ResolvedAccessKey};
pub use broadcaster::{Broadcast, RetryingBroadcaster};
pub use outcome::{flatten_receipt_logs, OutcomeAggregator, ReceiptLogRecord};
pub use retry::{RetryDecision, RetryPolicy};
pub use tx_signer::{SignedAttempt, TransactionSigner};

use std::sync::Arc;
use tracing::debug;

use crate::config::SenderConfig;
use crate::errors::SenderResult;
use crate::metrics::{metrics, Timer};
use crate::provider::{JsonRpcProvider, Provider};
use crate::signer::{InMemorySigner, Signer};
use crate::structured_logging::DiagnosticLogger;
use crate::types::{Action, CryptoHash, FinalExecutionOutcome, SignedTransaction};

/// Arguments of [`TransactionSender::sign_and_send_transaction`]
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub receiver_id: String,
    pub actions: Vec<Action>,
    /// Opaque data for wallet redirect flows; only logged
    pub wallet_meta: Option<String>,
    /// Redirect target for wallet flows; only logged
    pub wallet_callback_url: Option<String>,
    /// Return a failed outcome instead of an error
    pub return_error: bool,
}

impl SendOptions {
    pub fn new(receiver_id: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            actions,
            ..Self::default()
        }
    }

    pub fn wallet_meta(mut self, meta: impl Into<String>) -> Self {
        self.wallet_meta = Some(meta.into());
        self
    }

    pub fn wallet_callback_url(mut self, url: impl Into<String>) -> Self {
        self.wallet_callback_url = Some(url.into());
        self
    }

    pub fn return_error(mut self, return_error: bool) -> Self {
        self.return_error = return_error;
        self
    }
}

/// Sends transactions on behalf of one account
pub struct TransactionSender {
    account_id: String,
    network_id: String,
    provider: Arc<dyn Provider>,
    signer: Arc<dyn Signer>,
    resolver: Arc<AccessKeyResolver>,
    tx_signer: Arc<TransactionSigner>,
    broadcaster: RetryingBroadcaster,
    aggregator: OutcomeAggregator,
}

impl TransactionSender {
    /// Sender with the default retry policy. Diagnostics follow `NEAR_NO_LOGS`,
    /// read here once.
    pub fn new(
        account_id: impl Into<String>,
        network_id: impl Into<String>,
        provider: Arc<dyn Provider>,
        signer: Arc<dyn Signer>,
    ) -> Self {
        let account_id = account_id.into();
        let network_id = network_id.into();
        let resolver = Arc::new(AccessKeyResolver::new(provider.clone(), signer.clone()));
        let tx_signer = Arc::new(TransactionSigner::new(
            resolver.clone(),
            provider.clone(),
            signer.clone(),
            account_id.clone(),
            network_id.clone(),
        ));
        let diagnostics = DiagnosticLogger::new();
        let broadcaster = RetryingBroadcaster::new(
            tx_signer.clone(),
            resolver.clone(),
            provider.clone(),
            RetryPolicy::default(),
            diagnostics.clone(),
        );

        Self {
            account_id,
            network_id,
            provider,
            signer,
            resolver,
            tx_signer,
            broadcaster,
            aggregator: OutcomeAggregator::new(diagnostics),
        }
    }

    /// Sender backed by [`JsonRpcProvider`] and [`InMemorySigner`]
    pub fn from_config(config: &SenderConfig) -> SenderResult<Self> {
        config.validate()?;

        let provider = Arc::new(JsonRpcProvider::from_config(&config.rpc)?);
        let signer = match &config.signer.private_key {
            Some(secret_key) => InMemorySigner::from_secret_key(
                &config.account.network_id,
                &config.account.account_id,
                secret_key,
            )?,
            None => InMemorySigner::new(),
        };

        let sender = Self::new(
            config.account.account_id.clone(),
            config.account.network_id.clone(),
            provider,
            Arc::new(signer),
        );
        let diagnostics = DiagnosticLogger::new().restrict(config.logging.diagnostics);
        Ok(sender
            .with_retry_policy(RetryPolicy::from_config(&config.retry)?)
            .with_diagnostics(diagnostics))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.broadcaster = RetryingBroadcaster::new(
            self.tx_signer.clone(),
            self.resolver.clone(),
            self.provider.clone(),
            policy,
            self.aggregator.diagnostics().clone(),
        );
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticLogger) -> Self {
        self.broadcaster = RetryingBroadcaster::new(
            self.tx_signer.clone(),
            self.resolver.clone(),
            self.provider.clone(),
            self.broadcaster.policy().clone(),
            diagnostics.clone(),
        );
        self.aggregator = OutcomeAggregator::new(diagnostics);
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.signer
    }

    pub fn access_key_cache(&self) -> &Arc<AccessKeyCache> {
        self.resolver.cache()
    }

    /// Access key that would sign a transaction to `receiver_id` carrying `actions`.
    ///
    /// Every transaction uses the signer's key, so the arguments do not change
    /// the result. `Ok(None)` means the node has no such key for the account.
    pub async fn find_access_key(
        &self,
        receiver_id: &str,
        actions: &[Action],
    ) -> SenderResult<Option<ResolvedAccessKey>> {
        debug!(
            account_id = %self.account_id,
            receiver_id = %receiver_id,
            actions = actions.len(),
            "Finding access key"
        );
        self.resolver.resolve(&self.account_id, &self.network_id).await
    }

    /// Sign without submitting. Consumes a nonce from the cached key.
    pub async fn sign_transaction(
        &self,
        receiver_id: &str,
        actions: Vec<Action>,
    ) -> SenderResult<(CryptoHash, SignedTransaction)> {
        let attempt = self.tx_signer.sign(receiver_id, actions).await?;
        Ok((attempt.hash, attempt.signed))
    }

    /// Sign, submit with retries, log receipts and return the outcome.
    ///
    /// Fails with the node's typed error when the transaction executed and
    /// failed, unless `return_error` is set.
    pub async fn sign_and_send_transaction(
        &self,
        options: SendOptions,
    ) -> SenderResult<FinalExecutionOutcome> {
        let SendOptions {
            receiver_id,
            actions,
            wallet_meta,
            wallet_callback_url,
            return_error,
        } = options;

        if wallet_meta.is_some() || wallet_callback_url.is_some() {
            debug!(
                wallet_meta = ?wallet_meta,
                wallet_callback_url = ?wallet_callback_url,
                "Wallet redirect options are not used by direct signing"
            );
        }

        let timer = Timer::new();
        let result = self.broadcaster.broadcast(&receiver_id, &actions).await;
        timer.observe_duration(&metrics().send_latency);
        let broadcast = result?;

        debug!(
            receiver_id = %receiver_id,
            transaction_hash = %broadcast.transaction_hash,
            attempts = broadcast.attempts,
            "Transaction accepted"
        );
        self.aggregator
            .finalize(broadcast.outcome, &broadcast.signed_transaction, return_error)
    }
}

impl std::fmt::Debug for TransactionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSender")
            .field("account_id", &self.account_id)
            .field("network_id", &self.network_id)
            .field("cached_keys", &self.resolver.cache().len())
            .finish()
    }
}
