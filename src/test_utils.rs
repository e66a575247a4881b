//! Test Utilities Module
//!
//! Scriptable node and fixtures for exercising the sender without a network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::errors::{kinds, SenderError, SenderResult};
use crate::provider::{BlockHeaderView, BlockReference, BlockView, Provider, QueryRequest};
use crate::types::{
    AccessKey, CryptoHash, FinalExecutionOutcome, SignedTransaction,
};

#[derive(Default)]
struct MockState {
    /// `None` answers view_access_key with AccessKeyDoesNotExist
    access_key: Option<AccessKey>,
    /// Nonces handed out by successive view_access_key queries before falling back to `access_key`
    query_nonces: VecDeque<u64>,
    query_delay: Option<Duration>,
    block_error: Option<SenderError>,
    send_results: VecDeque<SenderResult<FinalExecutionOutcome>>,
    /// Returned once `send_results` is drained; success when unset
    default_send_error: Option<SenderError>,
    sent: Vec<SignedTransaction>,
    query_count: usize,
    block_count: usize,
}

/// Mock node for testing
///
/// Answers `view_access_key` from a scripted key, serves a fixed final block
/// and replays queued submission results. Submissions past the queue succeed
/// with an outcome whose id is the transaction hash.
#[derive(Clone)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
    block_hash: CryptoHash,
}

impl MockProvider {
    /// Node holding a full-access key with `nonce`
    pub fn new(nonce: u64) -> Self {
        Self::with_state(MockState {
            access_key: Some(AccessKey {
                nonce,
                ..AccessKey::full_access()
            }),
            ..MockState::default()
        })
    }

    /// Node that has no access key for the signer
    pub fn without_access_key() -> Self {
        Self::with_state(MockState::default())
    }

    fn with_state(state: MockState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            block_hash: fixtures::block_hash(),
        }
    }

    pub fn block_hash(&self) -> CryptoHash {
        self.block_hash
    }

    /// Nonce returned by later queries that are not covered by `queue_query_nonces`
    pub async fn set_access_key_nonce(&self, nonce: u64) {
        let mut state = self.state.lock().await;
        let key = state.access_key.get_or_insert_with(AccessKey::full_access);
        key.nonce = nonce;
    }

    pub async fn queue_query_nonces(&self, nonces: impl IntoIterator<Item = u64>) {
        self.state.lock().await.query_nonces.extend(nonces);
    }

    /// Delay every query, so concurrent resolutions overlap
    pub async fn set_query_delay(&self, delay: Duration) {
        self.state.lock().await.query_delay = Some(delay);
    }

    pub async fn fail_blocks_with(&self, error: SenderError) {
        self.state.lock().await.block_error = Some(error);
    }

    pub async fn push_send_result(&self, result: SenderResult<FinalExecutionOutcome>) {
        self.state.lock().await.send_results.push_back(result);
    }

    pub async fn push_send_error(&self, error: SenderError) {
        self.push_send_result(Err(error)).await;
    }

    /// Fail every submission not covered by the queue
    pub async fn fail_sends_with(&self, error: SenderError) {
        self.state.lock().await.default_send_error = Some(error);
    }

    pub async fn query_count(&self) -> usize {
        self.state.lock().await.query_count
    }

    pub async fn block_count(&self) -> usize {
        self.state.lock().await.block_count
    }

    pub async fn send_count(&self) -> usize {
        self.state.lock().await.sent.len()
    }

    pub async fn sent_transactions(&self) -> Vec<SignedTransaction> {
        self.state.lock().await.sent.clone()
    }

    pub async fn sent_nonces(&self) -> Vec<u64> {
        self.state
            .lock()
            .await
            .sent
            .iter()
            .map(|signed| signed.transaction.nonce)
            .collect()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn query(&self, request: &QueryRequest, _block: &BlockReference) -> SenderResult<Value> {
        let (answer, delay) = {
            let mut state = self.state.lock().await;
            state.query_count += 1;
            let answer = match request {
                QueryRequest::ViewAccessKey { .. } => match state.access_key.clone() {
                    Some(mut key) => {
                        if let Some(nonce) = state.query_nonces.pop_front() {
                            key.nonce = nonce;
                        }
                        let mut view = serde_json::to_value(&key)?;
                        view["block_height"] = json!(100);
                        view["block_hash"] = json!(self.block_hash.to_string());
                        Ok(view)
                    }
                    None => Err(SenderError::typed(
                        "access key does not exist while viewing",
                        kinds::ACCESS_KEY_DOES_NOT_EXIST,
                    )),
                },
                other => Err(SenderError::typed(
                    format!("{} is not scripted", other.request_type()),
                    kinds::UNTYPED,
                )),
            };
            (answer, state.query_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        answer
    }

    async fn block(&self, _block: &BlockReference) -> SenderResult<BlockView> {
        let mut state = self.state.lock().await;
        state.block_count += 1;
        if let Some(error) = state.block_error.clone() {
            return Err(error);
        }
        Ok(BlockView {
            author: Some("mock-node".to_string()),
            header: BlockHeaderView {
                height: 100 + state.block_count as u64,
                hash: self.block_hash,
                prev_hash: None,
                epoch_id: None,
                timestamp: 0,
            },
        })
    }

    async fn send_transaction(
        &self,
        signed: &SignedTransaction,
    ) -> SenderResult<FinalExecutionOutcome> {
        let mut state = self.state.lock().await;
        state.sent.push(signed.clone());
        if let Some(result) = state.send_results.pop_front() {
            return result;
        }
        if let Some(error) = state.default_send_error.clone() {
            return Err(error);
        }
        let id = signed.hash()?.to_string();
        Ok(fixtures::success_outcome(&id, vec![], vec![]))
    }

    async fn validators(&self, _block_hash: Option<&CryptoHash>) -> SenderResult<Value> {
        Ok(json!({ "current_validators": [], "next_validators": [] }))
    }

    async fn experimental_protocol_config(&self, _block: &BlockReference) -> SenderResult<Value> {
        Ok(json!({ "protocol_version": 1 }))
    }
}

/// Canned values for tests
pub mod fixtures {
    use super::*;
    use crate::signer::InMemorySigner;
    use crate::types::{ExecutionOutcome, ExecutionOutcomeWithId, ExecutionStatus, FinalExecutionStatus, PublicKey};

    pub const ACCOUNT_ID: &str = "alice.testnet";
    pub const NETWORK_ID: &str = "testnet";
    pub const RECEIVER_ID: &str = "contract.testnet";

    pub fn block_hash() -> CryptoHash {
        CryptoHash::hash_bytes(b"mock final block")
    }

    /// Signer with a fresh key for [`ACCOUNT_ID`] on [`NETWORK_ID`]
    pub fn signer() -> (Arc<InMemorySigner>, PublicKey) {
        let signer = InMemorySigner::new();
        let public_key = signer.generate_key(NETWORK_ID, ACCOUNT_ID);
        (Arc::new(signer), public_key)
    }

    pub fn invalid_nonce() -> SenderError {
        SenderError::typed(
            "Transaction nonce 5 must be larger than nonce of the used access key 7",
            kinds::INVALID_NONCE,
        )
    }

    pub fn expired() -> SenderError {
        SenderError::typed("Transaction has expired", kinds::EXPIRED)
    }

    fn outcome(id: &str, logs: Vec<&str>, receipt_ids: Vec<String>, status: ExecutionStatus) -> ExecutionOutcomeWithId {
        ExecutionOutcomeWithId {
            id: id.to_string(),
            outcome: ExecutionOutcome {
                logs: logs.into_iter().map(str::to_string).collect(),
                receipt_ids,
                gas_burnt: 100,
                tokens_burnt: 0,
                executor_id: ACCOUNT_ID.to_string(),
                status,
            },
        }
    }

    /// Successful outcome; each receipt entry is `(receipt id, logs)`
    pub fn success_outcome(
        tx_id: &str,
        tx_logs: Vec<&str>,
        receipts: Vec<(&str, Vec<&str>)>,
    ) -> FinalExecutionOutcome {
        let receipt_ids: Vec<String> = receipts.iter().map(|(id, _)| id.to_string()).collect();
        let first_receipt = receipt_ids.first().cloned();
        FinalExecutionOutcome {
            status: FinalExecutionStatus::SuccessValue(String::new()),
            transaction: json!({ "hash": tx_id }),
            transaction_outcome: outcome(
                tx_id,
                tx_logs,
                receipt_ids,
                match first_receipt {
                    Some(id) => ExecutionStatus::SuccessReceiptId(id),
                    None => ExecutionStatus::SuccessValue(String::new()),
                },
            ),
            receipts_outcome: receipts
                .into_iter()
                .map(|(id, logs)| outcome(id, logs, vec![], ExecutionStatus::SuccessValue(String::new())))
                .collect(),
        }
    }

    /// Outcome whose final status and single receipt failed with `payload`
    pub fn failure_outcome(tx_id: &str, payload: Value) -> FinalExecutionOutcome {
        let mut result = success_outcome(tx_id, vec![], vec![("receipt-1", vec![])]);
        result.status = FinalExecutionStatus::Failure(payload.clone());
        result.receipts_outcome[0].outcome.status = ExecutionStatus::Failure(payload);
        result
    }
}
