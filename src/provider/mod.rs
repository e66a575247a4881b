//! Node access
//!
//! The sender talks to the chain only through [`Provider`], so the retry and
//! caching logic can run against a scripted node in tests and against
//! [`JsonRpcProvider`] in production.

mod json_rpc;

pub use json_rpc::JsonRpcProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::SenderResult;
use crate::types::{CryptoHash, FinalExecutionOutcome, PublicKey, SignedTransaction};

/// How settled the state a query reads must be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Finality {
    Optimistic,
    NearFinal,
    Final,
}

impl Finality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Finality::Optimistic => "optimistic",
            Finality::NearFinal => "near-final",
            Finality::Final => "final",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockId {
    Height(u64),
    Hash(CryptoHash),
}

/// Which block a read is evaluated against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReference {
    Finality(Finality),
    BlockId(BlockId),
}

impl BlockReference {
    /// Latest state, possibly not yet final
    pub fn optimistic() -> Self {
        BlockReference::Finality(Finality::Optimistic)
    }

    /// Latest final block
    pub fn latest_final() -> Self {
        BlockReference::Finality(Finality::Final)
    }

    /// Insert this reference into a JSON-RPC params object
    pub fn write_params(&self, params: &mut Map<String, Value>) {
        match self {
            BlockReference::Finality(finality) => {
                params.insert("finality".to_string(), json!(finality.as_str()));
            }
            BlockReference::BlockId(BlockId::Height(height)) => {
                params.insert("block_id".to_string(), json!(height));
            }
            BlockReference::BlockId(BlockId::Hash(hash)) => {
                params.insert("block_id".to_string(), json!(hash.to_string()));
            }
        }
    }

    pub fn to_params(&self) -> Value {
        let mut params = Map::new();
        self.write_params(&mut params);
        Value::Object(params)
    }
}

/// State queries understood by the `query` method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRequest {
    ViewAccessKey {
        account_id: String,
        public_key: PublicKey,
    },
    ViewAccount {
        account_id: String,
    },
    CallFunction {
        account_id: String,
        method_name: String,
        args_base64: String,
    },
    ViewState {
        account_id: String,
        prefix_base64: String,
    },
}

impl QueryRequest {
    pub fn request_type(&self) -> &'static str {
        match self {
            QueryRequest::ViewAccessKey { .. } => "view_access_key",
            QueryRequest::ViewAccount { .. } => "view_account",
            QueryRequest::CallFunction { .. } => "call_function",
            QueryRequest::ViewState { .. } => "view_state",
        }
    }

    /// Params object for the `query` method, block reference included
    pub fn to_params(&self, block: &BlockReference) -> Value {
        let mut params = Map::new();
        params.insert("request_type".to_string(), json!(self.request_type()));
        match self {
            QueryRequest::ViewAccessKey {
                account_id,
                public_key,
            } => {
                params.insert("account_id".to_string(), json!(account_id));
                params.insert("public_key".to_string(), json!(public_key.to_string()));
            }
            QueryRequest::ViewAccount { account_id } => {
                params.insert("account_id".to_string(), json!(account_id));
            }
            QueryRequest::CallFunction {
                account_id,
                method_name,
                args_base64,
            } => {
                params.insert("account_id".to_string(), json!(account_id));
                params.insert("method_name".to_string(), json!(method_name));
                params.insert("args_base64".to_string(), json!(args_base64));
            }
            QueryRequest::ViewState {
                account_id,
                prefix_base64,
            } => {
                params.insert("account_id".to_string(), json!(account_id));
                params.insert("prefix_base64".to_string(), json!(prefix_base64));
            }
        }
        block.write_params(&mut params);
        Value::Object(params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeaderView {
    #[serde(with = "crate::types::u64_number_or_string")]
    pub height: u64,
    pub hash: CryptoHash,
    #[serde(default)]
    pub prev_hash: Option<CryptoHash>,
    #[serde(default)]
    pub epoch_id: Option<CryptoHash>,
    #[serde(default, with = "crate::types::u64_number_or_string")]
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockView {
    #[serde(default)]
    pub author: Option<String>,
    pub header: BlockHeaderView,
}

/// Node operations the sender depends on
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run a state query. Errors the node reports inside the result are
    /// returned as typed errors, not as values.
    async fn query(&self, request: &QueryRequest, block: &BlockReference) -> SenderResult<Value>;

    async fn block(&self, block: &BlockReference) -> SenderResult<BlockView>;

    /// Submit a signed transaction and wait for its execution outcome
    async fn send_transaction(
        &self,
        signed: &SignedTransaction,
    ) -> SenderResult<FinalExecutionOutcome>;

    /// Validator set at a block, or the latest one
    async fn validators(&self, block_hash: Option<&CryptoHash>) -> SenderResult<Value>;

    async fn experimental_protocol_config(&self, block: &BlockReference) -> SenderResult<Value>;
}
