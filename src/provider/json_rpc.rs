//! JSON-RPC 2.0 client for a NEAR node

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{BlockReference, BlockView, Provider, QueryRequest};
use crate::config::RpcConfig;
use crate::errors::{
    error_type_from_message, kinds, legacy_shape, parse_rpc_error, SenderError, SenderResult,
    TypedError,
};
use crate::metrics::{metrics, Timer};
use crate::types::{CryptoHash, FinalExecutionOutcome, SignedTransaction};

/// Provider backed by a single RPC endpoint
pub struct JsonRpcProvider {
    url: String,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcProvider {
    pub fn new(url: impl Into<String>) -> SenderResult<Self> {
        Self::with_timeout(url, Duration::from_secs(30))
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> SenderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SenderError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &RpcConfig) -> SenderResult<Self> {
        Self::with_timeout(config.url.clone(), config.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC call and decode its `result`
    pub async fn send_json_rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> SenderResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method = method, id = id, url = %self.url, "Sending JSON-RPC request");
        let timer = Timer::new();
        let response = self.client.post(&self.url).json(&request).send().await;
        timer.observe_duration(&metrics().rpc_latency);

        let response = response?;
        let status = response.status();
        let body = response.text().await?;

        let payload: Value = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                return Err(SenderError::Transport(format!(
                    "[{}] {}",
                    status.as_u16(),
                    body.trim()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
            let typed = parse_json_rpc_error(error);
            debug!(
                method = method,
                id = id,
                error_type = %typed.error_type,
                "JSON-RPC request failed"
            );
            return Err(typed.into());
        }

        let result = payload.get("result").cloned().ok_or_else(|| {
            SenderError::Serialization(format!("response to {} has no result", method))
        })?;
        Ok(serde_json::from_value(result)?)
    }
}

/// Map the `error` member of a JSON-RPC response to a typed error
pub fn parse_json_rpc_error(error: &Value) -> TypedError {
    if let Some(data) = error.get("data").filter(|data| data.is_object()) {
        if let Some((message, error_type)) = legacy_shape(data) {
            return TypedError::new(message, error_type).with_data(error.clone());
        }
        return parse_rpc_error(data);
    }

    let code = error.get("code").map(Value::to_string).unwrap_or_default();
    let message = error.get("message").and_then(Value::as_str).unwrap_or("");
    let data = match error.get("data") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    let full_message = format!("[{}] {}: {}", code, message, data);

    let cause = error
        .get("cause")
        .and_then(|cause| cause.get("name"))
        .and_then(Value::as_str);
    let mapped = match cause {
        Some("UNKNOWN_ACCESS_KEY") => Some(kinds::ACCESS_KEY_DOES_NOT_EXIST),
        Some("UNKNOWN_ACCOUNT") => Some(kinds::ACCOUNT_DOES_NOT_EXIST),
        Some("TIMEOUT_ERROR") => Some(kinds::TIMEOUT),
        _ => None,
    };
    if let Some(error_type) = mapped {
        return TypedError::new(full_message, error_type).with_data(error.clone());
    }

    if data == "Timeout"
        || full_message.contains("Timeout error")
        || full_message.contains("query has timed out")
    {
        return TypedError::new(full_message, kinds::TIMEOUT).with_data(error.clone());
    }

    let fallback = error
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(kinds::UNTYPED);
    let error_type = error_type_from_message(&data, fallback);
    TypedError::new(full_message, error_type).with_data(error.clone())
}

/// Errors reported inside a query result rather than as a JSON-RPC error
fn query_result_error(result: &Value) -> Option<TypedError> {
    let error = result.get("error")?.as_str()?;
    let rendered = serde_json::to_string_pretty(result).unwrap_or_default();
    let error_type = error_type_from_message(error, kinds::UNTYPED);
    Some(
        TypedError::new(format!("Querying failed: {}.\n{}", error, rendered), error_type)
            .with_data(result.clone()),
    )
}

#[async_trait]
impl Provider for JsonRpcProvider {
    async fn query(&self, request: &QueryRequest, block: &BlockReference) -> SenderResult<Value> {
        let result: Value = self.send_json_rpc("query", request.to_params(block)).await?;
        match query_result_error(&result) {
            Some(error) => Err(error.into()),
            None => Ok(result),
        }
    }

    async fn block(&self, block: &BlockReference) -> SenderResult<BlockView> {
        self.send_json_rpc("block", block.to_params()).await
    }

    async fn send_transaction(
        &self,
        signed: &SignedTransaction,
    ) -> SenderResult<FinalExecutionOutcome> {
        let encoded = signed.to_base64()?;
        self.send_json_rpc("broadcast_tx_commit", json!([encoded])).await
    }

    async fn validators(&self, block_hash: Option<&CryptoHash>) -> SenderResult<Value> {
        let params = match block_hash {
            Some(hash) => json!([hash.to_string()]),
            None => json!([Value::Null]),
        };
        self.send_json_rpc("validators", params).await
    }

    async fn experimental_protocol_config(&self, block: &BlockReference) -> SenderResult<Value> {
        self.send_json_rpc("EXPERIMENTAL_protocol_config", block.to_params())
            .await
    }
}
