//! Execution outcome views returned by `broadcast_tx_commit`

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of a single transaction or receipt outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Unknown,
    /// Structured failure payload, kept raw for the error parser
    Failure(Value),
    /// Base64-encoded return value
    SuccessValue(String),
    SuccessReceiptId(String),
}

impl ExecutionStatus {
    pub fn failure(&self) -> Option<&Value> {
        match self {
            ExecutionStatus::Failure(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Aggregate status of the whole transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinalExecutionStatus {
    NotStarted,
    Started,
    Failure(Value),
    SuccessValue(String),
}

impl FinalExecutionStatus {
    pub fn failure(&self) -> Option<&Value> {
        match self {
            FinalExecutionStatus::Failure(payload) => Some(payload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub receipt_ids: Vec<String>,
    #[serde(default)]
    pub gas_burnt: u64,
    #[serde(default, with = "super::dec_format")]
    pub tokens_burnt: u128,
    #[serde(default)]
    pub executor_id: String,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcomeWithId {
    pub id: String,
    pub outcome: ExecutionOutcome,
}

/// Outcome tree: the transaction outcome plus one outcome per spawned receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalExecutionOutcome {
    pub status: FinalExecutionStatus,
    #[serde(default)]
    pub transaction: Value,
    pub transaction_outcome: ExecutionOutcomeWithId,
    #[serde(default)]
    pub receipts_outcome: Vec<ExecutionOutcomeWithId>,
}

impl FinalExecutionOutcome {
    /// Transaction outcome first, then receipts in node order
    pub fn outcomes(&self) -> impl Iterator<Item = &ExecutionOutcomeWithId> {
        std::iter::once(&self.transaction_outcome).chain(self.receipts_outcome.iter())
    }

    pub fn is_failure(&self) -> bool {
        self.status.failure().is_some()
    }

    pub fn total_gas_burnt(&self) -> u64 {
        self.outcomes().map(|o| o.outcome.gas_burnt).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_outcome_deserializes() {
        let raw = json!({
            "status": { "SuccessValue": "" },
            "transaction": { "hash": "tx" },
            "transaction_outcome": {
                "id": "tx",
                "outcome": {
                    "logs": [],
                    "receipt_ids": ["r1"],
                    "gas_burnt": 223182562500u64,
                    "tokens_burnt": "22318256250000000000",
                    "executor_id": "alice.testnet",
                    "status": { "SuccessReceiptId": "r1" }
                }
            },
            "receipts_outcome": [{
                "id": "r1",
                "outcome": {
                    "logs": ["hello"],
                    "receipt_ids": [],
                    "gas_burnt": 100,
                    "tokens_burnt": "0",
                    "executor_id": "bob.testnet",
                    "status": "Unknown"
                }
            }]
        });

        let outcome: FinalExecutionOutcome = serde_json::from_value(raw).unwrap();
        assert!(!outcome.is_failure());
        assert_eq!(outcome.receipts_outcome[0].outcome.status, ExecutionStatus::Unknown);
        assert_eq!(outcome.transaction_outcome.outcome.tokens_burnt, 22_318_256_250_000_000_000);
        assert_eq!(outcome.total_gas_burnt(), 223_182_562_600);
        let ids: Vec<&str> = outcome.outcomes().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["tx", "r1"]);
    }

    #[test]
    fn test_failure_status_keeps_payload() {
        let status: FinalExecutionStatus = serde_json::from_value(json!({
            "Failure": { "error_message": "boom", "error_type": "GuestPanic" }
        }))
        .unwrap();
        assert_eq!(status.failure().unwrap()["error_type"], "GuestPanic");
    }
}
