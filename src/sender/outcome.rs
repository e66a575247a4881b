//! Turns an execution outcome into logs and a caller-facing result

use tracing::debug;

use crate::errors::{legacy_shape, parse_result_error, parse_rpc_error, SenderResult, TypedError};
use crate::metrics::metrics;
use crate::structured_logging::DiagnosticLogger;
use crate::types::{FinalExecutionOutcome, SignedTransaction};

/// Logs and failure of one outcome in the tree
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLogRecord {
    /// Transaction or receipt id the record comes from
    pub outcome_id: String,
    pub receipt_ids: Vec<String>,
    pub logs: Vec<String>,
    pub failure: Option<TypedError>,
}

/// One record per outcome that logged something or failed, transaction
/// outcome first, then receipts in node order
pub fn flatten_receipt_logs(outcome: &FinalExecutionOutcome) -> Vec<ReceiptLogRecord> {
    outcome
        .outcomes()
        .filter_map(|item| {
            let failure = item.outcome.status.failure().map(parse_rpc_error);
            if item.outcome.logs.is_empty() && failure.is_none() {
                return None;
            }
            Some(ReceiptLogRecord {
                outcome_id: item.id.clone(),
                receipt_ids: item.outcome.receipt_ids.clone(),
                logs: item.outcome.logs.clone(),
                failure,
            })
        })
        .collect()
}

/// Emits receipt diagnostics and decides whether a failed status becomes an error
#[derive(Debug, Clone)]
pub struct OutcomeAggregator {
    diagnostics: DiagnosticLogger,
}

impl OutcomeAggregator {
    pub fn new(diagnostics: DiagnosticLogger) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &DiagnosticLogger {
        &self.diagnostics
    }

    /// Log the outcome, then return it, or an error if it failed and
    /// `return_error` is false
    pub fn finalize(
        &self,
        outcome: FinalExecutionOutcome,
        signed: &SignedTransaction,
        return_error: bool,
    ) -> SenderResult<FinalExecutionOutcome> {
        let receiver_id = &signed.transaction.receiver_id;
        let records = flatten_receipt_logs(&outcome);
        self.diagnostics.log_receipts(receiver_id, &records);

        let Some(payload) = outcome.status.failure().cloned() else {
            return Ok(outcome);
        };
        metrics().failure_outcomes.inc();

        if return_error {
            debug!(
                transaction_id = %outcome.transaction_outcome.id,
                "Returning failed outcome to caller"
            );
            return Ok(outcome);
        }

        let error = match legacy_shape(&payload) {
            Some((message, error_type)) => TypedError::new(
                format!(
                    "Transaction {} failed. {}",
                    outcome.transaction_outcome.id, message
                ),
                error_type,
            )
            .with_data(payload.clone()),
            None => parse_result_error(&outcome),
        };
        Err(error.into())
    }
}
