//! Structured diagnostics for submissions
//!
//! Receipt logs and failure warnings go through [`DiagnosticLogger`], which
//! carries a correlation id and honours the `NEAR_NO_LOGS` switch. Debug-level
//! tracing elsewhere in the crate is not affected by the switch.

use uuid::Uuid;

use crate::sender::ReceiptLogRecord;

/// Environment variable that silences receipt logs and failure warnings when set
pub const NO_LOGS_ENV: &str = "NEAR_NO_LOGS";

/// Diagnostics stay on unless the switch holds a non-empty value
pub fn enabled_for(no_logs: Option<&str>) -> bool {
    !matches!(no_logs, Some(value) if !value.is_empty())
}

/// Read the switch from the process environment
pub fn diagnostics_enabled() -> bool {
    enabled_for(std::env::var(NO_LOGS_ENV).ok().as_deref())
}

/// Structured logger for a sender
#[derive(Debug, Clone)]
pub struct DiagnosticLogger {
    context_id: String,
    enabled: bool,
}

impl DiagnosticLogger {
    /// Logger whose on/off state follows `NEAR_NO_LOGS`
    pub fn new() -> Self {
        Self::with_enabled(diagnostics_enabled())
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            context_id: Uuid::new_v4().to_string(),
            enabled,
        }
    }

    /// Keep the current state only if the configuration also allows it
    pub fn restrict(mut self, allowed: bool) -> Self {
        self.enabled &= allowed;
        self
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit the receipt ids, contract logs and failure of every record.
    /// Lines are attributed to `contract_id`, the transaction's receiver.
    pub fn log_receipts(&self, contract_id: &str, records: &[ReceiptLogRecord]) {
        if !self.enabled {
            return;
        }
        for record in records {
            let label = if record.receipt_ids.len() > 1 { "Receipts" } else { "Receipt" };
            tracing::info!(
                context_id = %self.context_id,
                outcome_id = %record.outcome_id,
                "{}: {}",
                label,
                record.receipt_ids.join(", ")
            );
            self.log_contract_output(contract_id, &record.logs);
            if let Some(failure) = &record.failure {
                tracing::warn!(
                    context_id = %self.context_id,
                    outcome_id = %record.outcome_id,
                    error_type = %failure.error_type,
                    "Failure [{}]: {}",
                    contract_id,
                    failure.message
                );
            }
        }
    }

    pub fn log_contract_output(&self, contract_id: &str, logs: &[String]) {
        if !self.enabled {
            return;
        }
        for line in logs {
            tracing::info!(
                context_id = %self.context_id,
                "Log [{}]: {}",
                contract_id,
                line
            );
        }
    }

    /// Retryable failure; the next attempt re-signs
    pub fn warn_retry(&self, transaction_hash: &str, attempt: u32, error_type: &str, message: &str) {
        if !self.enabled {
            return;
        }
        tracing::warn!(
            context_id = %self.context_id,
            transaction_hash = %transaction_hash,
            attempt = attempt,
            error_type = %error_type,
            "Retrying transaction after {}: {}",
            error_type,
            message
        );
    }

    /// Fatal failure for a submitted transaction
    pub fn warn_failure(&self, transaction_hash: &str, error_type: &str, message: &str) {
        if !self.enabled {
            return;
        }
        tracing::warn!(
            context_id = %self.context_id,
            transaction_hash = %transaction_hash,
            error_type = %error_type,
            "Transaction {} failed: {}",
            transaction_hash,
            message
        );
    }
}

impl Default for DiagnosticLogger {
    fn default() -> Self {
        Self::new()
    }
}
