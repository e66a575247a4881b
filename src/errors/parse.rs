//! Turns node-reported failure payloads into typed errors
//!
//! Payloads are nested objects whose keys name the error at each level, e.g.
//! `{"TxExecutionError": {"InvalidTxError": {"InvalidNonce": {"tx_nonce": 5, "ak_nonce": 7}}}}`
//! or `{"ActionError": {"index": 0, "kind": {"FunctionCallError": {"ExecutionError": "..."}}}}`.
//! The deepest type name wins; scalar fields met on the way feed the message.

use serde_json::{Map, Value};

use super::{kinds, ErrorContext, TypedError};
use crate::types::FinalExecutionOutcome;

#[derive(Default)]
struct ErrorPath {
    error_type: Option<String>,
    detail: Option<String>,
    fields: Map<String, Value>,
}

/// CamelCase identifiers name error types; anything else is prose
fn is_type_name(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

fn walk(value: &Value, path: &mut ErrorPath) {
    match value {
        Value::String(text) if is_type_name(text) => path.error_type = Some(text.clone()),
        Value::String(text) => path.detail = Some(text.clone()),
        Value::Object(map) => {
            for (key, inner) in map {
                if !is_type_name(key) && key != "kind" {
                    path.fields.insert(key.clone(), inner.clone());
                }
            }
            if let Some((key, inner)) = map.iter().find(|(key, _)| is_type_name(key)) {
                path.error_type = Some(key.clone());
                walk(inner, path);
            } else if let Some(kind) = map.get("kind") {
                walk(kind, path);
            }
        }
        _ => {}
    }
}

fn field(fields: &Map<String, Value>, name: &str) -> String {
    match fields.get(name) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => "?".to_string(),
    }
}

fn format_message(error_type: &str, path: &ErrorPath) -> String {
    let fields = &path.fields;
    match error_type {
        kinds::INVALID_NONCE => format!(
            "Transaction nonce {} must be larger than nonce of the used access key {}",
            field(fields, "tx_nonce"),
            field(fields, "ak_nonce")
        ),
        kinds::EXPIRED => "Transaction has expired".to_string(),
        "InvalidAccessKeyError" | "AccessKeyNotFound" => format!(
            "Signer \"{}\" doesn't have access key with the given public_key {}",
            field(fields, "account_id"),
            field(fields, "public_key")
        ),
        "NotEnoughBalance" => format!(
            "Sender {} does not have enough balance {} for operation costing {}",
            field(fields, "signer_id"),
            field(fields, "balance"),
            field(fields, "cost")
        ),
        "AccountAlreadyExists" => format!(
            "Can't create a new account {}, because it already exists",
            field(fields, "account_id")
        ),
        _ => match (&path.detail, fields.is_empty()) {
            (Some(detail), _) => detail.clone(),
            (None, true) => error_type.to_string(),
            (None, false) => format!("{} {}", error_type, Value::Object(fields.clone())),
        },
    }
}

/// Parse a structured failure payload into a typed error
pub fn parse_rpc_error(payload: &Value) -> TypedError {
    if let Some((message, error_type)) = legacy_shape(payload) {
        return TypedError::new(message, error_type).with_data(payload.clone());
    }
    let mut path = ErrorPath::default();
    walk(payload, &mut path);
    let error_type = path
        .error_type
        .clone()
        .unwrap_or_else(|| kinds::UNTYPED.to_string());
    let message = format_message(&error_type, &path);
    TypedError::new(message, error_type).with_data(payload.clone())
}

/// Older nodes report `{error_message, error_type}` instead of a nested payload
pub fn legacy_shape(payload: &Value) -> Option<(&str, &str)> {
    let message = payload.get("error_message")?.as_str()?;
    let error_type = payload.get("error_type")?.as_str()?;
    Some((message, error_type))
}

/// Typed error for a transaction whose final status is a structured failure.
/// The error context carries the transaction outcome id.
pub fn parse_result_error(outcome: &FinalExecutionOutcome) -> TypedError {
    let payload = outcome.status.failure().cloned().unwrap_or(Value::Null);
    parse_rpc_error(&payload).with_context(ErrorContext::new(outcome.transaction_outcome.id.clone()))
}

/// Infer an error type from free-form node messages
pub fn error_type_from_message(message: &str, fallback: &str) -> String {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("does not exist while viewing") || lowered.contains("doesn't exist") {
        if lowered.contains("access key") {
            return kinds::ACCESS_KEY_DOES_NOT_EXIST.to_string();
        }
        if lowered.contains("contract code") {
            return "CodeDoesNotExist".to_string();
        }
        if lowered.contains("account") {
            return kinds::ACCOUNT_DOES_NOT_EXIST.to_string();
        }
    }
    if is_invalid_nonce_message(&lowered) {
        return kinds::INVALID_NONCE.to_string();
    }
    if lowered.contains("transaction has expired") {
        return kinds::EXPIRED.to_string();
    }
    if lowered.contains("timeout") || lowered.contains("timed out") {
        return kinds::TIMEOUT.to_string();
    }
    fallback.to_string()
}

/// `Transaction nonce N must be larger than nonce of the used access key M`
fn is_invalid_nonce_message(lowered: &str) -> bool {
    const PREFIX: &str = "transaction nonce ";
    const INFIX: &str = " must be larger than nonce of the used access key ";

    let Some(start) = lowered.find(PREFIX) else {
        return false;
    };
    let rest = &lowered[start + PREFIX.len()..];
    let Some(split) = rest.find(INFIX) else {
        return false;
    };
    let tx_nonce = &rest[..split];
    let ak_nonce: String = rest[split + INFIX.len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    !tx_nonce.is_empty() && tx_nonce.bytes().all(|b| b.is_ascii_digit()) && !ak_nonce.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_nonce_payload() {
        let err = parse_rpc_error(&json!({
            "TxExecutionError": {
                "InvalidTxError": { "InvalidNonce": { "tx_nonce": 5, "ak_nonce": 7 } }
            }
        }));
        assert_eq!(err.error_type, "InvalidNonce");
        assert!(err.message.contains("nonce 5"));
        assert!(err.message.contains("access key 7"));
        assert!(err.data.is_some());
    }

    #[test]
    fn test_expired_as_string_leaf() {
        let err = parse_rpc_error(&json!({ "TxExecutionError": { "InvalidTxError": "Expired" } }));
        assert_eq!(err.error_type, "Expired");
        assert_eq!(err.message, "Transaction has expired");
    }

    #[test]
    fn test_action_error_descends_through_kind() {
        let err = parse_rpc_error(&json!({
            "ActionError": {
                "index": 0,
                "kind": {
                    "FunctionCallError": { "ExecutionError": "Smart contract panicked: boom" }
                }
            }
        }));
        assert_eq!(err.error_type, "ExecutionError");
        assert_eq!(err.message, "Smart contract panicked: boom");
    }

    #[test]
    fn test_legacy_shape_kept_verbatim() {
        let err = parse_rpc_error(&json!({ "error_message": "boom", "error_type": "GuestPanic" }));
        assert_eq!(err.error_type, "GuestPanic");
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_unknown_payload_is_untyped() {
        let err = parse_rpc_error(&json!({ "weird": true }));
        assert_eq!(err.error_type, "UntypedError");
        assert!(err.message.contains("weird"));
    }

    #[test]
    fn test_error_type_from_message() {
        assert_eq!(
            error_type_from_message(
                "access key ed25519:abc does not exist while viewing",
                "UntypedError"
            ),
            "AccessKeyDoesNotExist"
        );
        assert_eq!(
            error_type_from_message("account bob.near does not exist while viewing", "X"),
            "AccountDoesNotExist"
        );
        assert_eq!(error_type_from_message("query has timed out", "X"), "TimeoutError");
        assert_eq!(error_type_from_message("something else", "Fallback"), "Fallback");
    }

    #[test]
    fn test_nonce_message_maps_to_invalid_nonce() {
        assert_eq!(
            error_type_from_message(
                "Transaction nonce 5 must be larger than nonce of the used access key 7",
                "UntypedError"
            ),
            "InvalidNonce"
        );
        assert_eq!(
            error_type_from_message("Transaction has expired", "UntypedError"),
            "Expired"
        );
        // Placeholders are not nonces
        assert_eq!(
            error_type_from_message(
                "Transaction nonce ? must be larger than nonce of the used access key ?",
                "UntypedError"
            ),
            "UntypedError"
        );
    }

    #[test]
    fn test_formatted_nonce_message_round_trips_kind() {
        let err = parse_rpc_error(&json!({
            "TxExecutionError": {
                "InvalidTxError": { "InvalidNonce": { "tx_nonce": 5, "ak_nonce": 7 } }
            }
        }));
        assert_eq!(error_type_from_message(&err.message, "UntypedError"), err.error_type);
    }
}
