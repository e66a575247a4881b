//! Error taxonomy for the signing-and-broadcast engine
//!
//! Every failure a caller can see is a [`SenderError`]. Node-reported failures
//! keep the node's type name in [`TypedError::error_type`] so callers branch on
//! kind (`InvalidNonce`, `Expired`, `AccessKeyDoesNotExist`, ...) rather than on
//! message text.

mod parse;

pub use parse::{error_type_from_message, legacy_shape, parse_result_error, parse_rpc_error};

use thiserror::Error;

/// Node error kinds the engine reacts to
pub mod kinds {
    pub const INVALID_NONCE: &str = "InvalidNonce";
    pub const EXPIRED: &str = "Expired";
    pub const ACCESS_KEY_DOES_NOT_EXIST: &str = "AccessKeyDoesNotExist";
    pub const ACCOUNT_DOES_NOT_EXIST: &str = "AccountDoesNotExist";
    pub const TIMEOUT: &str = "TimeoutError";
    pub const NONCE_OVERFLOW: &str = "NonceOverflow";
    pub const UNTYPED: &str = "UntypedError";
}

/// Diagnostic context attached to a failed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Hash of the transaction that was actually submitted
    pub transaction_hash: String,
}

impl ErrorContext {
    pub fn new(transaction_hash: impl Into<String>) -> Self {
        Self {
            transaction_hash: transaction_hash.into(),
        }
    }
}

/// Failure reported by a node, tagged with the node's error type name
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TypedError {
    pub error_type: String,
    pub message: String,
    pub context: Option<ErrorContext>,
    /// Raw payload the error was parsed from, if any
    pub data: Option<serde_json::Value>,
}

impl TypedError {
    pub fn new(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            context: None,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Errors surfaced by the sender
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SenderError {
    /// The signer holds no key pair for this account on this network
    #[error("Can not sign transactions for account {account_id} on network {network_id}, no matching key pair exists for this account")]
    KeyNotFound {
        account_id: String,
        network_id: String,
    },

    /// Every attempt failed with a retryable error
    #[error("Exceeded {attempts} attempts for transaction {transaction_hash}. This usually means the same access key is used by several senders at once; serialize transactions per access key or give each sender its own key")]
    RetriesExceeded {
        attempts: u32,
        transaction_hash: String,
    },

    /// Node-reported failure
    #[error(transparent)]
    Typed(#[from] TypedError),

    /// Network or HTTP failure talking to the node
    #[error("Transport error: {0}")]
    Transport(String),

    /// Signer failure other than a missing key
    #[error("Signing error: {0}")]
    Signing(String),

    /// Encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-node failure of a submitted transaction, tagged with its hash
    #[error("{error}")]
    Submission {
        error: Box<SenderError>,
        context: ErrorContext,
    },
}

impl SenderError {
    pub fn typed(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        SenderError::Typed(TypedError::new(message, error_type))
    }

    /// Kind name, stable for programmatic matching
    pub fn error_type(&self) -> &str {
        match self {
            SenderError::KeyNotFound { .. } => "KeyNotFound",
            SenderError::RetriesExceeded { .. } => "RetriesExceeded",
            SenderError::Typed(err) => &err.error_type,
            SenderError::Transport(_) => "TransportError",
            SenderError::Signing(_) => "SigningError",
            SenderError::Serialization(_) => "SerializationError",
            SenderError::Configuration(_) => "ConfigurationError",
            SenderError::Submission { error, .. } => error.error_type(),
        }
    }

    /// Stale nonce or expired reference block: re-signing with fresh state may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.error_type(), kinds::INVALID_NONCE | kinds::EXPIRED)
    }

    pub fn is_access_key_missing(&self) -> bool {
        self.error_type() == kinds::ACCESS_KEY_DOES_NOT_EXIST
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            SenderError::Typed(err) => err.context.as_ref(),
            SenderError::Submission { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Attach submission context. Node-reported errors keep their variant;
    /// anything else is wrapped in [`SenderError::Submission`].
    pub fn with_context(self, context: ErrorContext) -> Self {
        match self {
            SenderError::Typed(err) => SenderError::Typed(err.with_context(context)),
            SenderError::Submission { error, .. } => SenderError::Submission { error, context },
            other => SenderError::Submission {
                error: Box::new(other),
                context,
            },
        }
    }

    /// The error with any submission wrapper removed
    pub fn inner(&self) -> &SenderError {
        match self {
            SenderError::Submission { error, .. } => error.inner(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for SenderError {
    fn from(err: serde_json::Error) -> Self {
        SenderError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SenderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SenderError::typed(err.to_string(), kinds::TIMEOUT)
        } else {
            SenderError::Transport(err.to_string())
        }
    }
}

/// Result type for sender operations
pub type SenderResult<T> = Result<T, SenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SenderError::typed("stale", kinds::INVALID_NONCE).is_retryable());
        assert!(SenderError::typed("old block", kinds::EXPIRED).is_retryable());

        assert!(!SenderError::typed("slow", kinds::TIMEOUT).is_retryable());
        assert!(!SenderError::typed("panic", "GuestPanic").is_retryable());
        assert!(!SenderError::Transport("connection reset".to_string()).is_retryable());
        assert!(!SenderError::KeyNotFound {
            account_id: "a".to_string(),
            network_id: "n".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_kinds_are_distinct() {
        let exceeded = SenderError::RetriesExceeded {
            attempts: 12,
            transaction_hash: "abc".to_string(),
        };
        assert_eq!(exceeded.error_type(), "RetriesExceeded");
        assert!(exceeded.to_string().contains("12 attempts"));
        assert!(exceeded.to_string().contains("same access key"));

        let missing = SenderError::KeyNotFound {
            account_id: "alice.testnet".to_string(),
            network_id: "testnet".to_string(),
        };
        assert_eq!(missing.error_type(), "KeyNotFound");
        assert!(missing.to_string().contains("alice.testnet"));
    }

    #[test]
    fn test_context_attaches_to_every_kind() {
        let ctx = ErrorContext::new("7hX");

        let typed = SenderError::typed("bad", "ActionError").with_context(ctx.clone());
        assert_eq!(typed.context(), Some(&ctx));
        assert_eq!(typed.error_type(), "ActionError");
        assert_eq!(typed.to_string(), "bad");
        assert!(matches!(typed, SenderError::Typed(_)));

        let transport = SenderError::Transport("reset".to_string()).with_context(ctx.clone());
        assert_eq!(transport.context(), Some(&ctx));
        assert_eq!(transport.error_type(), "TransportError");
        assert_eq!(transport.to_string(), "Transport error: reset");
        assert_eq!(
            transport.inner(),
            &SenderError::Transport("reset".to_string())
        );

        let rewrapped = transport.with_context(ErrorContext::new("9aB"));
        assert_eq!(rewrapped.context().unwrap().transaction_hash, "9aB");
        assert_eq!(rewrapped.inner().error_type(), "TransportError");
    }

    #[test]
    fn test_context_is_absent_by_default() {
        assert_eq!(SenderError::Transport("reset".to_string()).context(), None);
        assert_eq!(SenderError::typed("bad", "ActionError").context(), None);
    }
}
