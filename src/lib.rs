//! tx-sender - NEAR transaction signing and broadcast engine
//!
//! Signs transactions for an account, submits them to a node and resolves the
//! final execution outcome. Stale nonces and expired reference blocks are
//! retried with backoff; every other failure surfaces as a typed error.
//!
//! ## Modules
//!
//! - **sender**: access key cache, transaction signer, retrying broadcaster, outcome aggregation
//! - **provider**: node access trait and the JSON-RPC implementation
//! - **signer**: signer trait and the in-memory ed25519 implementation
//! - **types**: keys, actions, transactions and outcome views
//! - **errors**: error taxonomy and node error parsing

pub mod config;
pub mod errors;
pub mod metrics;
pub mod provider;
pub mod sender;
pub mod signer;
pub mod structured_logging;
pub mod types;

pub mod test_utils;

pub use config::SenderConfig;
pub use errors::{ErrorContext, SenderError, SenderResult, TypedError};
pub use provider::{BlockReference, Finality, JsonRpcProvider, Provider, QueryRequest};
pub use sender::{SendOptions, TransactionSender};
pub use signer::{InMemorySigner, Signer};
pub use types::{Action, FinalExecutionOutcome};

#[cfg(test)]
mod tests {
    mod access_key_cache_tests;
    mod broadcast_retry_tests;
    mod outcome_aggregation_tests;
}
