//! Ledger domain types
//!
//! Everything the engine signs, submits or reads back from a node:
//! - **crypto**: public keys, signatures and block/transaction hashes
//! - **access_key**: nonce-bearing access keys and their permissions
//! - **action**: the operations a transaction carries
//! - **transaction**: unsigned and signed transactions in borsh wire form
//! - **outcome**: execution outcome views returned by the node

pub mod access_key;
pub mod action;
pub mod crypto;
pub mod outcome;
pub mod transaction;

pub use access_key::{AccessKey, AccessKeyPermission, FunctionCallPermission};
pub use action::Action;
pub use crypto::{CryptoHash, PublicKey, Signature};
pub use outcome::{
    ExecutionOutcome, ExecutionOutcomeWithId, ExecutionStatus, FinalExecutionOutcome,
    FinalExecutionStatus,
};
pub use transaction::{SignedTransaction, Transaction};

/// Nodes render wide integers either as JSON numbers or decimal strings.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

/// u64 that accepts a JSON number or a decimal string.
pub(crate) mod u64_number_or_string {
    use super::NumberOrString;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(value) => Ok(value),
            NumberOrString::String(text) => text.trim().parse().map_err(D::Error::custom),
        }
    }
}

/// u128 balances travel as decimal strings.
pub(crate) mod dec_format {
    use super::NumberOrString;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(value) => Ok(value as u128),
            NumberOrString::String(text) => text.trim().parse().map_err(D::Error::custom),
        }
    }
}

pub(crate) mod option_dec_format {
    use super::NumberOrString;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(amount) => serializer.serialize_str(&amount.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u128>, D::Error> {
        match Option::<NumberOrString>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumberOrString::Number(value)) => Ok(Some(value as u128)),
            Some(NumberOrString::String(text)) => {
                text.trim().parse().map(Some).map_err(D::Error::custom)
            }
        }
    }
}
