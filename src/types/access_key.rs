//! Access keys: replay protection and permission scope of one key on one account

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Ledger-side record authorizing a public key to act for an account
///
/// Query responses carry extra fields (`block_height`, `block_hash`) that are
/// ignored here. The nonce is accepted either as a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AccessKey {
    #[serde(with = "super::u64_number_or_string")]
    pub nonce: u64,
    pub permission: AccessKeyPermission,
}

impl AccessKey {
    pub fn full_access() -> Self {
        Self {
            nonce: 0,
            permission: AccessKeyPermission::FullAccess,
        }
    }

    pub fn function_call(permission: FunctionCallPermission) -> Self {
        Self {
            nonce: 0,
            permission: AccessKeyPermission::FunctionCall(permission),
        }
    }
}

/// Borsh variant order is part of the wire format: `FunctionCall` = 0, `FullAccess` = 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum AccessKeyPermission {
    FunctionCall(FunctionCallPermission),
    FullAccess,
}

/// Key scoped to calling methods on one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct FunctionCallPermission {
    /// Remaining gas allowance in yocto units; `None` means unlimited
    #[serde(default, with = "super::option_dec_format")]
    pub allowance: Option<u128>,
    pub receiver_id: String,
    /// Empty means any method
    #[serde(default)]
    pub method_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_access_view_from_node() {
        let view = json!({
            "nonce": 85,
            "permission": "FullAccess",
            "block_height": 19884918,
            "block_hash": "GGJQ8yjmo7aEoj8ZpAhGehnq9BSWFx4xswHYzDwwAP2n"
        });
        let key: AccessKey = serde_json::from_value(view).unwrap();
        assert_eq!(key.nonce, 85);
        assert_eq!(key.permission, AccessKeyPermission::FullAccess);
    }

    #[test]
    fn test_nonce_normalized_from_string() {
        let view = json!({ "nonce": "18446744073709551000", "permission": "FullAccess" });
        let key: AccessKey = serde_json::from_value(view).unwrap();
        assert_eq!(key.nonce, 18_446_744_073_709_551_000);
    }

    #[test]
    fn test_function_call_permission_view() {
        let view = json!({
            "nonce": 3,
            "permission": {
                "FunctionCall": {
                    "allowance": "250000000000000000000000",
                    "receiver_id": "counter.testnet",
                    "method_names": ["increment"]
                }
            }
        });
        let key: AccessKey = serde_json::from_value(view).unwrap();
        match key.permission {
            AccessKeyPermission::FunctionCall(permission) => {
                assert_eq!(permission.allowance, Some(250_000_000_000_000_000_000_000));
                assert_eq!(permission.receiver_id, "counter.testnet");
                assert_eq!(permission.method_names, vec!["increment".to_string()]);
            }
            other => panic!("Expected function call permission, got {:?}", other),
        }
    }

    #[test]
    fn test_permission_borsh_discriminants() {
        let full = borsh::to_vec(&AccessKeyPermission::FullAccess).unwrap();
        assert_eq!(full, vec![1]);

        let scoped = borsh::to_vec(&AccessKeyPermission::FunctionCall(FunctionCallPermission {
            allowance: None,
            receiver_id: "a".to_string(),
            method_names: vec![],
        }))
        .unwrap();
        assert_eq!(scoped[0], 0);
    }
}
