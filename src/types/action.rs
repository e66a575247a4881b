//! Transaction actions
//!
//! Variant order is the borsh discriminant the ledger expects and must not change.

use borsh::{BorshDeserialize, BorshSerialize};

use super::access_key::{AccessKey, FunctionCallPermission};
use super::crypto::PublicKey;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Action {
    CreateAccount(CreateAccountAction),
    DeployContract(DeployContractAction),
    FunctionCall(FunctionCallAction),
    Transfer(TransferAction),
    Stake(StakeAction),
    AddKey(AddKeyAction),
    DeleteKey(DeleteKeyAction),
    DeleteAccount(DeleteAccountAction),
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CreateAccountAction {}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeployContractAction {
    pub code: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: u64,
    pub deposit: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransferAction {
    pub deposit: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StakeAction {
    pub stake: u128,
    pub public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AddKeyAction {
    pub public_key: PublicKey,
    pub access_key: AccessKey,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeleteKeyAction {
    pub public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeleteAccountAction {
    pub beneficiary_id: String,
}

impl Action {
    pub fn create_account() -> Self {
        Action::CreateAccount(CreateAccountAction {})
    }

    pub fn deploy_contract(code: Vec<u8>) -> Self {
        Action::DeployContract(DeployContractAction { code })
    }

    pub fn function_call(method_name: impl Into<String>, args: Vec<u8>, gas: u64, deposit: u128) -> Self {
        Action::FunctionCall(FunctionCallAction {
            method_name: method_name.into(),
            args,
            gas,
            deposit,
        })
    }

    pub fn transfer(deposit: u128) -> Self {
        Action::Transfer(TransferAction { deposit })
    }

    pub fn stake(stake: u128, public_key: PublicKey) -> Self {
        Action::Stake(StakeAction { stake, public_key })
    }

    pub fn add_full_access_key(public_key: PublicKey) -> Self {
        Action::AddKey(AddKeyAction {
            public_key,
            access_key: AccessKey::full_access(),
        })
    }

    pub fn add_function_call_key(
        public_key: PublicKey,
        receiver_id: impl Into<String>,
        method_names: Vec<String>,
        allowance: Option<u128>,
    ) -> Self {
        Action::AddKey(AddKeyAction {
            public_key,
            access_key: AccessKey::function_call(FunctionCallPermission {
                allowance,
                receiver_id: receiver_id.into(),
                method_names,
            }),
        })
    }

    pub fn delete_key(public_key: PublicKey) -> Self {
        Action::DeleteKey(DeleteKeyAction { public_key })
    }

    pub fn delete_account(beneficiary_id: impl Into<String>) -> Self {
        Action::DeleteAccount(DeleteAccountAction {
            beneficiary_id: beneficiary_id.into(),
        })
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateAccount(_) => "CreateAccount",
            Action::DeployContract(_) => "DeployContract",
            Action::FunctionCall(_) => "FunctionCall",
            Action::Transfer(_) => "Transfer",
            Action::Stake(_) => "Stake",
            Action::AddKey(_) => "AddKey",
            Action::DeleteKey(_) => "DeleteKey",
            Action::DeleteAccount(_) => "DeleteAccount",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_borsh_layout() {
        let bytes = borsh::to_vec(&Action::transfer(1)).unwrap();
        // discriminant 3, then u128 little-endian
        assert_eq!(bytes.len(), 17);
        assert_eq!(bytes[0], 3);
        assert_eq!(bytes[1], 1);
        assert!(bytes[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_function_call_borsh_layout() {
        let action = Action::function_call("go", vec![0xaa], 30_000_000_000_000, 0);
        let bytes = borsh::to_vec(&action).unwrap();
        assert_eq!(bytes[0], 2);
        // method name: u32 length + utf8
        assert_eq!(&bytes[1..5], &2u32.to_le_bytes());
        assert_eq!(&bytes[5..7], b"go");
        // args: u32 length + bytes
        assert_eq!(&bytes[7..11], &1u32.to_le_bytes());
        assert_eq!(bytes[11], 0xaa);
        assert_eq!(bytes.len(), 12 + 8 + 16);
    }

    #[test]
    fn test_add_full_access_key_starts_at_zero_nonce() {
        match Action::add_full_access_key(PublicKey([1u8; 32])) {
            Action::AddKey(add) => assert_eq!(add.access_key.nonce, 0),
            other => panic!("Expected AddKey, got {}", other.name()),
        }
    }
}
