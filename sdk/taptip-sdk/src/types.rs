use alloy_primitives::{Address, Bytes, FixedBytes, TxHash, B256, U256};
use serde::{Deserialize, Serialize};

/// A contract account acting for an owner credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmartAccount {
    /// Owner EOA that controls the account
    pub owner: Address,

    /// Counterfactual (CREATE2) address of the account
    pub address: Address,

    /// Whether code exists at `address`
    pub deployed: bool,
}

/// Resolution state of the session's smart account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountState {
    Resolving,
    Ready(SmartAccount),
    Error(String),
}

impl AccountState {
    /// The resolved account, if ready
    pub fn ready(&self) -> Option<&SmartAccount> {
        match self {
            AccountState::Ready(account) => Some(account),
            AccountState::Resolving | AccountState::Error(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready().is_some()
    }
}

/// What a delegation may be used for: exactly one target and one function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationScope {
    pub target_contract: Address,
    pub selector: FixedBytes<4>,
}

/// Unix-second validity window; both bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityWindow {
    pub not_before_unix: u64,
    pub not_after_unix: u64,
}

impl ValidityWindow {
    pub fn duration(&self) -> u64 {
        self.not_after_unix.saturating_sub(self.not_before_unix)
    }
}

/// A single enforcer restriction attached to a delegation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caveat {
    pub enforcer: Address,
    pub terms: Bytes,
    #[serde(default)]
    pub args: Bytes,
}

/// Unsigned delegation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    pub delegator: Address,
    pub delegate: Address,
    pub authority: B256,
    pub scope: DelegationScope,
    pub validity: ValidityWindow,
    pub caveats: Vec<Caveat>,
    pub salt: U256,
}

/// Delegation plus the smart account's signature; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDelegation {
    #[serde(flatten)]
    pub delegation: Delegation,
    pub signature: Bytes,
}

impl SignedDelegation {
    pub fn expires_at(&self) -> u64 {
        self.delegation.validity.not_after_unix
    }
}

/// Persisted cache entry, one per cache key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub signed_delegation: SignedDelegation,

    /// Duplicate of `notAfterUnix` for fast local expiry checks
    pub expires_at: u64,

    /// Revocation epoch this delegation was issued under
    pub nonce_tag: String,
}

impl CacheRecord {
    /// Check if the record is still usable at `now`
    pub fn is_active(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// Inputs for building an unsigned delegation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationRequest {
    pub delegator: Address,
    pub delegate: Address,
    pub scope: DelegationScope,
    pub validity: ValidityWindow,

    /// Current revocation epoch, bound as a caveat when a nonce enforcer is configured
    pub nonce: Option<U256>,

    pub salt: U256,
}

/// A single call executed by the smart account on redemption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub target: Address,
    pub value: U256,
    pub call_data: Bytes,
}

/// Transaction handed to a wallet for signing and broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl TransactionRequest {
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            value: U256::ZERO,
        }
    }
}

/// Minimal transaction receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,

    /// `true` when execution succeeded
    pub status: bool,

    pub block_number: Option<u64>,
}

/// Advisory: smart account balance was below the tip amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceWarning {
    pub balance: U256,
    pub required: U256,
}

/// Outcome of a submitted redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redemption {
    pub tx_hash: TxHash,
    pub balance_warning: Option<BalanceWarning>,
}
