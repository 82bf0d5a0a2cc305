//! Delegation encoding: construction, EIP-712 hashing and redemption calldata.
//!
//! The SDK treats this as a black-box codec behind [`DelegationCodec`];
//! [`FrameworkCodec`] targets the delegation framework's `DelegationManager`.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct, SolValue};
use std::borrow::Cow;

use crate::advanced::calldata;
use crate::advanced::caveats::CaveatBuilder;
use crate::config::FrameworkEnvironment;
use crate::core::constants::{ROOT_AUTHORITY, SINGLE_DEFAULT_MODE};
use crate::types::{Delegation, DelegationRequest, Execution, SignedDelegation};

mod eip712 {
    alloy_sol_types::sol! {
        struct Caveat {
            address enforcer;
            bytes terms;
        }

        struct Delegation {
            address delegate;
            address delegator;
            bytes32 authority;
            Caveat[] caveats;
            uint256 salt;
        }
    }
}

mod abi {
    alloy_sol_types::sol! {
        struct Caveat {
            address enforcer;
            bytes terms;
            bytes args;
        }

        struct Delegation {
            address delegate;
            address delegator;
            bytes32 authority;
            Caveat[] caveats;
            uint256 salt;
            bytes signature;
        }
    }
}

/// Pure functions to build, hash and encode delegations
pub trait DelegationCodec: Send + Sync {
    /// Contract that redemption payloads are addressed to
    fn delegation_manager(&self) -> Address;

    fn build_delegation(&self, request: &DelegationRequest) -> Delegation;

    /// Digest the delegator's signer must sign
    fn signing_hash(&self, delegation: &Delegation) -> B256;

    fn build_execution(&self, target: Address, value: U256, call_data: Bytes) -> Execution;

    /// Calldata for redeeming `signed` to run `execution`
    fn encode_redemption(&self, signed: &SignedDelegation, execution: &Execution) -> Bytes;
}

#[derive(Debug, Clone)]
pub struct FrameworkCodec {
    chain_id: u64,
    environment: FrameworkEnvironment,
}

impl FrameworkCodec {
    pub fn new(chain_id: u64, environment: FrameworkEnvironment) -> Self {
        Self {
            chain_id,
            environment,
        }
    }

    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some(Cow::Borrowed("DelegationManager")),
            Some(Cow::Borrowed("1")),
            Some(U256::from(self.chain_id)),
            Some(self.environment.delegation_manager),
            None,
        )
    }

    fn to_abi(signed: &SignedDelegation) -> abi::Delegation {
        let d = &signed.delegation;
        abi::Delegation {
            delegate: d.delegate,
            delegator: d.delegator,
            authority: d.authority,
            caveats: d
                .caveats
                .iter()
                .map(|c| abi::Caveat {
                    enforcer: c.enforcer,
                    terms: c.terms.clone(),
                    args: c.args.clone(),
                })
                .collect(),
            salt: d.salt,
            signature: signed.signature.clone(),
        }
    }
}

impl DelegationCodec for FrameworkCodec {
    fn delegation_manager(&self) -> Address {
        self.environment.delegation_manager
    }

    fn build_delegation(&self, request: &DelegationRequest) -> Delegation {
        let env = &self.environment;
        let mut caveats = CaveatBuilder::new()
            .allowed_targets(env.allowed_targets_enforcer, &[request.scope.target_contract])
            .allowed_methods(env.allowed_methods_enforcer, &[request.scope.selector])
            .timestamp(
                env.timestamp_enforcer,
                request.validity.not_before_unix,
                request.validity.not_after_unix,
            );

        if let (Some(enforcer), Some(nonce)) = (env.nonce_enforcer, request.nonce) {
            caveats = caveats.nonce(enforcer, nonce);
        }

        Delegation {
            delegator: request.delegator,
            delegate: request.delegate,
            authority: ROOT_AUTHORITY,
            scope: request.scope,
            validity: request.validity,
            caveats: caveats.build(),
            salt: request.salt,
        }
    }

    fn signing_hash(&self, delegation: &Delegation) -> B256 {
        let typed = eip712::Delegation {
            delegate: delegation.delegate,
            delegator: delegation.delegator,
            authority: delegation.authority,
            caveats: delegation
                .caveats
                .iter()
                .map(|c| eip712::Caveat {
                    enforcer: c.enforcer,
                    terms: c.terms.clone(),
                })
                .collect(),
            salt: delegation.salt,
        };
        typed.eip712_signing_hash(&self.domain())
    }

    fn build_execution(&self, target: Address, value: U256, call_data: Bytes) -> Execution {
        Execution {
            target,
            value,
            call_data,
        }
    }

    fn encode_redemption(&self, signed: &SignedDelegation, execution: &Execution) -> Bytes {
        // abi.encode(Delegation[]) with the leaf delegation only
        let permission_context = vec![Self::to_abi(signed)].abi_encode();

        // Single execution: target || value || callData
        let mut execution_data = Vec::with_capacity(20 + 32 + execution.call_data.len());
        execution_data.extend_from_slice(execution.target.as_slice());
        execution_data.extend_from_slice(&execution.value.to_be_bytes::<32>());
        execution_data.extend_from_slice(&execution.call_data);

        calldata::redeem_delegations(
            vec![Bytes::from(permission_context)],
            vec![SINGLE_DEFAULT_MODE],
            vec![Bytes::from(execution_data)],
        )
    }
}
