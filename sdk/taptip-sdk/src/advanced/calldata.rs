use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
    interface ITipJar {
        function tipTo(address to, string note) external payable;
    }

    interface INonceEnforcer {
        function incrementNonce(address delegationManager) external;
        function currentNonce(address delegationManager, address delegator) external view returns (uint256);
    }

    interface IDelegationManager {
        function redeemDelegations(
            bytes[] permissionContexts,
            bytes32[] modes,
            bytes[] executionCallDatas
        ) external;
    }

    interface ISimpleFactory {
        function deploy(bytes creationCode, bytes32 salt) external returns (address);
    }

    interface IHybridDeleGator {
        function initialize(
            address owner,
            string[] keyIds,
            uint256[] xValues,
            uint256[] yValues
        ) external;
    }
}

/// Selector of `tipTo(address,string)`, the only function a tip delegation may call
pub const TIP_TO_SELECTOR: FixedBytes<4> = FixedBytes(ITipJar::tipToCall::SELECTOR);

/// Selector of `incrementNonce(address)`, the only call a revocation delegation allows
pub const INCREMENT_NONCE_SELECTOR: FixedBytes<4> =
    FixedBytes(INonceEnforcer::incrementNonceCall::SELECTOR);

pub fn tip_to(recipient: Address, message: &str) -> Bytes {
    ITipJar::tipToCall {
        to: recipient,
        note: message.to_string(),
    }
    .abi_encode()
    .into()
}

pub fn increment_nonce(delegation_manager: Address) -> Bytes {
    INonceEnforcer::incrementNonceCall {
        delegationManager: delegation_manager,
    }
    .abi_encode()
    .into()
}

pub fn current_nonce(delegation_manager: Address, delegator: Address) -> Bytes {
    INonceEnforcer::currentNonceCall {
        delegationManager: delegation_manager,
        delegator,
    }
    .abi_encode()
    .into()
}

/// Decode the `currentNonce` return word
pub fn decode_current_nonce(data: &[u8]) -> Result<U256, alloy_sol_types::Error> {
    INonceEnforcer::currentNonceCall::abi_decode_returns(data, true).map(|ret| ret._0)
}

pub fn redeem_delegations(
    permission_contexts: Vec<Bytes>,
    modes: Vec<B256>,
    execution_call_datas: Vec<Bytes>,
) -> Bytes {
    IDelegationManager::redeemDelegationsCall {
        permissionContexts: permission_contexts,
        modes,
        executionCallDatas: execution_call_datas,
    }
    .abi_encode()
    .into()
}

pub fn factory_deploy(creation_code: Bytes, salt: B256) -> Bytes {
    ISimpleFactory::deployCall {
        creationCode: creation_code,
        salt,
    }
    .abi_encode()
    .into()
}

/// Hybrid account initializer with an EOA owner and no passkeys
pub fn hybrid_initialize(owner: Address) -> Bytes {
    IHybridDeleGator::initializeCall {
        owner,
        keyIds: Vec::new(),
        xValues: Vec::new(),
        yValues: Vec::new(),
    }
    .abi_encode()
    .into()
}
