use alloy_primitives::{keccak256, Address, Bytes};
use alloy_sol_types::SolValue;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::advanced::calldata;
use crate::config::HybridDeployment;
use crate::core::connection::ChainClient;
use crate::core::signer::{DelegationSigner, WalletClient};
use crate::error::{Result, TapTipError};
use crate::types::{AccountState, SmartAccount, TransactionRequest};
use crate::utils;

/// Factory call that deploys an account at its counterfactual address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryArgs {
    pub factory: Address,
    pub factory_data: Bytes,
}

/// Describes a smart account derived from an owner credential
pub trait AccountDescriptor: Send + Sync {
    fn owner(&self) -> Address;

    /// Deterministic account address
    fn address(&self) -> Address;

    /// `None` when the account type cannot describe its own deployment
    fn factory_args(&self) -> Option<FactoryArgs>;
}

/// Hybrid account behind an ERC-1967 proxy, deployed by CREATE2 through a factory
#[derive(Debug, Clone)]
pub struct HybridAccount {
    owner: Address,
    deployment: HybridDeployment,
    init_code: Bytes,
    address: Address,
}

impl HybridAccount {
    pub fn new(owner: Address, deployment: HybridDeployment) -> Self {
        // creationCode || abi.encode(implementation, initialize(owner, [], [], []))
        let constructor_args = (
            deployment.implementation,
            calldata::hybrid_initialize(owner),
        )
            .abi_encode_params();

        let mut init_code = deployment.proxy_creation_code.to_vec();
        init_code.extend_from_slice(&constructor_args);

        let address = deployment
            .factory
            .create2_from_code(deployment.salt.0, &init_code);

        Self {
            owner,
            deployment,
            init_code: Bytes::from(init_code),
            address,
        }
    }

    pub fn init_code(&self) -> &Bytes {
        &self.init_code
    }

    pub fn init_code_hash(&self) -> alloy_primitives::B256 {
        keccak256(&self.init_code)
    }
}

impl AccountDescriptor for HybridAccount {
    fn owner(&self) -> Address {
        self.owner
    }

    fn address(&self) -> Address {
        self.address
    }

    fn factory_args(&self) -> Option<FactoryArgs> {
        Some(FactoryArgs {
            factory: self.deployment.factory,
            factory_data: calldata::factory_deploy(self.init_code.clone(), self.deployment.salt),
        })
    }
}

/// Account known only by address; cannot deploy itself
#[derive(Debug, Clone, Copy)]
pub struct ExternalAccount {
    pub owner: Address,
    pub address: Address,
}

impl AccountDescriptor for ExternalAccount {
    fn owner(&self) -> Address {
        self.owner
    }

    fn address(&self) -> Address {
        self.address
    }

    fn factory_args(&self) -> Option<FactoryArgs> {
        None
    }
}

/// Resolves the session's smart account and tracks its deployment.
pub struct SmartAccountResolver {
    connection: Arc<dyn ChainClient>,
    descriptor: Option<Arc<dyn AccountDescriptor>>,
    signer: Option<Arc<dyn DelegationSigner>>,
    state: AccountState,
}

impl SmartAccountResolver {
    pub fn new(connection: Arc<dyn ChainClient>) -> Self {
        Self {
            connection,
            descriptor: None,
            signer: None,
            state: AccountState::Resolving,
        }
    }

    pub fn state(&self) -> &AccountState {
        &self.state
    }

    /// Drop the resolved account and signer
    pub fn reset(&mut self) {
        self.descriptor = None;
        self.signer = None;
        self.state = AccountState::Resolving;
    }

    /// The ready account, or `NotReady`
    pub fn account(&self) -> Result<SmartAccount> {
        self.state.ready().copied().ok_or(TapTipError::NotReady)
    }

    /// The account's signing capability, or `NotReady`
    pub fn signer(&self) -> Result<Arc<dyn DelegationSigner>> {
        self.account()?;
        self.signer.clone().ok_or(TapTipError::NotReady)
    }

    /// Resolve `descriptor` for the owner behind `signer` and read its deployment status.
    ///
    /// Resolving again with the same owner yields the same address.
    pub async fn resolve(
        &mut self,
        descriptor: Arc<dyn AccountDescriptor>,
        signer: Arc<dyn DelegationSigner>,
    ) -> AccountState {
        self.state = AccountState::Resolving;

        if descriptor.owner() != signer.address() {
            let message = format!(
                "signer {} does not own account {}",
                signer.address(),
                descriptor.address()
            );
            warn!(%message, "smart account resolution failed");
            self.state = AccountState::Error(message);
            return self.state.clone();
        }

        let owner = descriptor.owner();
        let address = descriptor.address();
        self.state = match utils::fetch_deployed(self.connection.as_ref(), &address).await {
            Ok(deployed) => {
                debug!(%address, deployed, "resolved smart account");
                self.descriptor = Some(descriptor);
                self.signer = Some(signer);
                AccountState::Ready(SmartAccount {
                    owner,
                    address,
                    deployed,
                })
            },
            Err(e) => {
                warn!(%address, error = %e, "smart account resolution failed");
                AccountState::Error(e.to_string())
            },
        };
        self.state.clone()
    }

    /// Re-read on-chain code for the ready account
    pub async fn refresh(&mut self) -> Result<SmartAccount> {
        let mut account = self.account()?;
        account.deployed = utils::fetch_deployed(self.connection.as_ref(), &account.address).await?;
        self.state = AccountState::Ready(account);
        Ok(account)
    }

    /// Deploy the account through its factory using `funded` to pay gas.
    ///
    /// No-op when code already exists. Submits one transaction otherwise and
    /// waits for it before verifying the code.
    pub async fn deploy(&mut self, funded: &dyn WalletClient) -> Result<SmartAccount> {
        let account = self.refresh().await?;
        if account.deployed {
            return Ok(account);
        }

        let args = self
            .descriptor
            .as_ref()
            .and_then(|d| d.factory_args())
            .ok_or(TapTipError::MissingFactoryArgs)?;

        info!(address = %account.address, factory = %args.factory, "deploying smart account");
        let tx_hash = funded
            .send_transaction(TransactionRequest::call(args.factory, args.factory_data))
            .await
            .map_err(|e| TapTipError::Connection(e.to_string()))?;

        let receipt = self
            .connection
            .wait_for_receipt(&tx_hash)
            .await
            .map_err(|e| TapTipError::Connection(e.to_string()))?;
        if !receipt.status {
            return Err(TapTipError::TransactionReverted(tx_hash));
        }

        let deployed = self.refresh().await?;
        if !deployed.deployed {
            return Err(TapTipError::DeploymentVerificationFailed(deployed.address));
        }

        info!(
            address = %deployed.address,
            %tx_hash,
            block = ?receipt.block_number,
            "smart account deployed"
        );
        Ok(deployed)
    }
}
