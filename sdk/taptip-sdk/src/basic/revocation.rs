use alloy_primitives::{Address, TxHash, U256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::advanced::calldata::{self, INCREMENT_NONCE_SELECTOR};
use crate::advanced::codec::DelegationCodec;
use crate::basic::account::SmartAccountResolver;
use crate::config::TapTipConfig;
use crate::core::clock::Clock;
use crate::core::connection::ChainClient;
use crate::core::constants::REVOCATION_TTL_SECONDS;
use crate::core::signer::WalletClient;
use crate::core::store::DelegationStore;
use crate::error::{Result, TapTipError};
use crate::types::{DelegationRequest, DelegationScope, SignedDelegation, TransactionRequest};
use crate::utils;

/// Bulk revocation by advancing the smart account's on-chain nonce epoch
pub struct RevocationManager {
    config: Arc<TapTipConfig>,
    connection: Arc<dyn ChainClient>,
    codec: Arc<dyn DelegationCodec>,
    store: Arc<DelegationStore>,
    clock: Arc<dyn Clock>,
    delegate: Address,
}

impl RevocationManager {
    pub fn new(
        config: Arc<TapTipConfig>,
        connection: Arc<dyn ChainClient>,
        codec: Arc<dyn DelegationCodec>,
        store: Arc<DelegationStore>,
        clock: Arc<dyn Clock>,
        delegate: Address,
    ) -> Self {
        Self {
            config,
            connection,
            codec,
            store,
            clock,
            delegate,
        }
    }

    /// Increment the nonce for (delegation manager, smart account) and wait for it.
    ///
    /// The enforcer checks the delegator's counter, so the bump has to come from
    /// the smart account itself. The account signs a short-lived delegation to
    /// the owner wallet allowing only `incrementNonce`, and the owner redeems it
    /// through the delegation manager, paying gas.
    ///
    /// Every delegation bound to the previous epoch becomes unredeemable.
    /// The local cache entry is cleared only after confirmation.
    pub async fn revoke_all(
        &self,
        resolver: &mut SmartAccountResolver,
        owner: Option<&dyn WalletClient>,
    ) -> Result<TxHash> {
        let owner = owner.ok_or(TapTipError::NotSignedIn)?;
        let enforcer = self
            .config
            .environment
            .nonce_enforcer
            .ok_or(TapTipError::MissingNonceEnforcer)?;

        let account = resolver.account()?;
        let key = DelegationStore::cache_key(
            self.config.chain_id,
            account.address,
            self.delegate,
            self.config.tip_jar,
        );
        let _guard = self.store.lock(&key).await;

        // An undeployed account could still be deployed later and honor old signatures
        let account = resolver.deploy(owner).await?;
        let signer = resolver.signer()?;

        let now = self.clock.now_unix();
        let delegation = self.codec.build_delegation(&DelegationRequest {
            delegator: account.address,
            delegate: owner.address(),
            scope: DelegationScope {
                target_contract: enforcer,
                selector: INCREMENT_NONCE_SELECTOR,
            },
            validity: utils::window_for_seconds(now, REVOCATION_TTL_SECONDS),
            nonce: None,
            salt: U256::from(now),
        });

        let hash = self.codec.signing_hash(&delegation);
        debug!(delegator = %account.address, %hash, "requesting revocation signature");
        let signature = signer
            .sign_hash(&hash)
            .await
            .map_err(|e| TapTipError::Signing(e.to_string()))?;

        let execution = self.codec.build_execution(
            enforcer,
            U256::ZERO,
            calldata::increment_nonce(self.codec.delegation_manager()),
        );
        let payload = self.codec.encode_redemption(
            &SignedDelegation {
                delegation,
                signature,
            },
            &execution,
        );

        let tx_hash = owner
            .send_transaction(TransactionRequest::call(self.codec.delegation_manager(), payload))
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

        self.store.clear(&key)?;

        info!(
            delegator = %account.address,
            owner = %owner.address(),
            %tx_hash,
            block = ?receipt.block_number,
            "delegations revoked"
        );
        Ok(tx_hash)
    }
}
