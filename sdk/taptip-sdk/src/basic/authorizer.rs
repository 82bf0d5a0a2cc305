use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::advanced::calldata::{self, TIP_TO_SELECTOR};
use crate::advanced::codec::DelegationCodec;
use crate::basic::account::SmartAccountResolver;
use crate::config::TapTipConfig;
use crate::core::clock::Clock;
use crate::core::connection::ChainClient;
use crate::core::signer::WalletClient;
use crate::core::store::{CacheKey, DelegationStore};
use crate::error::{Result, TapTipError};
use crate::types::{CacheRecord, DelegationRequest, DelegationScope, SignedDelegation};
use crate::utils;

/// Creates scoped, time-boxed delegations from the smart account to the relay
pub struct DelegationAuthorizer {
    config: Arc<TapTipConfig>,
    connection: Arc<dyn ChainClient>,
    codec: Arc<dyn DelegationCodec>,
    store: Arc<DelegationStore>,
    clock: Arc<dyn Clock>,
    delegate: Address,
}

impl DelegationAuthorizer {
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

    pub fn delegate(&self) -> Address {
        self.delegate
    }

    /// Cache slot for delegations from `delegator` to this authorizer's delegate
    pub fn cache_key(&self, delegator: Address) -> CacheKey {
        DelegationStore::cache_key(self.config.chain_id, delegator, self.delegate, self.config.tip_jar)
    }

    /// The only thing a tip delegation may be used for
    pub fn scope(&self) -> DelegationScope {
        DelegationScope {
            target_contract: self.config.tip_jar,
            selector: TIP_TO_SELECTOR,
        }
    }

    /// Sign a fresh delegation valid for `ttl_days` and cache it.
    ///
    /// Deploys the account first if needed (the manager validates signatures
    /// against deployed code). Overwrites any cached grant for the same key.
    /// `nonce_tag` is recorded as-is unless a nonce enforcer is configured, in
    /// which case the current on-chain epoch is bound and recorded instead.
    pub async fn authorize(
        &self,
        resolver: &mut SmartAccountResolver,
        funded: &dyn WalletClient,
        ttl_days: u32,
        nonce_tag: &str,
    ) -> Result<CacheRecord> {
        let account = resolver.account()?;
        let key = self.cache_key(account.address);
        let _guard = self.store.lock(&key).await;

        let account = resolver.deploy(funded).await?;
        let signer = resolver.signer()?;

        let now = self.clock.now_unix();
        let validity = utils::validity_window(now, ttl_days);

        let (nonce, nonce_tag) = match self.config.environment.nonce_enforcer {
            Some(enforcer) => {
                let epoch = self.current_epoch(enforcer, account.address).await?;
                (Some(epoch), format!("{epoch:#x}"))
            },
            None => (None, nonce_tag.to_string()),
        };

        let delegation = self.codec.build_delegation(&DelegationRequest {
            delegator: account.address,
            delegate: self.delegate,
            scope: self.scope(),
            validity,
            nonce,
            salt: U256::from(now),
        });

        let hash = self.codec.signing_hash(&delegation);
        debug!(delegator = %account.address, %hash, "requesting delegation signature");
        let signature = signer
            .sign_hash(&hash)
            .await
            .map_err(|e| TapTipError::Signing(e.to_string()))?;

        let record = CacheRecord {
            signed_delegation: SignedDelegation {
                delegation,
                signature,
            },
            expires_at: validity.not_after_unix,
            nonce_tag,
        };
        self.store.save(&key, &record)?;

        info!(
            delegator = %account.address,
            delegate = %self.delegate,
            expires_at = record.expires_at,
            nonce_tag = %record.nonce_tag,
            "delegation authorized"
        );
        Ok(record)
    }

    async fn current_epoch(&self, enforcer: Address, delegator: Address) -> Result<U256> {
        let data = calldata::current_nonce(self.codec.delegation_manager(), delegator);
        let ret = self
            .connection
            .call(&enforcer, data)
            .await
            .map_err(|e| TapTipError::Connection(e.to_string()))?;
        calldata::decode_current_nonce(&ret).map_err(|e| TapTipError::Connection(e.to_string()))
    }
}
