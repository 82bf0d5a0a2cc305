use alloy_primitives::{Address, TxHash, U256};
use std::sync::Arc;
use tracing::debug;

use crate::advanced::codec::{DelegationCodec, FrameworkCodec};
use crate::basic::account::{AccountDescriptor, HybridAccount, SmartAccountResolver};
use crate::basic::authorizer::DelegationAuthorizer;
use crate::basic::redeemer::TipRedeemer;
use crate::basic::revocation::RevocationManager;
use crate::config::TapTipConfig;
use crate::core::clock::{Clock, SystemClock};
use crate::core::connection::ChainClient;
use crate::core::signer::{DelegationSigner, WalletClient};
use crate::core::store::DelegationStore;
use crate::error::{Result, TapTipError};
use crate::types::{AccountState, CacheRecord, Redemption, SignedDelegation};
use crate::utils;

pub struct TapToTipBuilder {
    config: Option<TapTipConfig>,
    connection: Option<Arc<dyn ChainClient>>,
    relay: Option<Arc<dyn WalletClient>>,
    store: Option<Arc<DelegationStore>>,
    codec: Option<Arc<dyn DelegationCodec>>,
    clock: Option<Arc<dyn Clock>>,
}

impl TapToTipBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            connection: None,
            relay: None,
            store: None,
            codec: None,
            clock: None,
        }
    }

    pub fn with_config(mut self, config: TapTipConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_connection(mut self, connection: Arc<dyn ChainClient>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Fixed delegate that submits redemptions and pays gas
    pub fn with_relay(mut self, relay: Arc<dyn WalletClient>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn with_store(mut self, store: Arc<DelegationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn DelegationCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<TapToTip> {
        let config = Arc::new(
            self.config
                .ok_or_else(|| TapTipError::Config("config required".to_string()))?,
        );
        let connection = self
            .connection
            .ok_or_else(|| TapTipError::Config("chain connection required".to_string()))?;
        let relay = self.relay.ok_or(TapTipError::MissingRelayConfiguration)?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(DelegationStore::in_memory()));
        let codec = self.codec.unwrap_or_else(|| {
            Arc::new(FrameworkCodec::new(
                config.chain_id,
                config.environment.clone(),
            ))
        });
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let delegate = relay.address();

        Ok(TapToTip {
            connection: connection.clone(),
            resolver: SmartAccountResolver::new(connection.clone()),
            authorizer: DelegationAuthorizer::new(
                config.clone(),
                connection.clone(),
                codec.clone(),
                store.clone(),
                clock.clone(),
                delegate,
            ),
            redeemer: TipRedeemer::new(
                config.clone(),
                connection.clone(),
                codec.clone(),
                store.clone(),
                clock.clone(),
                relay,
            ),
            revocation: RevocationManager::new(
                config.clone(),
                connection,
                codec,
                store.clone(),
                clock.clone(),
                delegate,
            ),
            nonce_tag: config.default_nonce_tag.clone(),
            config,
            store,
            clock,
            wallet: None,
            active: None,
            status: String::new(),
        })
    }
}

impl Default for TapToTipBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One wallet session of the tap-to-tip flow.
///
/// Calls take `&mut self`, so one session runs one operation at a time.
/// Sessions sharing a [`DelegationStore`] are serialized per cache key.
pub struct TapToTip {
    config: Arc<TapTipConfig>,
    connection: Arc<dyn ChainClient>,
    resolver: SmartAccountResolver,
    authorizer: DelegationAuthorizer,
    redeemer: TipRedeemer,
    revocation: RevocationManager,
    store: Arc<DelegationStore>,
    clock: Arc<dyn Clock>,
    wallet: Option<Arc<dyn WalletClient>>,
    active: Option<CacheRecord>,
    nonce_tag: String,
    status: String,
}

impl TapToTip {
    pub fn builder() -> TapToTipBuilder {
        TapToTipBuilder::new()
    }

    /// Connect an owner wallet using the configured hybrid account type, then hydrate.
    pub async fn connect(
        &mut self,
        signer: Arc<dyn DelegationSigner>,
        wallet: Arc<dyn WalletClient>,
    ) -> Result<AccountState> {
        let deployment = self
            .config
            .hybrid
            .clone()
            .ok_or_else(|| TapTipError::Config("hybrid deployment not configured".to_string()))?;
        let descriptor = Arc::new(HybridAccount::new(signer.address(), deployment));
        self.connect_with(descriptor, signer, wallet).await
    }

    /// Connect with an explicit account descriptor, then hydrate.
    ///
    /// Fails with `Config` when the connection's chain id differs from the configured one.
    pub async fn connect_with(
        &mut self,
        descriptor: Arc<dyn AccountDescriptor>,
        signer: Arc<dyn DelegationSigner>,
        wallet: Arc<dyn WalletClient>,
    ) -> Result<AccountState> {
        let chain_id = self
            .connection
            .chain_id()
            .await
            .map_err(|e| TapTipError::Connection(e.to_string()))?;
        if chain_id != self.config.chain_id {
            return Err(TapTipError::Config(format!(
                "connected to chain {chain_id}, configured for {}",
                self.config.chain_id
            )));
        }

        self.wallet = Some(wallet);
        self.active = None;
        let state = self.resolver.resolve(descriptor, signer).await;
        if state.is_ready() {
            self.hydrate()?;
        }
        Ok(state)
    }

    /// Forget the wallet session. Cached delegations stay persisted.
    pub fn disconnect(&mut self) {
        self.wallet = None;
        self.active = None;
        self.status.clear();
        self.resolver.reset();
    }

    /// Load the cached delegation for the current account, dropping it if expired.
    pub fn hydrate(&mut self) -> Result<Option<&SignedDelegation>> {
        let account = self.resolver.account()?;
        let key = self.authorizer.cache_key(account.address);

        self.active = self.store.load_active(&key, self.clock.now_unix())?;
        if let Some(record) = &self.active {
            debug!(key = %key, expires_at = record.expires_at, "hydrated cached delegation");
            self.nonce_tag = record.nonce_tag.clone();
        }
        Ok(self.signed_delegation())
    }

    /// Sign and cache a new grant valid for `ttl_days` (config default when `None`)
    pub async fn authorize(&mut self, ttl_days: Option<u32>) -> Result<SignedDelegation> {
        self.resolver.account()?;
        let wallet = self.wallet.clone().ok_or(TapTipError::NotSignedIn)?;
        let ttl_days = ttl_days.unwrap_or(self.config.default_ttl_days);

        let record = self
            .authorizer
            .authorize(&mut self.resolver, wallet.as_ref(), ttl_days, &self.nonce_tag)
            .await?;

        self.nonce_tag = record.nonce_tag.clone();
        self.status = format!("Authorized until {}", record.expires_at);
        let signed = record.signed_delegation.clone();
        self.active = Some(record);
        Ok(signed)
    }

    /// Tip `amount` ether (decimal string, e.g. `"0.01"`) to `recipient`
    pub async fn redeem(
        &mut self,
        recipient: Address,
        amount: &str,
        message: &str,
    ) -> Result<Redemption> {
        let amount = utils::parse_amount(amount)?;
        self.redeem_wei(recipient, amount, message).await
    }

    pub async fn redeem_wei(
        &mut self,
        recipient: Address,
        amount: U256,
        message: &str,
    ) -> Result<Redemption> {
        self.status = "Submitting redemption…".to_string();

        let result = self
            .redeemer
            .redeem(&self.resolver, recipient, amount, message)
            .await;
        match result {
            Ok(redemption) => {
                self.status = format!("Redemption submitted: {}", redemption.tx_hash);
                Ok(redemption)
            },
            Err(e) => {
                if matches!(e, TapTipError::NoActiveDelegation) {
                    self.active = None;
                }
                self.status = format!("Redemption failed: {e}");
                Err(e)
            },
        }
    }

    /// Advance the revocation epoch and clear the local grant
    pub async fn revoke_all(&mut self) -> Result<TxHash> {
        self.status = "Revoking…".to_string();

        let result = self
            .revocation
            .revoke_all(&mut self.resolver, self.wallet.as_deref())
            .await;
        match result {
            Ok(tx_hash) => {
                self.active = None;
                self.status = "Revoked (nonce incremented)".to_string();
                Ok(tx_hash)
            },
            Err(e) => {
                self.status = format!("Revocation failed: {e}");
                Err(e)
            },
        }
    }

    pub fn has_valid_delegation(&self) -> bool {
        utils::has_valid_delegation(self.expires_at(), self.clock.now_unix())
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.active.as_ref().map(|record| record.expires_at)
    }

    pub fn signed_delegation(&self) -> Option<&SignedDelegation> {
        self.active.as_ref().map(|record| &record.signed_delegation)
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn nonce_tag(&self) -> &str {
        &self.nonce_tag
    }

    pub fn set_nonce_tag(&mut self, tag: impl Into<String>) {
        self.nonce_tag = tag.into();
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn account_state(&self) -> &AccountState {
        self.resolver.state()
    }

    pub fn delegate(&self) -> Address {
        self.authorizer.delegate()
    }
}
