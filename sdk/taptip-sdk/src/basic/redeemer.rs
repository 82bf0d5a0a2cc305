use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::{info, warn};

use crate::advanced::calldata;
use crate::advanced::codec::DelegationCodec;
use crate::basic::account::SmartAccountResolver;
use crate::config::TapTipConfig;
use crate::core::clock::Clock;
use crate::core::connection::ChainClient;
use crate::core::signer::WalletClient;
use crate::core::store::DelegationStore;
use crate::error::{Result, TapTipError};
use crate::types::{BalanceWarning, Redemption, TransactionRequest};

/// Spends a cached delegation: the relay submits and pays gas, the tip value
/// comes out of the smart account.
pub struct TipRedeemer {
    config: Arc<TapTipConfig>,
    connection: Arc<dyn ChainClient>,
    codec: Arc<dyn DelegationCodec>,
    store: Arc<DelegationStore>,
    clock: Arc<dyn Clock>,
    relay: Arc<dyn WalletClient>,
}

impl TipRedeemer {
    pub fn new(
        config: Arc<TapTipConfig>,
        connection: Arc<dyn ChainClient>,
        codec: Arc<dyn DelegationCodec>,
        store: Arc<DelegationStore>,
        clock: Arc<dyn Clock>,
        relay: Arc<dyn WalletClient>,
    ) -> Self {
        Self {
            config,
            connection,
            codec,
            store,
            clock,
            relay,
        }
    }

    /// Submit one redemption sending `amount` wei to `recipient` through the tip jar.
    ///
    /// Returns as soon as the relay has broadcast; does not wait for inclusion
    /// and never retries. A low balance only produces a warning: the on-chain
    /// revert is the authoritative failure.
    pub async fn redeem(
        &self,
        resolver: &SmartAccountResolver,
        recipient: Address,
        amount: U256,
        message: &str,
    ) -> Result<Redemption> {
        let account = resolver.account()?;
        let key = DelegationStore::cache_key(
            self.config.chain_id,
            account.address,
            self.relay.address(),
            self.config.tip_jar,
        );

        let record = self
            .store
            .load_active(&key, self.clock.now_unix())?
            .ok_or(TapTipError::NoActiveDelegation)?;

        let balance_warning = self.check_balance(account.address, amount).await;

        let execution = self.codec.build_execution(
            self.config.tip_jar,
            amount,
            calldata::tip_to(recipient, message),
        );
        let payload = self
            .codec
            .encode_redemption(&record.signed_delegation, &execution);

        // Value travels inside the execution, not on the outer transaction
        let tx_hash = self
            .relay
            .send_transaction(TransactionRequest::call(self.codec.delegation_manager(), payload))
            .await
            .map_err(|e| TapTipError::Connection(e.to_string()))?;

        info!(
            delegator = %account.address,
            %recipient,
            %amount,
            %tx_hash,
            "redemption submitted"
        );
        Ok(Redemption {
            tx_hash,
            balance_warning,
        })
    }

    async fn check_balance(&self, account: Address, amount: U256) -> Option<BalanceWarning> {
        match self.connection.get_balance(&account).await {
            Ok(balance) if balance < amount => {
                warn!(%account, %balance, required = %amount, "smart account balance below tip amount");
                Some(BalanceWarning {
                    balance,
                    required: amount,
                })
            },
            Ok(_) => None,
            Err(e) => {
                warn!(%account, error = %e, "balance check failed, submitting anyway");
                None
            },
        }
    }
}
