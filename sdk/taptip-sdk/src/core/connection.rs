use alloy_primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use std::error::Error;

use crate::types::TxReceipt;

/// Read access to chain state plus receipt polling.
///
/// Submission goes through a [`WalletClient`](crate::core::signer::WalletClient),
/// which decides who pays gas.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, Box<dyn Error + Send + Sync>>;
    async fn get_code(&self, address: &Address) -> Result<Bytes, Box<dyn Error + Send + Sync>>;
    async fn get_balance(&self, address: &Address) -> Result<U256, Box<dyn Error + Send + Sync>>;

    /// Read-only call (`eth_call`) against the latest block.
    async fn call(&self, to: &Address, data: Bytes) -> Result<Bytes, Box<dyn Error + Send + Sync>>;

    /// Wait until the transaction is mined.
    async fn wait_for_receipt(
        &self,
        tx_hash: &TxHash,
    ) -> Result<TxReceipt, Box<dyn Error + Send + Sync>>;
}
