use alloy_primitives::{Address, Bytes, TxHash, B256};
use async_trait::async_trait;
use std::error::Error;

use crate::types::TransactionRequest;

/// The smart account's signing capability.
/// The owner key signs the EIP-712 digest; the deployed account checks it via ERC-1271.
/// A signature request may wait on user interaction indefinitely; callers cancel by
/// dropping the future.
#[async_trait]
pub trait DelegationSigner: Send + Sync {
    /// Owner address behind this signer
    fn address(&self) -> Address;

    /// Sign a 32-byte digest, returning `r || s || v`.
    async fn sign_hash(&self, hash: &B256) -> Result<Bytes, Box<dyn Error + Send + Sync>>;
}

/// An account able to sign and broadcast transactions, paying gas.
/// Used both for the relay (delegate) and for the user's funded wallet.
#[async_trait]
pub trait WalletClient: Send + Sync {
    fn address(&self) -> Address;

    /// Sign and broadcast. Does not wait for inclusion.
    async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<TxHash, Box<dyn Error + Send + Sync>>;
}
