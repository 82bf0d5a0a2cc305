use alloy_primitives::{Address, TxHash};
use thiserror::Error;

/// SDK-specific error types for tap-to-tip operations
#[derive(Debug, Error)]
pub enum TapTipError {
    /// Smart account has not been resolved yet
    #[error("Smart account not ready")]
    NotReady,

    /// The account type cannot describe its own deployment
    #[error("Account cannot be deployed: missing factory args")]
    MissingFactoryArgs,

    /// Factory transaction confirmed but no code was found at the address
    #[error("Deployment verification failed: no code at {0}")]
    DeploymentVerificationFailed(Address),

    /// No cached, unexpired delegation exists
    #[error("No active delegation, authorize first")]
    NoActiveDelegation,

    /// No owner wallet session is connected
    #[error("Not signed in")]
    NotSignedIn,

    /// Relay signer is not configured
    #[error("Relay signer is not configured")]
    MissingRelayConfiguration,

    /// Nonce enforcer address is not configured
    #[error("Nonce enforcer address is not configured")]
    MissingNonceEnforcer,

    /// Connection, RPC or submission error
    #[error("Connection error: {0}")]
    Connection(String),

    /// A confirmed transaction reverted on-chain
    #[error("Transaction reverted: {0}")]
    TransactionReverted(TxHash),

    /// Signer refused or failed to sign
    #[error("Signing error: {0}")]
    Signing(String),

    /// Amount string could not be parsed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Delegation cache could not be read or written
    #[error("Store error: {0}")]
    Store(String),

    /// Missing or malformed configuration
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TapTipError {
    /// Whether the caller can recover by waiting or re-authorizing.
    ///
    /// Configuration and deployment failures are fatal until fixed; chain
    /// submission failures are never retried automatically.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotReady | Self::NoActiveDelegation)
    }

    /// Configuration errors that stay fatal until the environment is fixed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotSignedIn
                | Self::MissingRelayConfiguration
                | Self::MissingNonceEnforcer
                | Self::Config(_)
        )
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, TapTipError>;
