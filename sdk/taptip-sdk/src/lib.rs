pub mod advanced;
pub mod basic;
pub mod config;
pub mod core;
pub mod error;
pub mod types;
pub mod utils;

pub use crate::basic::account::{
    AccountDescriptor, ExternalAccount, FactoryArgs, HybridAccount, SmartAccountResolver,
};
pub use crate::basic::authorizer::DelegationAuthorizer;
pub use crate::basic::local::LocalKeySigner;
pub use crate::basic::redeemer::TipRedeemer;
pub use crate::basic::revocation::RevocationManager;
pub use crate::basic::session::{TapToTip, TapToTipBuilder};
pub use crate::config::{FrameworkEnvironment, HybridDeployment, TapTipConfig};
pub use crate::core::clock::{Clock, SystemClock};
pub use crate::core::connection::ChainClient;
pub use crate::core::signer::{DelegationSigner, WalletClient};
pub use crate::core::store::{CacheKey, DelegationStore, FileStore, KeyValueStore, MemoryStore};
pub use crate::error::{Result, TapTipError};
pub use crate::types::{
    AccountState, CacheRecord, Delegation, DelegationScope, Redemption, SignedDelegation,
    SmartAccount, ValidityWindow,
};
