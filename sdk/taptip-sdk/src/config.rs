use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::core::constants::{
    DEFAULT_CHAIN_ID, DEFAULT_NONCE_TAG, DEFAULT_TIP_JAR, DEFAULT_TTL_DAYS,
};
use crate::error::{Result, TapTipError};

/// Deployed delegation-framework contracts on the target chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkEnvironment {
    pub delegation_manager: Address,
    pub allowed_targets_enforcer: Address,
    pub allowed_methods_enforcer: Address,
    pub timestamp_enforcer: Address,

    /// Required for bulk revocation; optional for authorize/redeem
    #[serde(default)]
    pub nonce_enforcer: Option<Address>,
}

/// Factory parameters for counterfactual hybrid accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridDeployment {
    pub factory: Address,
    pub implementation: Address,

    /// ERC-1967 proxy creation code; constructor args are appended
    pub proxy_creation_code: Bytes,

    #[serde(default)]
    pub salt: B256,
}

/// Configuration handed to every component constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapTipConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    #[serde(default = "default_tip_jar")]
    pub tip_jar: Address,

    pub environment: FrameworkEnvironment,

    #[serde(default)]
    pub hybrid: Option<HybridDeployment>,

    #[serde(default = "default_ttl_days")]
    pub default_ttl_days: u32,

    #[serde(default = "default_nonce_tag")]
    pub default_nonce_tag: String,
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_tip_jar() -> Address {
    DEFAULT_TIP_JAR
}

fn default_ttl_days() -> u32 {
    DEFAULT_TTL_DAYS
}

fn default_nonce_tag() -> String {
    DEFAULT_NONCE_TAG.to_string()
}

impl TapTipConfig {
    pub fn new(environment: FrameworkEnvironment) -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            tip_jar: DEFAULT_TIP_JAR,
            environment,
            hybrid: None,
            default_ttl_days: DEFAULT_TTL_DAYS,
            default_nonce_tag: DEFAULT_NONCE_TAG.to_string(),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_tip_jar(mut self, tip_jar: Address) -> Self {
        self.tip_jar = tip_jar;
        self
    }

    pub fn with_hybrid(mut self, hybrid: HybridDeployment) -> Self {
        self.hybrid = Some(hybrid);
        self
    }

    pub fn from_json_str(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Load from `TAPTIP_*` environment variables, reading `.env` first if present.
    ///
    /// Required: `TAPTIP_DELEGATION_MANAGER`, `TAPTIP_ALLOWED_TARGETS_ENFORCER`,
    /// `TAPTIP_ALLOWED_METHODS_ENFORCER`, `TAPTIP_TIMESTAMP_ENFORCER`.
    /// Hybrid deployment is enabled when `TAPTIP_HYBRID_FACTORY` is set.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let environment = FrameworkEnvironment {
            delegation_manager: required("TAPTIP_DELEGATION_MANAGER")?,
            allowed_targets_enforcer: required("TAPTIP_ALLOWED_TARGETS_ENFORCER")?,
            allowed_methods_enforcer: required("TAPTIP_ALLOWED_METHODS_ENFORCER")?,
            timestamp_enforcer: required("TAPTIP_TIMESTAMP_ENFORCER")?,
            nonce_enforcer: optional("TAPTIP_NONCE_ENFORCER")?,
        };

        let hybrid = match optional::<Address>("TAPTIP_HYBRID_FACTORY")? {
            Some(factory) => Some(HybridDeployment {
                factory,
                implementation: required("TAPTIP_HYBRID_IMPLEMENTATION")?,
                proxy_creation_code: required("TAPTIP_PROXY_CREATION_CODE")?,
                salt: optional("TAPTIP_DEPLOY_SALT")?.unwrap_or_default(),
            }),
            None => None,
        };

        Ok(Self {
            chain_id: optional("TAPTIP_CHAIN_ID")?.unwrap_or(DEFAULT_CHAIN_ID),
            tip_jar: optional("TAPTIP_TIP_JAR")?.unwrap_or(DEFAULT_TIP_JAR),
            environment,
            hybrid,
            default_ttl_days: optional("TAPTIP_DEFAULT_TTL_DAYS")?.unwrap_or(DEFAULT_TTL_DAYS),
            default_nonce_tag: env::var("TAPTIP_NONCE_TAG")
                .unwrap_or_else(|_| DEFAULT_NONCE_TAG.to_string()),
        })
    }
}

fn optional<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| TapTipError::Config(format!("{name}: {e}"))),
        Err(_) => Ok(None),
    }
}

fn required<T>(name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional(name)?.ok_or_else(|| TapTipError::Config(format!("{name} is not set")))
}
