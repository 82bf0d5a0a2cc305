use alloy_primitives::{address, b256, Address, B256};

// Default tip jar on Monad testnet
pub const DEFAULT_TIP_JAR: Address = address!("d0C2Dd16fd7692A0d550d108ef0d928CD7091E8C");
pub const DEFAULT_CHAIN_ID: u64 = 10143;

pub const DAY_SECONDS: u64 = 24 * 60 * 60;

/// 9999-12-31T23:59:59Z
pub const MAX_TIMESTAMP: u64 = 253_402_300_799;

/// Clock-skew tolerance subtracted from `notBefore`
pub const CLOCK_SKEW_SECONDS: u64 = 5;

pub const DEFAULT_TTL_DAYS: u32 = 30;
pub const DEFAULT_NONCE_TAG: &str = "0x01";

/// Lifetime of the self-delegation used to advance the revocation epoch
pub const REVOCATION_TTL_SECONDS: u64 = 10 * 60;

/// Delegation signed directly by the delegator (no parent delegation)
pub const ROOT_AUTHORITY: B256 =
    b256!("ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff");

/// ERC-7579 single-call, revert-on-failure execution mode
pub const SINGLE_DEFAULT_MODE: B256 = B256::ZERO;

pub const CACHE_KEY_PREFIX: &str = "tapToTip:delegation:v1";
