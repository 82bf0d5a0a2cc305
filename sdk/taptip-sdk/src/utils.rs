use alloy_primitives::utils::parse_ether;
use alloy_primitives::{Address, U256};

use crate::core::connection::ChainClient;
use crate::core::constants::{CLOCK_SKEW_SECONDS, DAY_SECONDS, MAX_TIMESTAMP};
use crate::error::{Result, TapTipError};
use crate::types::ValidityWindow;

//=============================================================================
// Validity Window
//=============================================================================

/// Compute the validity window for a grant requested at `now`.
///
/// `notBefore = max(0, now - 5)`; `notAfter = min(now + ttl, MAX_TIMESTAMP)` where
/// `ttl` is `ttl_days` clamped to at least one day.
pub fn validity_window(now: u64, ttl_days: u32) -> ValidityWindow {
    let ttl = u64::from(ttl_days.max(1)).saturating_mul(DAY_SECONDS);
    window_for_seconds(now, ttl)
}

/// Window of `ttl` seconds (at least one) starting at `now`, with the same skew and clamp
pub fn window_for_seconds(now: u64, ttl: u64) -> ValidityWindow {
    let ttl = ttl.min(MAX_TIMESTAMP.saturating_sub(now)).max(1);

    ValidityWindow {
        not_before_unix: now.saturating_sub(CLOCK_SKEW_SECONDS),
        not_after_unix: now.saturating_add(ttl).min(MAX_TIMESTAMP),
    }
}

/// `hasValidDelegation` as a pure function of the cached expiry and the clock
pub fn has_valid_delegation(expires_at: Option<u64>, now: u64) -> bool {
    matches!(expires_at, Some(expires_at) if now < expires_at)
}

//=============================================================================
// Chain Helpers
//=============================================================================

/// Check whether code is deployed at `address`
pub async fn fetch_deployed(connection: &dyn ChainClient, address: &Address) -> Result<bool> {
    let code = connection
        .get_code(address)
        .await
        .map_err(|e| TapTipError::Connection(e.to_string()))?;
    Ok(!code.is_empty())
}

/// Parse a decimal ether amount (`"0.01"`) into wei
pub fn parse_amount(amount: &str) -> Result<U256> {
    parse_ether(amount.trim()).map_err(|e| TapTipError::InvalidAmount(format!("{amount}: {e}")))
}
