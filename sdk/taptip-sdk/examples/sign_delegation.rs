// Example: Signing a tip delegation offline
//
// This example demonstrates how to:
// 1. Load configuration from TAPTIP_* variables (or .env)
// 2. Derive the counterfactual hybrid account for an owner key
// 3. Build and sign a 30 day tipTo delegation to a relay
// 4. Encode the calldata the relay would submit

use alloy_primitives::{address, utils::parse_ether, U256};
use taptip_sdk::advanced::calldata;
use taptip_sdk::advanced::codec::{DelegationCodec, FrameworkCodec};
use taptip_sdk::types::{DelegationRequest, DelegationScope};
use taptip_sdk::utils::validity_window;
use taptip_sdk::{
    AccountDescriptor, Clock, HybridAccount, LocalKeySigner, SystemClock, TapTipConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 1. Configuration
    let config = TapTipConfig::from_env()?;
    let hybrid = config
        .hybrid
        .clone()
        .ok_or("set TAPTIP_HYBRID_FACTORY to derive the account")?;

    // 2. Owner key and smart account
    let owner = LocalKeySigner::from_hex(&std::env::var("TAPTIP_OWNER_KEY")?)?;
    let account = HybridAccount::new(owner.address(), hybrid);

    // 3. Delegation to the relay
    let relay = address!("00000000000000000000000000000000000000b0");
    let codec = FrameworkCodec::new(config.chain_id, config.environment.clone());
    let now = SystemClock.now_unix();

    let delegation = codec.build_delegation(&DelegationRequest {
        delegator: account.address(),
        delegate: relay,
        scope: DelegationScope {
            target_contract: config.tip_jar,
            selector: calldata::TIP_TO_SELECTOR,
        },
        validity: validity_window(now, config.default_ttl_days),
        nonce: None,
        salt: U256::from(now),
    });
    let hash = codec.signing_hash(&delegation);
    let signature = owner.sign_digest(&hash)?;

    println!("Tip delegation:");
    println!("  Owner: {}", owner.address());
    println!("  Smart account: {}", account.address());
    println!("  Relay: {}", relay);
    println!("  Valid until: {}", delegation.validity.not_after_unix);
    println!("  Digest: {}", hash);
    println!("  Signature: {}", signature);

    // 4. Redemption calldata for a 0.01 tip
    let signed = taptip_sdk::SignedDelegation {
        delegation,
        signature,
    };
    let execution = codec.build_execution(
        config.tip_jar,
        parse_ether("0.01")?,
        calldata::tip_to(relay, "thanks"),
    );
    let payload = codec.encode_redemption(&signed, &execution);
    println!("  redeemDelegations calldata: {} bytes", payload.len());

    // In a real application, you would:
    // let session = TapToTip::builder().with_connection(rpc).with_relay(relay_wallet)...;
    // session.redeem(recipient, "0.01", "thanks").await?;

    Ok(())
}
