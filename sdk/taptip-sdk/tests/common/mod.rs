use alloy_primitives::{address, keccak256, Address, Bytes, TxHash, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use taptip_sdk::core::clock::Clock;
use taptip_sdk::advanced::calldata::{IDelegationManager, INonceEnforcer};
use taptip_sdk::core::connection::ChainClient;
use taptip_sdk::core::signer::{DelegationSigner, WalletClient};
use taptip_sdk::core::store::DelegationStore;
use taptip_sdk::types::{TransactionRequest, TxReceipt};
use taptip_sdk::{
    AccountDescriptor, FrameworkEnvironment, HybridAccount, HybridDeployment, LocalKeySigner,
    TapTipConfig, TapToTip,
};

// Anvil dev account #0
pub const OWNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const DELEGATION_MANAGER: Address = address!("0000000000000000000000000000000000000d01");
pub const NONCE_ENFORCER: Address = address!("0000000000000000000000000000000000000e04");
pub const FACTORY: Address = address!("0000000000000000000000000000000000000f01");
pub const RELAY: Address = address!("00000000000000000000000000000000000000b0");
pub const RECIPIENT: Address = address!("00000000000000000000000000000000000000c0");

type BoxError = Box<dyn Error + Send + Sync>;

pub mod abi {
    alloy_sol_types::sol! {
        struct Caveat {
            address enforcer;
            bytes terms;
            bytes args;
        }

        struct Delegation {
            address delegate;
            address delegator;
            bytes32 authority;
            Caveat[] caveats;
            uint256 salt;
            bytes signature;
        }
    }
}

/// Split a single-mode execution into (target, value, callData)
pub fn split_execution(data: &[u8]) -> (Address, U256, Bytes) {
    let target = Address::from_slice(&data[..20]);
    let value = U256::from_be_slice(&data[20..52]);
    (target, value, Bytes::copy_from_slice(&data[52..]))
}

/// A transaction seen by the mock chain
#[derive(Debug, Clone)]
pub struct SentTx {
    pub from: Address,
    pub tx: TransactionRequest,
    pub hash: TxHash,
}

#[derive(Default)]
pub struct ChainState {
    pub code: HashMap<Address, Bytes>,
    pub balances: HashMap<Address, U256>,
    pub call_responses: HashMap<Address, Bytes>,
    pub receipts: HashMap<TxHash, bool>,
    pub sent: Vec<SentTx>,

    /// factory -> account address that gets code when the factory is called
    pub deploys: HashMap<Address, Address>,

    /// Enforcer modeled on-chain: `incrementNonce` bumps `[manager][msg.sender]`,
    /// `currentNonce` reads `[manager][delegator]`
    pub nonce_enforcer: Option<Address>,
    pub nonces: HashMap<(Address, Address), U256>,

    /// Defaults to 10143
    pub chain_id: Option<u64>,

    pub fail_sends: bool,
    pub fail_balance: bool,
    pub revert_next: bool,
    pub skip_deploy_code: bool,
}

/// In-memory chain: records submissions, deploys accounts on factory calls
#[derive(Default)]
pub struct MockChain {
    pub state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_code(&self, address: Address) {
        self.with_state(|s| s.code.insert(address, Bytes::from(vec![0x60, 0x80])));
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.with_state(|s| s.balances.insert(address, balance));
    }

    pub fn install_nonce_enforcer(&self, enforcer: Address) {
        self.with_state(|s| s.nonce_enforcer = Some(enforcer));
    }

    /// Epoch of `account` under the delegation manager
    pub fn nonce_of(&self, account: Address) -> U256 {
        self.with_state(|s| {
            s.nonces
                .get(&(DELEGATION_MANAGER, account))
                .copied()
                .unwrap_or_default()
        })
    }

    pub fn set_nonce(&self, account: Address, nonce: u64) {
        self.with_state(|s| s.nonces.insert((DELEGATION_MANAGER, account), U256::from(nonce)));
    }

    pub fn receipt_status(&self, hash: TxHash) -> Option<bool> {
        self.with_state(|s| s.receipts.get(&hash).copied())
    }

    pub fn deploy_on_call(&self, factory: Address, account: Address) {
        self.with_state(|s| s.deploys.insert(factory, account));
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.with_state(|s| s.sent.clone())
    }

    pub fn sent_from(&self, from: Address) -> Vec<SentTx> {
        self.sent().into_iter().filter(|t| t.from == from).collect()
    }

    fn submit(&self, from: Address, tx: TransactionRequest) -> Result<TxHash, BoxError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err("transaction rejected by node".into());
        }

        let mut preimage = from.to_vec();
        preimage.extend_from_slice(&(state.sent.len() as u64).to_be_bytes());
        let hash = keccak256(preimage);

        let mut reverted = std::mem::take(&mut state.revert_next);
        if !reverted {
            reverted = !state.execute(from, &tx);
        }

        state.receipts.insert(hash, !reverted);
        state.sent.push(SentTx { from, tx, hash });
        Ok(hash)
    }
}

impl ChainState {
    /// Apply `tx` from `from`; `false` when it reverts
    fn execute(&mut self, from: Address, tx: &TransactionRequest) -> bool {
        if let Some(account) = self.deploys.get(&tx.to).copied() {
            if !self.skip_deploy_code {
                self.code.insert(account, Bytes::from(vec![0x60, 0x80]));
            }
            return true;
        }

        let Some(enforcer) = self.nonce_enforcer else {
            return true;
        };

        if tx.to == enforcer {
            return self.increment_nonce(from, &tx.data);
        }

        if tx.to == DELEGATION_MANAGER {
            return self.redeem(&tx.data, enforcer);
        }

        true
    }

    fn increment_nonce(&mut self, sender: Address, data: &[u8]) -> bool {
        let Ok(call) = INonceEnforcer::incrementNonceCall::abi_decode(data, true) else {
            return false;
        };
        *self
            .nonces
            .entry((call.delegationManager, sender))
            .or_default() += U256::from(1);
        true
    }

    fn redeem(&mut self, data: &[u8], enforcer: Address) -> bool {
        let Ok(call) = IDelegationManager::redeemDelegationsCall::abi_decode(data, true) else {
            return false;
        };
        let Ok(chain) = Vec::<abi::Delegation>::abi_decode(&call.permissionContexts[0], true)
        else {
            return false;
        };
        let Some(leaf) = chain.first() else {
            return false;
        };

        let epoch = self
            .nonces
            .get(&(DELEGATION_MANAGER, leaf.delegator))
            .copied()
            .unwrap_or_default();
        let stale = leaf
            .caveats
            .iter()
            .filter(|c| c.enforcer == enforcer)
            .any(|c| U256::from_be_slice(&c.terms) != epoch);
        if stale {
            return false;
        }

        // The account executes, so it is msg.sender at the target
        let (target, _, inner) = split_execution(&call.executionCallDatas[0]);
        if target == enforcer {
            return self.increment_nonce(leaf.delegator, &inner);
        }
        true
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64, BoxError> {
        Ok(self.with_state(|s| s.chain_id.unwrap_or(10143)))
    }

    async fn get_code(&self, address: &Address) -> Result<Bytes, BoxError> {
        Ok(self.with_state(|s| s.code.get(address).cloned().unwrap_or_default()))
    }

    async fn get_balance(&self, address: &Address) -> Result<U256, BoxError> {
        self.with_state(|s| {
            if s.fail_balance {
                return Err("balance unavailable".into());
            }
            Ok(s.balances.get(address).copied().unwrap_or_default())
        })
    }

    async fn call(&self, to: &Address, data: Bytes) -> Result<Bytes, BoxError> {
        self.with_state(|s| -> Result<Bytes, BoxError> {
            if s.nonce_enforcer == Some(*to) {
                let call = INonceEnforcer::currentNonceCall::abi_decode(&data, true)?;
                let nonce = s
                    .nonces
                    .get(&(call.delegationManager, call.delegator))
                    .copied()
                    .unwrap_or_default();
                return Ok(Bytes::from(nonce.abi_encode()));
            }
            s.call_responses
                .get(to)
                .cloned()
                .ok_or_else(|| format!("execution reverted: no code at {to}").into())
        })
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<TxReceipt, BoxError> {
        let status = self
            .with_state(|s| s.receipts.get(tx_hash).copied())
            .ok_or("unknown transaction")?;
        Ok(TxReceipt {
            tx_hash: *tx_hash,
            status,
            block_number: Some(1),
        })
    }
}

/// Wallet that submits through the mock chain
pub struct MockWallet {
    pub address: Address,
    pub chain: Arc<MockChain>,
}

impl MockWallet {
    pub fn new(address: Address, chain: Arc<MockChain>) -> Arc<Self> {
        Arc::new(Self { address, chain })
    }
}

#[async_trait]
impl WalletClient for MockWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, BoxError> {
        self.chain.submit(self.address, tx)
    }
}

/// Signer whose user always dismisses the prompt
pub struct RejectingSigner {
    pub address: Address,
}

#[async_trait]
impl DelegationSigner for RejectingSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_hash(&self, _hash: &B256) -> Result<Bytes, BoxError> {
        Err("user rejected the request".into())
    }
}

#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn at(now: u64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(now),
        })
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub fn environment(nonce_enforcer: Option<Address>) -> FrameworkEnvironment {
    FrameworkEnvironment {
        delegation_manager: DELEGATION_MANAGER,
        allowed_targets_enforcer: address!("0000000000000000000000000000000000000e01"),
        allowed_methods_enforcer: address!("0000000000000000000000000000000000000e02"),
        timestamp_enforcer: address!("0000000000000000000000000000000000000e03"),
        nonce_enforcer,
    }
}

pub fn deployment() -> HybridDeployment {
    HybridDeployment {
        factory: FACTORY,
        implementation: address!("0000000000000000000000000000000000000f02"),
        proxy_creation_code: Bytes::from(vec![0x60, 0x80, 0x60, 0x40, 0x52]),
        salt: B256::ZERO,
    }
}

pub struct TestContext {
    pub chain: Arc<MockChain>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<DelegationStore>,
    pub relay: Arc<MockWallet>,
    pub owner: Arc<LocalKeySigner>,
    pub owner_wallet: Arc<MockWallet>,
    pub config: TapTipConfig,
}

impl TestContext {
    pub fn new(nonce_enforcer: Option<Address>) -> Self {
        let chain = MockChain::new();
        let owner = Arc::new(LocalKeySigner::from_hex(OWNER_KEY).unwrap());
        let owner_wallet = MockWallet::new(owner.address(), chain.clone());
        let config = TapTipConfig::new(environment(nonce_enforcer)).with_hybrid(deployment());

        let ctx = Self {
            relay: MockWallet::new(RELAY, chain.clone()),
            clock: ManualClock::at(1000),
            store: Arc::new(DelegationStore::in_memory()),
            chain,
            owner,
            owner_wallet,
            config,
        };
        ctx.chain.deploy_on_call(FACTORY, ctx.account().address());
        ctx
    }

    /// Nonce enforcer configured and modeled on the mock chain
    pub fn with_nonce_enforcer() -> Self {
        let ctx = Self::new(Some(NONCE_ENFORCER));
        ctx.chain.install_nonce_enforcer(NONCE_ENFORCER);
        ctx
    }

    pub fn account(&self) -> HybridAccount {
        HybridAccount::new(self.owner.address(), deployment())
    }

    pub fn session(&self) -> TapToTip {
        TapToTip::builder()
            .with_config(self.config.clone())
            .with_connection(self.chain.clone())
            .with_relay(self.relay.clone())
            .with_store(self.store.clone())
            .with_clock(self.clock.clone())
            .build()
            .unwrap()
    }

    /// Session with the owner wallet connected and the account resolved
    pub async fn connected_session(&self) -> TapToTip {
        let mut session = self.session();
        let state = session
            .connect(self.owner.clone(), self.owner_wallet.clone())
            .await
            .unwrap();
        assert!(state.is_ready(), "account should resolve: {state:?}");
        session
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
