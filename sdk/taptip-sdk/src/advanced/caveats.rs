use alloy_primitives::{Address, Bytes, FixedBytes, U256};

use crate::types::Caveat;

/// Fluent builder for the caveat list attached to a delegation.
/// Terms use the packed layouts the framework's enforcers expect.
#[derive(Debug, Default)]
pub struct CaveatBuilder {
    caveats: Vec<Caveat>,
}

impl CaveatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict calls to `targets` (20 bytes each, packed)
    pub fn allowed_targets(mut self, enforcer: Address, targets: &[Address]) -> Self {
        let mut terms = Vec::with_capacity(20 * targets.len());
        for target in targets {
            terms.extend_from_slice(target.as_slice());
        }
        self.push(enforcer, terms);
        self
    }

    /// Restrict calls to `selectors` (4 bytes each, packed)
    pub fn allowed_methods(mut self, enforcer: Address, selectors: &[FixedBytes<4>]) -> Self {
        let mut terms = Vec::with_capacity(4 * selectors.len());
        for selector in selectors {
            terms.extend_from_slice(selector.as_slice());
        }
        self.push(enforcer, terms);
        self
    }

    /// Time window as `uint128 after || uint128 before`
    pub fn timestamp(mut self, enforcer: Address, after: u64, before: u64) -> Self {
        let mut terms = Vec::with_capacity(32);
        terms.extend_from_slice(&(after as u128).to_be_bytes());
        terms.extend_from_slice(&(before as u128).to_be_bytes());
        self.push(enforcer, terms);
        self
    }

    /// Bind to revocation epoch `nonce`; `uint256`
    pub fn nonce(mut self, enforcer: Address, nonce: U256) -> Self {
        self.push(enforcer, nonce.to_be_bytes::<32>().to_vec());
        self
    }

    pub fn build(self) -> Vec<Caveat> {
        self.caveats
    }

    fn push(&mut self, enforcer: Address, terms: Vec<u8>) {
        self.caveats.push(Caveat {
            enforcer,
            terms: Bytes::from(terms),
            args: Bytes::new(),
        });
    }
}
