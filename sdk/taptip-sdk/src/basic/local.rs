use alloy_primitives::{keccak256, Address, Bytes, B256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use std::error::Error;

use crate::core::signer::DelegationSigner;
use crate::error::{Result, TapTipError};

/// Owner key held in-process. Signs digests with secp256k1.
#[derive(Clone)]
pub struct LocalKeySigner {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalKeySigner {
    pub fn from_bytes(secret: &[u8]) -> Result<Self> {
        let key = SigningKey::from_slice(secret)
            .map_err(|e| TapTipError::Config(format!("invalid private key: {e}")))?;
        let address = address_of(&key);
        Ok(Self { key, address })
    }

    /// Parse a `0x`-prefixed or bare hex private key
    pub fn from_hex(secret: &str) -> Result<Self> {
        let raw = secret.trim().trim_start_matches("0x");
        let bytes = hex::decode(raw)
            .map_err(|e| TapTipError::Config(format!("invalid private key hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// `r || s || v` with `v` in {27, 28}
    pub fn sign_digest(&self, hash: &B256) -> Result<Bytes> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|e| TapTipError::Signing(e.to_string()))?;

        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&signature.to_bytes());
        out.push(27 + recovery_id.to_byte());
        Ok(Bytes::from(out))
    }
}

fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    // Drop the 0x04 SEC1 tag; address is the low 20 bytes of keccak(x || y)
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

#[async_trait]
impl DelegationSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_hash(&self, hash: &B256) -> std::result::Result<Bytes, Box<dyn Error + Send + Sync>> {
        self.sign_digest(hash).map_err(|e| e.into())
    }
}
