use alloy_primitives::Address;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use crate::core::constants::CACHE_KEY_PREFIX;
use crate::error::{Result, TapTipError};
use crate::types::CacheRecord;

/// Durable string slots, addressed by string key
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store; contents are lost on drop
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| TapTipError::Store("lock poisoned".to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| TapTipError::Store("lock poisoned".to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| TapTipError::Store("lock poisoned".to_string()))?;
        slots.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside `dir`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TapTipError::Store(format!(
                "failed reading {}: {e}",
                path.display()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            TapTipError::Store(format!("failed creating {}: {e}", self.dir.display()))
        })?;

        // Write to a sibling temp file, then rename over the target
        let path = self.path_for(key);
        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, value.as_bytes())
            .map_err(|e| TapTipError::Store(format!("failed writing {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| TapTipError::Store(format!("failed replacing {}: {e}", path.display())))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TapTipError::Store(format!(
                "failed removing {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Identity of a cache slot: (chainId, delegator, delegate, tip jar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub chain_id: u64,
    pub delegator: Address,
    pub delegate: Address,
    pub tip_jar: Address,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            CACHE_KEY_PREFIX, self.chain_id, self.delegator, self.delegate, self.tip_jar
        )
    }
}

/// Keyed cache of signed delegations. At most one record per key.
///
/// Writers for the same key are serialized through [`DelegationStore::lock`];
/// readers never block.
pub struct DelegationStore {
    backend: Arc<dyn KeyValueStore>,
    locks: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl DelegationStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn cache_key(
        chain_id: u64,
        delegator: Address,
        delegate: Address,
        tip_jar: Address,
    ) -> CacheKey {
        CacheKey {
            chain_id,
            delegator,
            delegate,
            tip_jar,
        }
    }

    /// Acquire the writer lock for `key`
    pub async fn lock(&self, key: &CacheKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Self::prune_idle(&mut locks);
            locks.entry(*key).or_default().clone()
        };
        slot.lock_owned().await
    }

    // A slot nobody holds or waits on is referenced only by the map
    fn prune_idle(locks: &mut HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>) {
        locks.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    /// Overwrite the record for `key`
    pub fn save(&self, key: &CacheKey, record: &CacheRecord) -> Result<()> {
        let body = serde_json::to_string(record)?;
        self.backend.set(&key.to_string(), &body)?;
        debug!(key = %key, expires_at = record.expires_at, "cached delegation");
        Ok(())
    }

    /// Read the raw record. A malformed record reads as a miss.
    pub fn load(&self, key: &CacheKey) -> Result<Option<CacheRecord>> {
        let Some(body) = self.backend.get(&key.to_string())? else {
            return Ok(None);
        };

        match serde_json::from_str::<CacheRecord>(&body) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring malformed delegation record");
                Ok(None)
            },
        }
    }

    /// Read the record if still active at `now`; expired records are deleted.
    pub fn load_active(&self, key: &CacheKey, now: u64) -> Result<Option<CacheRecord>> {
        match self.load(key)? {
            Some(record) if record.is_active(now) => Ok(Some(record)),
            Some(record) => {
                debug!(key = %key, expires_at = record.expires_at, now, "dropping expired delegation");
                self.backend.remove(&key.to_string())?;
                Ok(None)
            },
            None => Ok(None),
        }
    }

    pub fn clear(&self, key: &CacheKey) -> Result<()> {
        self.backend.remove(&key.to_string())?;
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Self::prune_idle(&mut locks);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Delegation, DelegationScope, SignedDelegation, ValidityWindow};
    use alloy_primitives::{address, Bytes, FixedBytes, B256, U256};
    use std::time::Duration;

    fn key() -> CacheKey {
        CacheKey {
            chain_id: 10143,
            delegator: address!("00000000000000000000000000000000000000aa"),
            delegate: address!("00000000000000000000000000000000000000bb"),
            tip_jar: address!("00000000000000000000000000000000000000cc"),
        }
    }

    fn record(expires_at: u64) -> CacheRecord {
        CacheRecord {
            signed_delegation: SignedDelegation {
                delegation: Delegation {
                    delegator: key().delegator,
                    delegate: key().delegate,
                    authority: B256::repeat_byte(0xff),
                    scope: DelegationScope {
                        target_contract: key().tip_jar,
                        selector: FixedBytes([1, 2, 3, 4]),
                    },
                    validity: ValidityWindow {
                        not_before_unix: 995,
                        not_after_unix: expires_at,
                    },
                    caveats: vec![],
                    salt: U256::from(1000u64),
                },
                signature: Bytes::from(vec![7u8; 65]),
            },
            expires_at,
            nonce_tag: "0x01".to_string(),
        }
    }

    #[test]
    fn test_cache_key_format() {
        let k = key();
        assert_eq!(
            k.to_string(),
            format!(
                "tapToTip:delegation:v1:10143:{}:{}:{}",
                k.delegator, k.delegate, k.tip_jar
            )
        );
    }

    #[test]
    fn test_expired_record_is_removed() {
        let store = DelegationStore::in_memory();
        store.save(&key(), &record(2000)).unwrap();

        assert!(store.load_active(&key(), 1999).unwrap().is_some());
        assert!(store.load_active(&key(), 2000).unwrap().is_none());
        // Deleted on the expired read
        assert!(store.load(&key()).unwrap().is_none());
    }

    #[test]
    fn test_malformed_record_is_a_miss() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(&key().to_string(), "{not json").unwrap();
        let store = DelegationStore::new(backend);

        assert!(store.load_active(&key(), 0).unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let store = DelegationStore::in_memory();
        store.save(&key(), &record(2000)).unwrap();
        store.save(&key(), &record(3000)).unwrap();

        assert_eq!(store.load(&key()).unwrap().unwrap().expires_at, 3000);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DelegationStore::new(Arc::new(FileStore::new(dir.path())));

        store.save(&key(), &record(5000)).unwrap();
        let reopened = DelegationStore::new(Arc::new(FileStore::new(dir.path())));
        assert_eq!(reopened.load(&key()).unwrap(), Some(record(5000)));

        reopened.clear(&key()).unwrap();
        assert!(store.load(&key()).unwrap().is_none());
        // Clearing a missing slot is fine
        reopened.clear(&key()).unwrap();
    }

    #[tokio::test]
    async fn test_lock_serializes_writers_per_key() {
        let store = Arc::new(DelegationStore::in_memory());
        let guard = store.lock(&key()).await;

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let _guard = store.lock(&key()).await;
            })
        };

        // A different key is never blocked by the held one
        let other = CacheKey {
            chain_id: 1,
            ..key()
        };
        tokio::time::timeout(Duration::from_secs(1), store.lock(&other))
            .await
            .expect("other key should lock immediately");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should proceed once the guard is dropped")
            .unwrap();
    }

    #[tokio::test]
    async fn test_idle_lock_slots_are_pruned() {
        let store = DelegationStore::in_memory();
        let other = CacheKey {
            chain_id: 1,
            ..key()
        };

        drop(store.lock(&key()).await);
        let held = store.lock(&other).await;
        assert_eq!(store.locks.lock().unwrap().len(), 1);

        store.clear(&other).unwrap();
        assert_eq!(store.locks.lock().unwrap().len(), 1);

        drop(held);
        store.clear(&other).unwrap();
        assert!(store.locks.lock().unwrap().is_empty());
    }
}
