//! Process-local store. Used when no REDIS_URL is configured (dev) and by
//! tests; contents do not survive a restart.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;

use super::{KeyValueStore, StoreError};

#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let expired = entries.get(key).is_some_and(Entry::is_expired);
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn put(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        let entry = Entry {
            value,
            expires_at: ttl.map(|t| Instant::now() + t),
        };
        self.entries.lock().unwrap().insert(key.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_overwrite() {
        let store = InMemoryStore::new();
        store.put("k", Bytes::from_static(b"v1"), None).await.unwrap();
        store.put("k", Bytes::from_static(b"v2"), None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(Bytes::from_static(b"v2")));
        assert_eq!(store.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let store = InMemoryStore::new();
        store
            .put("k", Bytes::from_static(b"v"), Some(Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unexpired_ttl_entry_is_readable() {
        let store = InMemoryStore::new();
        store
            .put("k", Bytes::from_static(b"v"), Some(Duration::from_secs(3600)))
            .await
            .unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(Bytes::from_static(b"v")));
    }
}
