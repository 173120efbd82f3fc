//! Durable store: flat `get(key) → bytes | absent` / `put(key, bytes, ttl?)`.
//!
//! No entity needs cross-key transactions; each key is read-modify-written
//! by a single logical owner per synchronization cycle, with overlap kept
//! out by the cooldown window rather than locks.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub mod memory;
pub mod redis;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[from] ::redis::RedisError),

    #[error("stored value for '{key}' failed to decode: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value failed to encode: {0}")]
    Encode(#[source] serde_json::Error),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;
    async fn put(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError>;
}

/// Reads `key` and decodes it as JSON. Absent keys are `Ok(None)`.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(bytes) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        })
}

/// Encodes `value` as JSON and writes it under `key`.
pub async fn put_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(value).map_err(StoreError::Encode)?;
    store.put(key, Bytes::from(bytes), ttl).await
}

/// Key layout. Everything the pipeline persists lives under one of these.
pub mod keys {
    use chrono::NaiveDate;

    use crate::models::ballot::Party;

    /// Canonical ballot for one party.
    pub fn ballot(party: Party) -> String {
        format!("ballot:{party}")
    }

    /// Per-party versions and refresh timestamps.
    pub const MANIFEST: &str = "ballots:manifest";

    /// Latest audit record for one reviewer provider.
    pub fn audit(provider: &str) -> String {
        format!("audit:{provider}")
    }

    /// Cross-provider audit rollup.
    pub const AUDIT_SUMMARY: &str = "audit:summary";

    /// Cooldown bookkeeping for a trackable entity ("ballot:republican",
    /// "audit:openai", ...).
    pub fn last_attempt(entity: &str) -> String {
        format!("sync:last-attempt:{entity}")
    }

    /// Human-readable update log for one day.
    pub fn update_log(date: NaiveDate) -> String {
        format!("logs/{date}")
    }
}
