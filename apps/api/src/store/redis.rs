use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use tracing::info;

use super::{KeyValueStore, StoreError};

/// Redis-backed store. Holds one multiplexed connection; clones of it share
/// the underlying channel, so per-call cloning is cheap.
#[derive(Clone)]
pub struct RedisStore {
    connection: redis::aio::MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        info!("Redis store connected");
        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let mut con = self.connection.clone();
        let value: Option<Vec<u8>> = con.get(key).await?;
        Ok(value.map(Bytes::from))
    }

    async fn put(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        match ttl {
            Some(ttl) => {
                // SETEX rejects a zero expiry.
                let _: () = con
                    .set_ex(key, value.as_ref(), ttl.as_secs().max(1))
                    .await?;
            }
            None => {
                let _: () = con.set(key, value.as_ref()).await?;
            }
        }
        Ok(())
    }
}
