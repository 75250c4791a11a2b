use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use voyara_core::lock::{LockLease, LockManager};
use voyara_core::StoreError;

/// Distributed lock over Redis `SET NX EX`. The TTL bounds how long a crashed
/// holder can block other instances.
pub struct RedisLockManager {
    client: redis::Client,
    ttl_seconds: u64,
    max_attempts: u32,
}

impl RedisLockManager {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self {
            client,
            ttl_seconds: 30,
            max_attempts: 50,
        })
    }
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn acquire(&self, key: &str) -> Result<Box<dyn LockLease>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let full_key = format!("lock:{}", key);
        let token = Uuid::new_v4().to_string();

        for _ in 0..self.max_attempts {
            let reply: Option<String> = redis::cmd("SET")
                .arg(&full_key)
                .arg(&token)
                .arg("NX")
                .arg("EX")
                .arg(self.ttl_seconds)
                .query_async(&mut conn)
                .await?;

            if reply.is_some() {
                return Ok(Box::new(RedisLease {
                    client: self.client.clone(),
                    key: full_key,
                    token,
                }));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(format!("timed out acquiring lock {}", full_key).into())
    }
}

struct RedisLease {
    client: redis::Client,
    key: String,
    token: String,
}

#[async_trait]
impl LockLease for RedisLease {
    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // Only delete our own token; an expired lock may have been re-acquired
        // by another holder. The TTL cleans up if this check loses a race.
        let current: Option<String> = conn.get(&self.key).await?;
        if current.as_deref() == Some(self.token.as_str()) {
            let _: () = conn.del(&self.key).await?;
        }
        Ok(())
    }
}

/// In-process fallback used by tests and single-instance deployments.
#[derive(Default)]
pub struct MemoryLockManager {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn acquire(&self, key: &str) -> Result<Box<dyn LockLease>, StoreError> {
        let entry = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let guard = entry.lock_owned().await;
        Ok(Box::new(MemoryLease { _guard: guard }))
    }
}

struct MemoryLease {
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl LockLease for MemoryLease {
    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
