use crate::redis_client::RedisClient;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

pub mod search;
pub mod zip;

/// Кеш поверх Redis. Все ошибки кеша не критичны: при сбое
/// вызывающий код просто идет в БД или во внешний API.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
}

impl CacheService {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = match conn.get(key).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Cache read failed for {}: {:?}", key, e);
                return None;
            }
        };
        serde_json::from_str(&data?).ok()
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) {
        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(e) => {
                warn!("Cache serialize failed for {}: {:?}", key, e);
                return;
            }
        };
        let mut conn = self.redis.conn.clone();
        let result: Result<(), redis::RedisError> = conn.set_ex(key, data, ttl_seconds).await;
        if let Err(e) = result {
            warn!("Cache write failed for {}: {:?}", key, e);
        }
    }
}

// Ключи не содержат пользовательский текст как есть
pub(crate) fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
