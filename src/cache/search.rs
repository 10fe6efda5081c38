use crate::cache::{digest, CacheService};
use crate::models::SeatLookupResult;

/// Ключ кеша для поиска по имени: хост, лимит, флаг мест и хеш запроса.
pub fn seat_lookup_key(host_user_id: i64, query: &str, limit: i64, include_seats: bool) -> String {
    format!(
        "seat_lookup:{}:{}:{}:{}",
        host_user_id,
        limit,
        u8::from(include_seats),
        digest(&query.trim().to_lowercase())
    )
}

impl CacheService {
    pub async fn get_seat_lookup(&self, key: &str) -> Option<Vec<SeatLookupResult>> {
        self.get_json(key).await
    }

    pub async fn cache_seat_lookup(&self, key: &str, results: &[SeatLookupResult], ttl_seconds: u64) {
        self.set_json(key, &results, ttl_seconds).await
    }
}
