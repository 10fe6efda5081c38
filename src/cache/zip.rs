use crate::cache::{digest, CacheService};

// ZIP-код транзакции не меняется, держим сутки
const ZIP_TTL_SECONDS: u64 = 86_400;

fn zip_key(transaction_id: &str) -> String {
    format!("zip:{}", digest(transaction_id))
}

impl CacheService {
    pub async fn get_cached_zip(&self, transaction_id: &str) -> Option<String> {
        self.get_json(&zip_key(transaction_id)).await
    }

    pub async fn cache_zip(&self, transaction_id: &str, zip: &str) {
        self.set_json(&zip_key(transaction_id), &zip, ZIP_TTL_SECONDS).await
    }
}
