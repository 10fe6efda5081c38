//! zip_lookup.rs
//!
//! Обогащение транзакций почтовым индексом (ZIP) плательщика через API
//! платежного провайдера.
//!
//! Запросы идут строго последовательно с фиксированной паузой между ними:
//! это самоограничение по частоте, а не очередь. Ошибка по одной транзакции
//! не прерывает пакет: строка остается в результатах с `zip = None`,
//! а причина попадает в отдельный список ошибок.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::CacheService;
use crate::config::ZipConfig;

#[derive(Debug, thiserror::Error)]
pub enum ZipError {
    #[error("ZIP lookup API is not configured")]
    NotConfigured,
    #[error("invalid transaction id '{0}'")]
    InvalidTransactionId(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("lookup returned HTTP {0}")]
    Status(u16),
    #[error("no postal code in response")]
    MissingZip,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZipRow {
    pub transaction_id: String,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZipFailure {
    pub transaction_id: String,
    pub error: String,
}

/// Результат пакета: по строке на каждую транзакцию плюс список ошибок.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct ZipEnrichment {
    pub results: Vec<ZipRow>,
    pub errors: Vec<ZipFailure>,
}

#[derive(Clone)]
pub struct ZipClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    delay: Duration,
    cache: Option<CacheService>,
}

/// Достает индекс из ответа: `billing_details.address.postal_code`,
/// иначе поля `zip` / `postal_code` верхнего уровня.
fn extract_zip(body: &Value) -> Option<String> {
    [
        body.pointer("/billing_details/address/postal_code"),
        body.get("zip"),
        body.get("postal_code"),
    ]
    .into_iter()
    .flatten()
    .filter_map(|v| match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
    .find(|s| !s.is_empty())
}

fn valid_transaction_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl ZipClient {
    /// Создает клиент, если API настроен.
    pub fn from_config(config: &ZipConfig, cache: Option<CacheService>) -> Result<Self, ZipError> {
        let base_url = config.api_url.clone().ok_or(ZipError::NotConfigured)?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            delay: Duration::from_millis(config.delay_ms),
            cache,
        })
    }

    /// Запрашивает ZIP одной транзакции. Без повторов.
    pub async fn fetch_zip(&self, transaction_id: &str) -> Result<String, ZipError> {
        if !valid_transaction_id(transaction_id) {
            return Err(ZipError::InvalidTransactionId(transaction_id.to_string()));
        }

        let mut request = self
            .http_client
            .get(format!("{}/transactions/{}", self.base_url, transaction_id));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ZipError::Status(response.status().as_u16()));
        }
        let body: Value = response.json().await?;
        extract_zip(&body).ok_or(ZipError::MissingZip)
    }

    /// Обогащает транзакции по очереди с паузой между обращениями к API.
    pub async fn enrich(&self, transaction_ids: &[String]) -> ZipEnrichment {
        let mut out = ZipEnrichment::default();
        let mut called_api = false;

        for transaction_id in transaction_ids {
            if let Some(cache) = &self.cache {
                if let Some(zip) = cache.get_cached_zip(transaction_id).await {
                    out.results.push(ZipRow { transaction_id: transaction_id.clone(), zip: Some(zip) });
                    continue;
                }
            }

            if called_api && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            called_api = true;

            match self.fetch_zip(transaction_id).await {
                Ok(zip) => {
                    if let Some(cache) = &self.cache {
                        cache.cache_zip(transaction_id, &zip).await;
                    }
                    out.results.push(ZipRow { transaction_id: transaction_id.clone(), zip: Some(zip) });
                }
                Err(e) => {
                    warn!("ZIP lookup failed for {}: {}", transaction_id, e);
                    out.results.push(ZipRow { transaction_id: transaction_id.clone(), zip: None });
                    out.errors.push(ZipFailure {
                        transaction_id: transaction_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "ZIP enrichment done: {} transactions, {} failed",
            out.results.len(),
            out.errors.len()
        );
        out
    }
}
