use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiResult,
    services::zip_lookup::ZipError,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/fetch-zip", post(fetch_zip))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FetchZipRequest {
    #[validate(length(min = 1, max = 500, message = "transactionIds must contain 1-500 ids"))]
    pub transaction_ids: Vec<String>,
}

/// POST /api/fetch-zip
///
/// Обогащает транзакции почтовым индексом плательщика. Ошибки по отдельным
/// транзакциям не прерывают обработку и попадают в `errors`.
async fn fetch_zip(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FetchZipRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;
    let client = state.zip.as_ref().ok_or(ZipError::NotConfigured)?;

    let enrichment = client.enrich(&req.transaction_ids).await;

    Ok(Json(json!({
        "success": true,
        "results": enrichment.results,
        "errors": enrichment.errors
    })))
}
