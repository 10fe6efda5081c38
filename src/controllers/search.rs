use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{ApiError, ApiResult},
    services::seat_search::SeatSearchParams,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/seat-lookup", post(seat_lookup))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SeatLookupRequest {
    #[validate(length(min = 1, max = 100, message = "query must be 1-100 characters"))]
    pub query: String,
    #[validate(range(min = 1, message = "hostUserId must be > 0"))]
    pub host_user_id: i64,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,
    #[serde(default)]
    pub include_seats: bool,
}

/// POST /api/seat-lookup
///
/// Платежи хоста, у которых имя или фамилия участника содержит подстроку.
async fn seat_lookup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SeatLookupRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;
    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::Validation("query must not be blank".to_string()));
    }

    let params = SeatSearchParams {
        query: query.to_string(),
        host_user_id: req.host_user_id,
        limit: req.limit,
        include_seats: req.include_seats,
    };
    let results = state.seat_search.search(&params).await?;

    Ok(Json(json!({
        "success": true,
        "count": results.len(),
        "results": results
    })))
}
