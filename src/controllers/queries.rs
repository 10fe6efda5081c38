//! queries.rs
//!
//! Три способа получить строки из БД:
//! - "сырой" SQL (только чтение, проверяется `query::guard`);
//! - форма фильтров (`FilterForm`);
//! - текстовый запрос, который превращается в ту же форму.

use axum::{extract::State, routing::post, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::{
    error::ApiResult,
    query::{guard, nl, rows, FilterForm},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/execute-sql", post(execute_sql))
        .route("/form-query", post(form_query))
        .route("/nl-to-sql", post(nl_to_sql))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExecuteSqlRequest {
    #[validate(length(min = 1, max = 20000, message = "sql must be 1-20000 characters"))]
    pub sql: String,
    #[validate(range(min = 1, message = "limit must be > 0"))]
    pub limit: Option<i64>,
}

/// POST /api/execute-sql
async fn execute_sql(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteSqlRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;
    let guarded = guard::check(&req.sql)?;

    let limits = &state.config.query;
    let max_rows = req.limit.unwrap_or(limits.default_limit).min(limits.max_limit);
    let result = rows::fetch_raw(&state.db.pool, &guarded, max_rows).await?;

    info!(
        "execute-sql: {} rows (truncated={}, {} chars of SQL)",
        result.count,
        result.truncated,
        guarded.sql.len()
    );

    Ok(Json(json!({
        "success": true,
        "rows": result.rows,
        "count": result.count,
        "truncated": result.truncated
    })))
}

/// POST /api/form-query
async fn form_query(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FilterForm>,
) -> ApiResult<Json<Value>> {
    let built = form.build(&state.config.query)?;
    let rows = rows::fetch_built(&state.db.pool, &built).await?;

    Ok(Json(json!({
        "success": true,
        "sql": built.sql,
        "params": built.params,
        "count": rows.len(),
        "rows": rows
    })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NlToSqlRequest {
    #[validate(length(min = 1, max = 1000, message = "prompt must be 1-1000 characters"))]
    pub prompt: String,
    #[validate(range(min = 1, message = "hostUserId must be > 0"))]
    pub host_user_id: Option<i64>,
    #[serde(default)]
    pub execute: bool,
    /// Дата клиента; относительные периоды считаются от нее.
    pub today: Option<NaiveDate>,
}

/// POST /api/nl-to-sql
///
/// Возвращает SQL, параметры и распознанные фильтры; при `execute`
/// сразу выполняет запрос.
async fn nl_to_sql(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NlToSqlRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;
    let today = req.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    let form = nl::interpret(&req.prompt, req.host_user_id, today);
    let built = form.build(&state.config.query)?;

    let mut body = json!({
        "success": true,
        "sql": built.sql,
        "params": built.params,
        "filters": form
    });

    if req.execute {
        let rows = rows::fetch_built(&state.db.pool, &built).await?;
        body["count"] = json!(rows.len());
        body["rows"] = Value::Array(rows);
    }

    Ok(Json(body))
}
