//! Обработка уже полученных строк: отбор по дате и форматирование,
//! данные для графиков, CSV-выгрузка. БД здесь не нужна.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    chart::{self, ChartData, ChartPreset},
    error::ApiResult,
    export,
    postprocess::{self, DateBucket},
    AppState,
};

const MAX_ROWS: usize = 10_000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/process", post(process))
        .route("/chart", post(chart_data))
        .route("/export", post(export_csv))
}

fn default_date_field() -> String {
    "created_at".to_string()
}

/// Общая часть запросов: строки и отбор по дате.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsRequest {
    pub rows: Vec<Value>,
    #[serde(default)]
    pub bucket: DateBucket,
    #[serde(default = "default_date_field")]
    pub date_field: String,
    pub today: Option<NaiveDate>,
}

impl RowsRequest {
    fn check(&self) -> ApiResult<()> {
        if self.rows.len() > MAX_ROWS {
            return Err(crate::error::ApiError::Validation(format!(
                "at most {} rows can be processed",
                MAX_ROWS
            )));
        }
        Ok(())
    }

    fn selected(self) -> Vec<Value> {
        let today = self.today.unwrap_or_else(|| chrono::Local::now().date_naive());
        postprocess::filter_bucket(self.rows, self.bucket, &self.date_field, today)
    }
}

/// POST /api/process
async fn process(Json(req): Json<RowsRequest>) -> ApiResult<Json<Value>> {
    req.check()?;
    let rows: Vec<Value> = req.selected().into_iter().map(postprocess::to_display).collect();

    Ok(Json(json!({
        "success": true,
        "count": rows.len(),
        "rows": rows
    })))
}

#[derive(Debug, Deserialize)]
pub struct ChartRequest {
    #[serde(flatten)]
    pub rows: RowsRequest,
    pub preset: Option<ChartPreset>,
    pub prompt: Option<String>,
}

/// POST /api/chart
async fn chart_data(Json(req): Json<ChartRequest>) -> ApiResult<Json<ChartData>> {
    req.rows.check()?;
    let preset = chart::select_preset(req.preset, req.prompt.as_deref());
    let rows = req.rows.selected();
    Ok(Json(chart::map_rows(&rows, preset)))
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(flatten)]
    pub rows: RowsRequest,
    pub columns: Option<Vec<String>>,
}

/// POST /api/export
async fn export_csv(Json(req): Json<ExportRequest>) -> ApiResult<Response> {
    req.rows.check()?;
    let columns = req.columns;
    let rows = req.rows.selected();
    let body = export::to_csv(&rows, columns.as_deref());
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::file_name(chrono::Local::now().naive_local())
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
