use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryScalar;
use sqlx::{Column, Executor, PgPool, Postgres, Row, Statement};
use std::collections::HashSet;
use tracing::debug;

use super::guard::{GuardedSql, StatementKind};
use super::{BuiltQuery, SqlParam};

/// Результат выполнения произвольного запроса.
#[derive(Debug, Serialize)]
pub struct RowSet {
    pub rows: Vec<Value>,
    pub count: usize,
    pub truncated: bool,
}

fn bind_params<'q, O>(
    mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    params: &[SqlParam],
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    for param in params {
        query = match param.clone() {
            SqlParam::Int(v) => query.bind(v),
            SqlParam::Float(v) => query.bind(v),
            SqlParam::Text(v) => query.bind(v),
            SqlParam::Bool(v) => query.bind(v),
            SqlParam::Date(v) => query.bind(v),
            SqlParam::Timestamp(v) => query.bind(v),
        };
    }
    query
}

// Строка превращается в JSON-объект на стороне Postgres, типы колонок
// заранее знать не нужно. `to_json` сохраняет порядок колонок.
fn wrap_as_json(sql: &str) -> String {
    format!("SELECT to_json(q) FROM ({}) AS q", sql)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Имена колонок без повторов: второй `id` становится `id_2`, третий `id_3`.
/// Новое имя не совпадает ни с одним из уже занятых.
pub fn unique_column_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let names: Vec<&str> = names.into_iter().collect();
    let mut taken: HashSet<String> = names.iter().map(|n| n.to_string()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        if seen.insert(name) {
            out.push(name.to_string());
            continue;
        }
        let mut n = 2;
        let renamed = loop {
            let candidate = format!("{}_{}", name, n);
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        taken.insert(renamed.clone());
        out.push(renamed);
    }
    out
}

// JOIN без явных алиасов дает одинаковые имена (`id`, `created_at`),
// а в JSON-объекте уцелел бы только последний ключ. Список алиасов
// подзапроса переименовывает колонки до `to_json`.
fn wrap_with_columns(sql: &str, columns: &[String]) -> String {
    if columns.is_empty() {
        return wrap_as_json(sql);
    }
    let aliases: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!("SELECT to_json(q) FROM ({}) AS q({})", sql, aliases.join(", "))
}

// FORMAT TEXT/YAML дают `text`, FORMAT JSON - `json`, FORMAT XML - `xml`
fn plan_value(row: &PgRow) -> Result<Value, sqlx::Error> {
    if let Ok(line) = row.try_get::<String, _>(0) {
        return Ok(Value::String(line));
    }
    if let Ok(plan) = row.try_get::<Value, _>(0) {
        return Ok(plan);
    }
    row.try_get_unchecked::<String, _>(0).map(Value::String)
}

fn plan_row(plan: Value) -> Value {
    serde_json::json!({ "QUERY PLAN": plan })
}

/// Выполняет запрос, собранный из формы или текстового запроса.
pub async fn fetch_built(pool: &PgPool, built: &BuiltQuery) -> Result<Vec<Value>, sqlx::Error> {
    let sql = wrap_as_json(&built.sql);
    debug!("Executing built query: {} ({} params)", built.sql, built.params.len());
    bind_params(sqlx::query_scalar::<_, Value>(&sql), &built.params)
        .fetch_all(pool)
        .await
}

/// Выполняет проверенный "сырой" SQL, возвращая не больше `max_rows` строк.
pub async fn fetch_raw(pool: &PgPool, guarded: &GuardedSql, max_rows: i64) -> Result<RowSet, sqlx::Error> {
    match guarded.kind {
        StatementKind::Select => {
            let statement = pool.prepare(guarded.sql.as_str()).await?;
            let columns = unique_column_names(statement.columns().iter().map(|c| c.name()));
            let sql = format!("{} LIMIT $1", wrap_with_columns(&guarded.sql, &columns));
            let mut rows: Vec<Value> = sqlx::query_scalar(&sql)
                .bind(max_rows + 1)
                .fetch_all(pool)
                .await?;
            let truncated = rows.len() as i64 > max_rows;
            rows.truncate(max_rows.max(0) as usize);
            Ok(RowSet { count: rows.len(), rows, truncated })
        }
        StatementKind::Explain => {
            let plan_rows = sqlx::query(&guarded.sql).fetch_all(pool).await?;
            let rows = plan_rows
                .iter()
                .map(|row| plan_value(row).map(plan_row))
                .collect::<Result<Vec<Value>, sqlx::Error>>()?;
            Ok(RowSet { count: rows.len(), rows, truncated: false })
        }
    }
}
