//! Построение и выполнение SQL для дашборда.
//!
//! - `filter`: форма фильтров -> параметризованный SQL;
//! - `nl`: текстовый запрос -> форма фильтров;
//! - `guard`: проверка "сырого" SQL перед выполнением;
//! - `rows`: выполнение и превращение строк в JSON.
//!
//! Значения никогда не подставляются в текст запроса, только через `$n`.

pub mod filter;
pub mod guard;
pub mod nl;
pub mod rows;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

pub use filter::{FilterForm, TableSelection};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("filter '{filter}' is not supported for table {table}")]
    UnsupportedFilter { table: &'static str, filter: &'static str },
    #[error("unknown flag '{column}' for table {table}")]
    UnknownFlag { table: &'static str, column: String },
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("statement is empty")]
    EmptyStatement,
    #[error("only a single statement is allowed")]
    MultipleStatements,
    #[error("only read-only queries are allowed (found '{0}')")]
    ForbiddenKeyword(String),
    #[error("statement must start with SELECT, WITH, TABLE, VALUES or EXPLAIN")]
    NotAQuery,
    #[error("unterminated quote or comment")]
    Unterminated,
}

/// Значение для `$n`-параметра.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

/// Готовый запрос: текст с плейсхолдерами и значения по порядку.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl BuiltQuery {
    /// Номера всех плейсхолдеров `$n` в порядке появления в тексте.
    pub fn placeholders(&self) -> Vec<usize> {
        let bytes = self.sql.as_bytes();
        let mut found = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'$' {
                i += 1;
                continue;
            }
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if let Ok(n) = self.sql[start..end].parse::<usize>() {
                found.push(n);
            }
            i = end.max(start);
        }
        found
    }
}
