//! CSV-выгрузка результатов: UTF-8, запятая, все поля в двойных кавычках,
//! первая строка - заголовок.

use serde_json::Value;

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Колонки в порядке первого появления ключа среди строк.
pub fn infer_columns(rows: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    columns
}

pub fn to_csv(rows: &[Value], columns: Option<&[String]>) -> String {
    let columns = match columns {
        Some(columns) if !columns.is_empty() => columns.to_vec(),
        _ => infer_columns(rows),
    };

    let mut out = String::new();
    let header: Vec<String> = columns.iter().map(|c| quote(c)).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in rows {
        let line: Vec<String> = columns
            .iter()
            .map(|c| quote(&cell(row.get(c.as_str()))))
            .collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Имя файла для `Content-Disposition`.
pub fn file_name(now: chrono::NaiveDateTime) -> String {
    format!("export-{}.csv", now.format("%Y%m%d-%H%M%S"))
}
