//! Обработка результатов перед показом: форматирование дат и сумм,
//! составные имена, фильтрация по "корзинам" дат (прошлое/сегодня/будущее).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Имя плательщика, когда участник не найден или имя пустое.
pub const UNKNOWN_PAYER: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateBucket {
    #[default]
    All,
    Past,
    Today,
    Future,
}

/// Разбиение строк по дате. Три множества не пересекаются,
/// а вместе дают исходный набор.
#[derive(Debug, Default, Serialize)]
pub struct Partitioned {
    pub past: Vec<Value>,
    pub today: Vec<Value>,
    pub future: Vec<Value>,
}

pub fn format_date(value: &NaiveDateTime) -> String {
    value.format("%b %-d, %Y").to_string()
}

pub fn format_time(value: &NaiveDateTime) -> String {
    value.format("%-I:%M %p").to_string()
}

/// `$1,234.50`; отрицательные суммы как `-$5.00`.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Разбирает дату/время из JSON-значения строки результата.
///
/// Понимает то, что отдает `to_json` для `timestamp`, `timestamptz`
/// и `date`, а также вариант с пробелом вместо `T`.
pub fn parse_datetime(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.naive_local());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
}

pub fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }
}

fn row_date(row: &Value, field: &str) -> Option<NaiveDate> {
    row.get(field).and_then(parse_datetime).map(|dt| dt.date())
}

/// Корзина строки. Строки без даты считаются прошлыми.
pub fn classify(row: &Value, field: &str, today: NaiveDate) -> DateBucket {
    match row_date(row, field) {
        Some(date) if date == today => DateBucket::Today,
        Some(date) if date > today => DateBucket::Future,
        _ => DateBucket::Past,
    }
}

pub fn partition(rows: Vec<Value>, field: &str, today: NaiveDate) -> Partitioned {
    let mut out = Partitioned::default();
    for row in rows {
        match classify(&row, field, today) {
            DateBucket::Today => out.today.push(row),
            DateBucket::Future => out.future.push(row),
            _ => out.past.push(row),
        }
    }
    out
}

pub fn filter_bucket(rows: Vec<Value>, bucket: DateBucket, field: &str, today: NaiveDate) -> Vec<Value> {
    if bucket == DateBucket::All {
        return rows;
    }
    rows.into_iter()
        .filter(|row| classify(row, field, today) == bucket)
        .collect()
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn non_blank(row: &Map<String, Value>, key: &str) -> Option<String> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Приводит строку результата к виду для таблицы на дашборде.
///
/// Исходные поля сохраняются; добавляются `<поле>Display` для дат,
/// `amountDisplay` и `payerName`, если в строке есть поля имени.
pub fn to_display(row: Value) -> Value {
    let mut map = match row {
        Value::Object(map) => map,
        other => return other,
    };

    let mut extra = Map::new();
    for (key, value) in &map {
        let is_date_field = key.ends_with("_at") || key.ends_with("_date") || key == "date";
        if !is_date_field {
            continue;
        }
        if let Some(dt) = parse_datetime(value) {
            let is_plain_date = value.as_str().is_some_and(|s| s.trim().len() == 10);
            let display = if is_plain_date {
                format_date(&dt)
            } else {
                format!("{} {}", format_date(&dt), format_time(&dt))
            };
            extra.insert(format!("{}Display", camel_case(key)), Value::String(display));
        }
    }

    if let Some(amount) = map.get("amount").and_then(parse_amount) {
        extra.insert("amountDisplay".to_string(), Value::String(format_amount(amount)));
    }

    if map.contains_key("first_name") || map.contains_key("last_name") {
        let name = [non_blank(&map, "first_name"), non_blank(&map, "last_name")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let name = if name.is_empty() { UNKNOWN_PAYER.to_string() } else { name };
        extra.insert("payerName".to_string(), Value::String(name));
    }

    map.extend(extra);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn formats_amounts() {
        assert_eq!(format_amount(0.0), "$0.00");
        assert_eq!(format_amount(5.5), "$5.50");
        assert_eq!(format_amount(1234.5), "$1,234.50");
        assert_eq!(format_amount(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_amount(-12.5), "-$12.50");
    }

    #[test]
    fn parses_json_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(19, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime(&json!("2024-06-15T19:30:00")), Some(expected));
        assert_eq!(parse_datetime(&json!("2024-06-15T19:30:00+00:00")), Some(expected));
        assert_eq!(parse_datetime(&json!("2024-06-15 19:30:00")), Some(expected));
        assert_eq!(
            parse_datetime(&json!("2024-06-15")),
            NaiveDate::from_ymd_opt(2024, 6, 15).map(|d| d.and_time(chrono::NaiveTime::MIN))
        );
        assert_eq!(parse_datetime(&json!("not a date")), None);
        assert_eq!(parse_datetime(&json!(42)), None);
    }

    #[test]
    fn classifies_relative_to_today() {
        let field = "start_date";
        assert_eq!(classify(&json!({"start_date": "2024-06-14T23:59:59"}), field, today()), DateBucket::Past);
        assert_eq!(classify(&json!({"start_date": "2024-06-15T00:00:00"}), field, today()), DateBucket::Today);
        assert_eq!(classify(&json!({"start_date": "2024-06-16"}), field, today()), DateBucket::Future);
        assert_eq!(classify(&json!({"other": 1}), field, today()), DateBucket::Past);
    }

    #[test]
    fn filter_all_keeps_everything() {
        let rows = vec![json!({"created_at": "2030-01-01"}), json!({})];
        assert_eq!(filter_bucket(rows.clone(), DateBucket::All, "created_at", today()), rows);
    }

    #[test]
    fn display_row_adds_derived_fields() {
        let row = to_display(json!({
            "created_at": "2024-06-15T19:30:00",
            "start_date": "2024-07-01",
            "amount": 1234.5,
            "first_name": "Ada",
            "last_name": null
        }));
        assert_eq!(row["createdAtDisplay"], "Jun 15, 2024 7:30 PM");
        assert_eq!(row["startDateDisplay"], "Jul 1, 2024");
        assert_eq!(row["amountDisplay"], "$1,234.50");
        assert_eq!(row["payerName"], "Ada");
        assert_eq!(row["created_at"], "2024-06-15T19:30:00");
    }

    #[test]
    fn blank_names_fall_back_to_placeholder() {
        let row = to_display(json!({"first_name": " ", "last_name": null}));
        assert_eq!(row["payerName"], UNKNOWN_PAYER);
        let row = to_display(json!({"id": 1}));
        assert!(row.get("payerName").is_none());
    }
}
