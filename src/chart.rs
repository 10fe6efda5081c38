//! Подготовка данных для графиков из плоского набора строк.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::postprocess::{parse_amount, parse_datetime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPreset {
    TimeSeries,
    AmountDistribution,
    StatusBreakdown,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub preset: ChartPreset,
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
    /// Строки, которые не удалось отнести ни к одной точке.
    pub skipped: usize,
}

// Границы корзин сумм: [0, 25), [25, 50), ..., [500, inf)
const AMOUNT_BUCKETS: [f64; 6] = [0.0, 25.0, 50.0, 100.0, 250.0, 500.0];

static TIME_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(trend|trends|over time|daily|per day|by day|by date|timeline|monthly|weekly)\b")
        .expect("static regex")
});
static AMOUNT_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(distribution|histogram|ranges?|amounts?|sizes?|price points?)\b").expect("static regex")
});
static STATUS_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(status|statuses|breakdown|failed|failures|refunds?|refunded|declined)\b")
        .expect("static regex")
});

/// Явный выбор важнее эвристики; без подсказок - временной ряд.
pub fn select_preset(explicit: Option<ChartPreset>, prompt: Option<&str>) -> ChartPreset {
    if let Some(preset) = explicit {
        return preset;
    }
    let prompt = prompt.unwrap_or_default();
    if TIME_WORDS.is_match(prompt) {
        ChartPreset::TimeSeries
    } else if AMOUNT_WORDS.is_match(prompt) {
        ChartPreset::AmountDistribution
    } else if STATUS_WORDS.is_match(prompt) {
        ChartPreset::StatusBreakdown
    } else {
        ChartPreset::TimeSeries
    }
}

pub fn map_rows(rows: &[Value], preset: ChartPreset) -> ChartData {
    match preset {
        ChartPreset::TimeSeries => time_series(rows),
        ChartPreset::AmountDistribution => amount_distribution(rows),
        ChartPreset::StatusBreakdown => status_breakdown(rows),
    }
}

fn row_date(row: &Value) -> Option<NaiveDate> {
    ["created_at", "start_date", "date"]
        .iter()
        .find_map(|field| row.get(*field).and_then(parse_datetime))
        .map(|dt| dt.date())
}

fn time_series(rows: &[Value]) -> ChartData {
    let mut days: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    let mut skipped = 0;
    for row in rows {
        let Some(day) = row_date(row) else {
            skipped += 1;
            continue;
        };
        let entry = days.entry(day).or_default();
        entry.0 += 1.0;
        entry.1 += row.get("amount").and_then(parse_amount).unwrap_or(0.0);
    }

    ChartData {
        preset: ChartPreset::TimeSeries,
        title: "Activity by day".to_string(),
        labels: days.keys().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
        series: vec![
            ChartSeries { name: "Count".to_string(), values: days.values().map(|v| v.0).collect() },
            ChartSeries {
                name: "Amount".to_string(),
                values: days.values().map(|v| (v.1 * 100.0).round() / 100.0).collect(),
            },
        ],
        skipped,
    }
}

fn bucket_label(index: usize) -> String {
    match AMOUNT_BUCKETS.get(index + 1) {
        Some(upper) => format!("${}-{}", AMOUNT_BUCKETS[index], upper),
        None => format!("${}+", AMOUNT_BUCKETS[index]),
    }
}

fn amount_distribution(rows: &[Value]) -> ChartData {
    let mut counts = [0.0; AMOUNT_BUCKETS.len()];
    let mut skipped = 0;
    for row in rows {
        match row.get("amount").and_then(parse_amount) {
            Some(amount) if amount >= 0.0 => {
                let index = AMOUNT_BUCKETS.iter().rposition(|lower| amount >= *lower).unwrap_or(0);
                counts[index] += 1.0;
            }
            _ => skipped += 1,
        }
    }

    ChartData {
        preset: ChartPreset::AmountDistribution,
        title: "Amount distribution".to_string(),
        labels: (0..AMOUNT_BUCKETS.len()).map(bucket_label).collect(),
        series: vec![ChartSeries { name: "Payments".to_string(), values: counts.to_vec() }],
        skipped,
    }
}

fn status_breakdown(rows: &[Value]) -> ChartData {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let status = row
            .get("status")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        *counts.entry(status).or_default() += 1;
    }

    let mut ordered: Vec<(String, usize)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ChartData {
        preset: ChartPreset::StatusBreakdown,
        title: "Payments by status".to_string(),
        labels: ordered.iter().map(|(status, _)| status.clone()).collect(),
        series: vec![ChartSeries {
            name: "Count".to_string(),
            values: ordered.iter().map(|(_, n)| *n as f64).collect(),
        }],
        skipped: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn explicit_preset_wins() {
        assert_eq!(
            select_preset(Some(ChartPreset::StatusBreakdown), Some("daily trend")),
            ChartPreset::StatusBreakdown
        );
    }

    #[test]
    fn keyword_heuristics() {
        assert_eq!(select_preset(None, Some("sales over time")), ChartPreset::TimeSeries);
        assert_eq!(select_preset(None, Some("Amount histogram")), ChartPreset::AmountDistribution);
        assert_eq!(select_preset(None, Some("failed vs succeeded")), ChartPreset::StatusBreakdown);
        assert_eq!(select_preset(None, Some("anything")), ChartPreset::TimeSeries);
        assert_eq!(select_preset(None, None), ChartPreset::TimeSeries);
    }

    #[test]
    fn time_series_groups_by_day() {
        let rows = vec![
            json!({"created_at": "2024-06-02T10:00:00", "amount": 10.0}),
            json!({"created_at": "2024-06-01T09:00:00", "amount": "5.25"}),
            json!({"created_at": "2024-06-02T18:00:00", "amount": 2.5}),
            json!({"amount": 1.0}),
        ];
        let chart = map_rows(&rows, ChartPreset::TimeSeries);
        assert_eq!(chart.labels, vec!["2024-06-01", "2024-06-02"]);
        assert_eq!(chart.series[0].values, vec![1.0, 2.0]);
        assert_eq!(chart.series[1].values, vec![5.25, 12.5]);
        assert_eq!(chart.skipped, 1);
    }

    #[test]
    fn amount_distribution_buckets() {
        let rows: Vec<Value> = [0.0, 24.99, 25.0, 99.0, 100.0, 499.0, 500.0, 10_000.0]
            .iter()
            .map(|a| json!({ "amount": a }))
            .chain([json!({"amount": null})])
            .collect();
        let chart = map_rows(&rows, ChartPreset::AmountDistribution);
        assert_eq!(chart.labels, vec!["$0-25", "$25-50", "$50-100", "$100-250", "$250-500", "$500+"]);
        assert_eq!(chart.series[0].values, vec![2.0, 1.0, 1.0, 1.0, 1.0, 2.0]);
        assert_eq!(chart.skipped, 1);
    }

    #[test]
    fn status_breakdown_orders_by_count() {
        let rows = vec![
            json!({"status": "failed"}),
            json!({"status": "Succeeded"}),
            json!({"status": "succeeded"}),
            json!({}),
        ];
        let chart = map_rows(&rows, ChartPreset::StatusBreakdown);
        assert_eq!(chart.labels, vec!["succeeded", "failed", "unknown"]);
        assert_eq!(chart.series[0].values, vec![2.0, 1.0, 1.0]);
    }
}
