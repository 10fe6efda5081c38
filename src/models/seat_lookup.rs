use serde::{Deserialize, Serialize};

/// Строка результата поиска по имени (то, что видит оператор).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatLookupResult {
    pub event_name: String,
    pub event_start_date: Option<String>,
    pub event_start_time: Option<String>,
    pub payment_id: i64,
    pub amount: f64,
    pub payer_name: String,
    pub seat_info: Option<String>,
    pub transaction_id: Option<String>,
    pub status: String,
    pub created_at: chrono::NaiveDateTime,
}
