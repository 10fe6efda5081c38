use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Платеж. Только чтение: сервис ничего не изменяет в БД.
///
/// `host_user_id` не хранится в `payments`, он выводится через
/// владельца события (`events.user_id`).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub transaction_id: Option<String>,
    pub status: String,
    pub amount: f64,
    pub card_type: Option<String>,
    pub last_four: Option<String>,
    pub created_at: NaiveDateTime,
    pub user_id: Option<i64>,
    pub event_id: i64,
    pub event_attendee_id: Option<i64>,
    pub host_user_id: i64,
}

// Платеж вместе с полями события, нужными для отображения
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct PaymentWithEvent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub payment: Payment,
    pub event_name: String,
    pub event_start_date: Option<NaiveDateTime>,
}
