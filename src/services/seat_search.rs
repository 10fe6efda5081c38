//! seat_search.rs
//!
//! Поиск платежей хоста по имени участника.
//!
//! Прямой JOIN платежей с таблицей гостей/мест на больших объемах
//! упирается в таймаут (нет нужных индексов), поэтому поиск разбит на шаги:
//! 1.  **Платежи**: короткий индексированный запрос по хосту с фильтром по имени,
//!     отсортированный по `created_at DESC` и ограниченный лимитом.
//! 2.  **Участники**: один пакетный запрос по уникальным `event_attendee_id`.
//! 3.  **Места** (по желанию): пакетный запрос; ошибка здесь не роняет поиск.
//! 4.  **Слияние в памяти**: `merge_results`.

use sqlx::PgPool;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::cache::{search::seat_lookup_key, CacheService};
use crate::models::{Attendee, PaymentWithEvent, SeatAssignment, SeatLookupResult};
use crate::postprocess::{format_date, format_time, UNKNOWN_PAYER};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

/// Шаг 1: платежи хоста ($1) с участником, чье имя подходит под шаблон ($2),
/// не больше $3 строк. Колонки, которые могут быть NULL в старых записях,
/// закрыты `COALESCE`, чтобы одна такая строка не роняла весь поиск.
const PAYMENTS_BY_ATTENDEE_NAME: &str = r#"
    SELECT
        p.id::bigint AS id,
        p.transaction_id::text AS transaction_id,
        COALESCE(p.status::text, 'unknown') AS status,
        COALESCE(p.amount::float8, 0) AS amount,
        p.card_type::text AS card_type,
        p.last_four::text AS last_four,
        p.created_at::timestamp AS created_at,
        p.user_id::bigint AS user_id,
        p.event_id::bigint AS event_id,
        p.event_attendee_id::bigint AS event_attendee_id,
        e.user_id::bigint AS host_user_id,
        COALESCE(e.name::text, '') AS event_name,
        e.start_date::timestamp AS event_start_date
    FROM payments p
    JOIN events e ON e.id = p.event_id
    WHERE e.user_id = $1
      AND p.created_at IS NOT NULL
      AND EXISTS (
          SELECT 1 FROM event_attendees a
          WHERE a.id = p.event_attendee_id
            AND (a.first_name ILIKE $2
                 OR a.last_name ILIKE $2
                 OR (a.first_name || ' ' || a.last_name) ILIKE $2)
      )
    ORDER BY p.created_at DESC, p.id DESC
    LIMIT $3
"#;

#[derive(Debug, Clone)]
pub struct SeatSearchParams {
    pub query: String,
    pub host_user_id: i64,
    pub limit: Option<i64>,
    pub include_seats: bool,
}

#[derive(Clone)]
pub struct SeatSearch {
    pool: PgPool,
    cache: Option<CacheService>,
    cache_ttl_seconds: u64,
}

/// Экранирует `%`, `_` и `\`, чтобы ввод искался как подстрока, а не шаблон.
pub fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Собирает строки результата из платежей, участников и мест.
///
/// Порядок: `created_at` по убыванию, при равенстве `id` по убыванию.
/// Платеж без участника (или с пустым именем) получает `UNKNOWN_PAYER`.
pub fn merge_results(
    mut payments: Vec<PaymentWithEvent>,
    attendees: &[Attendee],
    seats: &[SeatAssignment],
) -> Vec<SeatLookupResult> {
    let names: HashMap<i64, String> = attendees
        .iter()
        .filter_map(|a| a.full_name().map(|name| (a.id, name)))
        .collect();

    let mut seat_labels: HashMap<i64, Vec<String>> = HashMap::new();
    for seat in seats {
        if let Some(label) = seat.label() {
            seat_labels.entry(seat.event_attendee_id).or_default().push(label);
        }
    }

    payments.sort_by(|a, b| {
        b.payment
            .created_at
            .cmp(&a.payment.created_at)
            .then(b.payment.id.cmp(&a.payment.id))
    });

    payments
        .into_iter()
        .map(|row| {
            let attendee_id = row.payment.event_attendee_id;
            let payer_name = attendee_id
                .and_then(|id| names.get(&id).cloned())
                .unwrap_or_else(|| UNKNOWN_PAYER.to_string());
            let seat_info = attendee_id
                .and_then(|id| seat_labels.get(&id))
                .map(|labels| labels.join("; "));

            SeatLookupResult {
                event_name: row.event_name,
                event_start_date: row.event_start_date.as_ref().map(format_date),
                event_start_time: row.event_start_date.as_ref().map(format_time),
                payment_id: row.payment.id,
                amount: row.payment.amount,
                payer_name,
                seat_info,
                transaction_id: row.payment.transaction_id,
                status: row.payment.status,
                created_at: row.payment.created_at,
            }
        })
        .collect()
}

fn distinct_attendee_ids(payments: &[PaymentWithEvent]) -> Vec<i64> {
    payments
        .iter()
        .filter_map(|p| p.payment.event_attendee_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl SeatSearch {
    pub fn new(pool: PgPool, cache: Option<CacheService>, cache_ttl_seconds: u64) -> Self {
        Self { pool, cache, cache_ttl_seconds }
    }

    pub async fn search(&self, params: &SeatSearchParams) -> Result<Vec<SeatLookupResult>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let key = seat_lookup_key(params.host_user_id, &params.query, limit, params.include_seats);

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get_seat_lookup(&key).await {
                debug!("Seat lookup cache hit for host {}", params.host_user_id);
                return Ok(cached);
            }
        }

        let payments = self
            .fetch_payments(params.host_user_id, &like_pattern(&params.query), limit)
            .await?;
        let attendee_ids = distinct_attendee_ids(&payments);
        let attendees = self.fetch_attendees(&attendee_ids).await?;

        let seats = if params.include_seats && !attendee_ids.is_empty() {
            match self.fetch_seats(&attendee_ids).await {
                Ok(seats) => seats,
                Err(e) => {
                    warn!("Seat info lookup failed, returning results without seats: {:?}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let results = merge_results(payments, &attendees, &seats);
        info!(
            "Seat lookup for host {}: {} payments, {} attendees",
            params.host_user_id,
            results.len(),
            attendees.len()
        );

        if let Some(cache) = &self.cache {
            cache.cache_seat_lookup(&key, &results, self.cache_ttl_seconds).await;
        }
        Ok(results)
    }

    async fn fetch_payments(
        &self,
        host_user_id: i64,
        pattern: &str,
        limit: i64,
    ) -> Result<Vec<PaymentWithEvent>, sqlx::Error> {
        sqlx::query_as::<_, PaymentWithEvent>(PAYMENTS_BY_ATTENDEE_NAME)
            .bind(host_user_id)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn fetch_attendees(&self, ids: &[i64]) -> Result<Vec<Attendee>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Attendee>(
            "SELECT id::bigint AS id, first_name::text AS first_name, last_name::text AS last_name
             FROM event_attendees
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn fetch_seats(&self, attendee_ids: &[i64]) -> Result<Vec<SeatAssignment>, sqlx::Error> {
        sqlx::query_as::<_, SeatAssignment>(
            "SELECT event_attendee_id::bigint AS event_attendee_id,
                    section::text AS section,
                    row_label::text AS row_label,
                    seat_number::text AS seat_number
             FROM event_attendee_seats
             WHERE event_attendee_id = ANY($1)",
        )
        .bind(attendee_ids)
        .fetch_all(&self.pool)
        .await
    }
}
