use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{BuiltQuery, QueryError, SqlParam};
use crate::config::QueryConfig;

/// Таблица, по которой строится запрос в режиме "Form".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSelection {
    #[default]
    Payments,
    #[serde(alias = "attendees")]
    EventAttendees,
    Events,
}

impl TableSelection {
    pub fn name(self) -> &'static str {
        match self {
            TableSelection::Payments => "payments",
            TableSelection::EventAttendees => "event_attendees",
            TableSelection::Events => "events",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            TableSelection::Payments => &[
                "id",
                "transaction_id",
                "status",
                "amount",
                "card_type",
                "last_four",
                "created_at",
                "user_id",
                "event_id",
                "event_attendee_id",
            ],
            TableSelection::EventAttendees => &[
                "id",
                "first_name",
                "last_name",
                "email",
                "event_id",
                "checked_in",
                "created_at",
            ],
            TableSelection::Events => &[
                "id",
                "name",
                "user_id",
                "start_date",
                "is_published",
                "created_at",
            ],
        }
    }

    /// Колонка, к которой применяется диапазон дат и сортировка.
    pub fn date_column(self) -> &'static str {
        match self {
            TableSelection::Events => "start_date",
            _ => "created_at",
        }
    }

    pub fn boolean_columns(self) -> &'static [&'static str] {
        match self {
            TableSelection::Payments => &["is_refunded"],
            TableSelection::EventAttendees => &["checked_in"],
            TableSelection::Events => &["is_published"],
        }
    }

    fn has_payment_fields(self) -> bool {
        matches!(self, TableSelection::Payments)
    }
}

/// Разреженный набор фильтров из формы дашборда.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterForm {
    pub table: TableSelection,
    pub status: Option<String>,
    pub card_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
    pub flags: BTreeMap<String, bool>,
    pub host_user_id: Option<i64>,
    pub limit: Option<i64>,
}

// Инкрементальный сборщик: каждое значение становится следующим $n
struct SqlBuilder {
    sql: String,
    params: Vec<SqlParam>,
    conditions: usize,
}

impl SqlBuilder {
    fn new(head: String) -> Self {
        Self { sql: head, params: Vec::new(), conditions: 0 }
    }

    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    fn and_where(&mut self, clause: String) {
        self.sql.push_str(if self.conditions == 0 { " WHERE " } else { " AND " });
        self.sql.push_str(&clause);
        self.conditions += 1;
    }

    fn finish(self) -> BuiltQuery {
        BuiltQuery { sql: self.sql, params: self.params }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl FilterForm {
    /// Проверяет форму и собирает SQL.
    ///
    /// Если задан `host_user_id` и таблица не `events`, запрос переходит
    /// на алиасы (`t.` / `e.`) и присоединяет `events` по `event_id`.
    pub fn build(&self, limits: &QueryConfig) -> Result<BuiltQuery, QueryError> {
        self.validate()?;

        let table = self.table;
        let joined = self.host_user_id.is_some() && table != TableSelection::Events;
        let col = |name: &str| if joined { format!("t.{}", name) } else { name.to_string() };

        let mut select: Vec<String> = table.columns().iter().map(|c| col(*c)).collect();
        let head = if joined {
            select.push("e.name AS event_name".to_string());
            format!(
                "SELECT {} FROM {} t JOIN events e ON e.id = t.event_id",
                select.join(", "),
                table.name()
            )
        } else {
            format!("SELECT {} FROM {}", select.join(", "), table.name())
        };
        let mut builder = SqlBuilder::new(head);

        if let Some(host_user_id) = self.host_user_id {
            let p = builder.bind(SqlParam::Int(host_user_id));
            if joined {
                builder.and_where(format!("e.user_id = {}", p));
            } else {
                builder.and_where(format!("user_id = {}", p));
            }
        }

        if let Some(status) = non_empty(&self.status) {
            let p = builder.bind(SqlParam::Text(status.to_string()));
            builder.and_where(format!("LOWER({}) = LOWER({})", col("status"), p));
        }

        if let Some(card_type) = non_empty(&self.card_type) {
            let p = builder.bind(SqlParam::Text(card_type.to_string()));
            builder.and_where(format!("LOWER({}) = LOWER({})", col("card_type"), p));
        }

        let date_col = col(table.date_column());
        if let Some(from) = self.date_from {
            let p = builder.bind(SqlParam::Timestamp(from.and_time(chrono::NaiveTime::MIN)));
            builder.and_where(format!("{} >= {}", date_col, p));
        }
        if let Some(to) = self.date_to {
            // верхняя граница включительно: всё до начала следующего дня
            let next = to
                .checked_add_days(Days::new(1))
                .ok_or_else(|| QueryError::InvalidValue(format!("dateTo {} is out of range", to)))?;
            let p = builder.bind(SqlParam::Timestamp(next.and_time(chrono::NaiveTime::MIN)));
            builder.and_where(format!("{} < {}", date_col, p));
        }

        if let Some(min) = self.amount_min {
            let p = builder.bind(SqlParam::Float(min));
            builder.and_where(format!("{} >= {}", col("amount"), p));
        }
        if let Some(max) = self.amount_max {
            let p = builder.bind(SqlParam::Float(max));
            builder.and_where(format!("{} <= {}", col("amount"), p));
        }

        for (column, value) in &self.flags {
            let p = builder.bind(SqlParam::Bool(*value));
            builder.and_where(format!("{} = {}", col(column.as_str()), p));
        }

        let limit = self
            .limit
            .unwrap_or(limits.default_limit)
            .clamp(1, limits.max_limit);
        let p = builder.bind(SqlParam::Int(limit));
        builder.sql.push_str(&format!(" ORDER BY {} DESC LIMIT {}", date_col, p));

        Ok(builder.finish())
    }

    fn validate(&self) -> Result<(), QueryError> {
        let table = self.table;
        if !table.has_payment_fields() {
            let unsupported = [
                ("status", non_empty(&self.status).is_some()),
                ("cardType", non_empty(&self.card_type).is_some()),
                ("amountMin", self.amount_min.is_some()),
                ("amountMax", self.amount_max.is_some()),
            ];
            if let Some((filter, _)) = unsupported.into_iter().find(|(_, set)| *set) {
                return Err(QueryError::UnsupportedFilter { table: table.name(), filter });
            }
        }

        if let Some(column) = self
            .flags
            .keys()
            .find(|c| !table.boolean_columns().contains(&c.as_str()))
        {
            return Err(QueryError::UnknownFlag { table: table.name(), column: column.clone() });
        }

        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(QueryError::InvalidRange(format!("dateFrom {} is after dateTo {}", from, to)));
            }
        }

        for amount in [self.amount_min, self.amount_max].into_iter().flatten() {
            if !amount.is_finite() || amount < 0.0 {
                return Err(QueryError::InvalidValue(format!("amount {} must be a non-negative number", amount)));
            }
        }
        if let (Some(min), Some(max)) = (self.amount_min, self.amount_max) {
            if min > max {
                return Err(QueryError::InvalidRange(format!("amountMin {} is greater than amountMax {}", min, max)));
            }
        }

        if let Some(host_user_id) = self.host_user_id {
            if host_user_id <= 0 {
                return Err(QueryError::InvalidValue("hostUserId must be > 0".to_string()));
            }
        }

        Ok(())
    }
}
