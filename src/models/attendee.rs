use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Attendee {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Attendee {
    /// "Имя Фамилия" без лишних пробелов; `None`, если оба поля пустые.
    pub fn full_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(name)
    }
}

// Место участника. Загружается по желанию, может отсутствовать.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SeatAssignment {
    pub event_attendee_id: i64,
    pub section: Option<String>,
    pub row_label: Option<String>,
    pub seat_number: Option<String>,
}

impl SeatAssignment {
    pub fn label(&self) -> Option<String> {
        let parts: Vec<String> = [
            ("Section", &self.section),
            ("Row", &self.row_label),
            ("Seat", &self.seat_number),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{} {}", name, v))
        })
        .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}
