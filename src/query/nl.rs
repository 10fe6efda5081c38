//! Перевод текстового запроса оператора в `FilterForm`.
//!
//! Интерпретатор детерминированный: ищет в тексте ключевые слова
//! (таблица, статус, бренд карты, суммы, даты, лимит, флаги) и заполняет
//! форму. SQL затем строит `FilterForm::build`, поэтому все значения
//! уходят в запрос только как параметры.

use chrono::{Datelike, Days, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use super::filter::{FilterForm, TableSelection};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex")
}

static PAYMENT_WORDS: Lazy<Regex> =
    Lazy::new(|| re(r"\b(payments?|transactions?|charges?|sales|orders?|revenue|purchases?)\b"));
static ATTENDEE_WORDS: Lazy<Regex> =
    Lazy::new(|| re(r"\b(attendees?|guests?|ticket ?holders?|registrants?)\b"));
static EVENT_WORDS: Lazy<Regex> = Lazy::new(|| re(r"\b(events?|shows?)\b"));

static STATUS_WORDS: Lazy<[(Regex, &'static str); 4]> = Lazy::new(|| {
    [
        (re(r"\b(failed|failing|declined|unsuccessful)\b"), "failed"),
        (re(r"\b(refund|refunds|refunded)\b"), "refunded"),
        (re(r"\b(pending|processing)\b"), "pending"),
        (re(r"\b(succeeded|successful|paid|completed|approved)\b"), "succeeded"),
    ]
});

static CARD_WORDS: Lazy<[(Regex, &'static str); 4]> = Lazy::new(|| {
    [
        (re(r"\bvisa\b"), "visa"),
        (re(r"\bmaster ?card\b"), "mastercard"),
        (re(r"\b(amex|american express)\b"), "amex"),
        (re(r"\bdiscover\b"), "discover"),
    ]
});

const NUMBER: &str = r"\$?\s*(\d+(?:\.\d+)?)";

static BETWEEN: Lazy<Regex> = Lazy::new(|| re(&format!(r"\bbetween\s+{NUMBER}\s+and\s+{NUMBER}")));
static AMOUNT_MIN: Lazy<Regex> =
    Lazy::new(|| re(&format!(r"(?:\b(?:over|above|more than|greater than|at least)|>=?)\s*{NUMBER}")));
static AMOUNT_MAX: Lazy<Regex> =
    Lazy::new(|| re(&format!(r"(?:\b(?:under|below|less than|at most)|<=?)\s*{NUMBER}")));

static LAST_PERIOD: Lazy<Regex> =
    Lazy::new(|| re(r"\b(?:last|past|previous)\s+(?:(\d+)\s+)?(day|week|month|year)s?\b"));
static DATE_ANCHOR: Lazy<Regex> =
    Lazy::new(|| re(r"\b(since|from|after|before|on)\s+(\d{4}-\d{2}-\d{2})\b"));
static NOT_CHECKED_IN: Lazy<Regex> = Lazy::new(|| re(r"\b(not checked[ -]in|no[ -]shows?)\b"));
static CHECKED_IN: Lazy<Regex> = Lazy::new(|| re(r"\bchecked[ -]in\b"));
static UNPUBLISHED: Lazy<Regex> = Lazy::new(|| re(r"\b(unpublished|not published|drafts?)\b"));
static PUBLISHED: Lazy<Regex> = Lazy::new(|| re(r"\b(published|live)\b"));

const MAX_PERIOD_YEARS: u32 = 100;

static LIMIT: Lazy<Regex> =
    Lazy::new(|| re(r"\b(?:top|first|last|latest|recent|limit)\s+(\d+)\b(?:\s+([a-z]+))?"));

/// Разбирает запрос относительно даты `today`.
pub fn interpret(prompt: &str, host_user_id: Option<i64>, today: NaiveDate) -> FilterForm {
    let text = prompt.to_lowercase();

    let table = if PAYMENT_WORDS.is_match(&text) {
        TableSelection::Payments
    } else if ATTENDEE_WORDS.is_match(&text) {
        TableSelection::EventAttendees
    } else if EVENT_WORDS.is_match(&text) {
        TableSelection::Events
    } else {
        TableSelection::Payments
    };

    let mut form = FilterForm { table, host_user_id, ..Default::default() };

    if table == TableSelection::Payments {
        form.status = STATUS_WORDS
            .iter()
            .find(|(pattern, _)| pattern.is_match(&text))
            .map(|(_, status)| status.to_string());
        form.card_type = CARD_WORDS
            .iter()
            .find(|(pattern, _)| pattern.is_match(&text))
            .map(|(_, card)| card.to_string());
        apply_amounts(&text, &mut form);
    }

    apply_dates(&text, today, &mut form);
    apply_flags(&text, &mut form);
    form.limit = parse_limit(&text);

    form
}

fn number(caps: &regex::Captures<'_>, group: usize) -> Option<f64> {
    caps.get(group)?.as_str().parse().ok()
}

fn apply_amounts(text: &str, form: &mut FilterForm) {
    if let Some(caps) = BETWEEN.captures(text) {
        if let (Some(a), Some(b)) = (number(&caps, 1), number(&caps, 2)) {
            form.amount_min = Some(a.min(b));
            form.amount_max = Some(a.max(b));
            return;
        }
    }
    form.amount_min = AMOUNT_MIN.captures(text).and_then(|c| number(&c, 1));
    form.amount_max = AMOUNT_MAX.captures(text).and_then(|c| number(&c, 1));
}

fn apply_dates(text: &str, today: NaiveDate, form: &mut FilterForm) {
    if text.contains("yesterday") {
        let yesterday = today.pred_opt().unwrap_or(today);
        form.date_from = Some(yesterday);
        form.date_to = Some(yesterday);
    } else if text.contains("today") {
        form.date_from = Some(today);
        form.date_to = Some(today);
    } else if text.contains("this week") {
        let offset = u64::from(today.weekday().num_days_from_monday());
        form.date_from = today.checked_sub_days(Days::new(offset));
        form.date_to = Some(today);
    } else if text.contains("this month") {
        form.date_from = today.with_day(1);
        form.date_to = Some(today);
    } else if text.contains("this year") {
        form.date_from = NaiveDate::from_ymd_opt(today.year(), 1, 1);
        form.date_to = Some(today);
    } else if let Some(caps) = LAST_PERIOD.captures(text) {
        let unit = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let n = caps.get(1).map_or(1, |m| period_count(m.as_str(), unit));
        let from = match unit {
            "day" => today.checked_sub_days(Days::new(u64::from(n))),
            "week" => today.checked_sub_days(Days::new(7 * u64::from(n))),
            "month" => today.checked_sub_months(Months::new(n)),
            "year" => today.checked_sub_months(Months::new(12 * n)),
            _ => None,
        };
        form.date_from = from;
        form.date_to = Some(today);
    }

    for caps in DATE_ANCHOR.captures_iter(text) {
        let Some(date) = caps
            .get(2)
            .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
        else {
            continue;
        };
        match caps.get(1).map(|m| m.as_str()) {
            Some("since") | Some("from") => form.date_from = Some(date),
            Some("after") => form.date_from = date.succ_opt(),
            Some("before") => form.date_to = date.pred_opt(),
            Some("on") => {
                form.date_from = Some(date);
                form.date_to = Some(date);
            }
            _ => {}
        }
    }
}

/// Период больше ста лет не имеет смысла для выборки; огромные числа
/// (в том числе не влезающие в `u32`) срезаются до этой границы.
fn period_count(digits: &str, unit: &str) -> u32 {
    let max = match unit {
        "day" => MAX_PERIOD_YEARS * 366,
        "week" => MAX_PERIOD_YEARS * 53,
        "month" => MAX_PERIOD_YEARS * 12,
        _ => MAX_PERIOD_YEARS,
    };
    // в группе только цифры: ошибка разбора означает переполнение
    digits.parse::<u32>().map_or(max, |n| n.min(max))
}

fn apply_flags(text: &str, form: &mut FilterForm) {
    match form.table {
        TableSelection::EventAttendees => {
            if NOT_CHECKED_IN.is_match(text) {
                form.flags.insert("checked_in".to_string(), false);
            } else if CHECKED_IN.is_match(text) {
                form.flags.insert("checked_in".to_string(), true);
            }
        }
        TableSelection::Events => {
            if UNPUBLISHED.is_match(text) {
                form.flags.insert("is_published".to_string(), false);
            } else if PUBLISHED.is_match(text) {
                form.flags.insert("is_published".to_string(), true);
            }
        }
        TableSelection::Payments => {}
    }
}

fn parse_limit(text: &str) -> Option<i64> {
    LIMIT.captures_iter(text).find_map(|caps| {
        let noun = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        // "last 30 days" - это период, а не лимит
        if ["day", "week", "month", "year"].iter().any(|unit| noun.starts_with(unit)) {
            return None;
        }
        caps.get(1)?.as_str().parse().ok()
    })
}
