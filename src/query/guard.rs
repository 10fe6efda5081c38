use once_cell::sync::Lazy;
use regex::Regex;

use super::QueryError;

/// Тип разрешенного запроса.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Explain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuardedSql {
    pub sql: String,
    pub kind: StatementKind,
}

static FORBIDDEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(insert|update|delete|merge|drop|alter|create|truncate|grant|revoke|copy|call|vacuum|lock|into|refresh|reindex|cluster)\b",
    )
    .expect("static regex")
});

static FIRST_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\(*\s*([A-Za-z]+)").expect("static regex"));

/// Проверяет "сырой" SQL перед выполнением.
///
/// Разрешен ровно один запрос на чтение. Строки, идентификаторы в кавычках,
/// dollar-quoted тела и комментарии в проверке ключевых слов не участвуют.
/// Это дополнительный слой поверх read-only сессии БД.
pub fn check(sql: &str) -> Result<GuardedSql, QueryError> {
    let code = strip_literals(sql)?;

    // разрешаем только завершающие `;`
    let trimmed_code = code.trim_end().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if trimmed_code.trim().is_empty() {
        return Err(QueryError::EmptyStatement);
    }
    if trimmed_code.contains(';') {
        return Err(QueryError::MultipleStatements);
    }

    let first = FIRST_WORD
        .captures(trimmed_code)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .ok_or(QueryError::NotAQuery)?;
    let kind = match first.as_str() {
        "select" | "with" | "table" | "values" => StatementKind::Select,
        "explain" => StatementKind::Explain,
        _ => return Err(QueryError::NotAQuery),
    };

    if let Some(found) = FORBIDDEN.find(trimmed_code) {
        return Err(QueryError::ForbiddenKeyword(found.as_str().to_ascii_uppercase()));
    }

    // `code` и `sql` совпадают по длине в байтах, поэтому срез безопасен
    let statement = sql[..trimmed_code.len()].trim().to_string();
    Ok(GuardedSql { sql: statement, kind })
}

/// Заменяет содержимое строк, идентификаторов в кавычках и комментариев
/// пробелами (dollar-quoted тела - символами `$`) той же длины в байтах,
/// чтобы смещения совпадали с исходным текстом.
fn strip_literals(sql: &str) -> Result<String, QueryError> {
    let bytes = sql.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    let blank = |out: &mut Vec<u8>, from: &[u8]| {
        // многобайтовые символы тоже превращаем в пробелы побайтно
        out.extend(from.iter().map(|b| if *b == b'\n' { b'\n' } else { b' ' }));
    };

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                let quote = bytes[i];
                let escapes = quote == b'\'' && is_escape_prefix(bytes, i);
                let mut j = i + 1;
                loop {
                    if j >= bytes.len() {
                        return Err(QueryError::Unterminated);
                    }
                    // в E'...' обратный слеш экранирует следующий байт
                    if escapes && bytes[j] == b'\\' {
                        j += 2;
                        continue;
                    }
                    if bytes[j] == quote {
                        // удвоенная кавычка внутри литерала
                        if j + 1 < bytes.len() && bytes[j + 1] == quote {
                            j += 2;
                            continue;
                        }
                        break;
                    }
                    j += 1;
                }
                // кавычки остаются, содержимое стирается
                out.push(quote);
                blank(&mut out, &bytes[i + 1..j]);
                out.push(quote);
                i = j + 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = bytes[i..].iter().position(|b| *b == b'\n').map_or(bytes.len(), |p| i + p);
                blank(&mut out, &bytes[i..end]);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = sql[i + 2..]
                    .find("*/")
                    .map(|p| i + 2 + p + 2)
                    .ok_or(QueryError::Unterminated)?;
                blank(&mut out, &bytes[i..end]);
                i = end;
            }
            b'$' if i > 0 && is_ident_byte(bytes[i - 1]) => {
                // `$` внутри идентификатора (`a$b$`), не кавычка
                out.push(b'$');
                i += 1;
            }
            b'$' => match dollar_tag(&sql[i..]) {
                Some(tag) => {
                    let body_start = i + tag.len();
                    let end = sql[body_start..]
                        .find(tag)
                        .map(|p| body_start + p + tag.len())
                        .ok_or(QueryError::Unterminated)?;
                    out.extend(std::iter::repeat(b'$').take(end - i));
                    i = end;
                }
                None => {
                    out.push(b'$');
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|_| QueryError::InvalidValue("statement is not valid UTF-8".to_string()))
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

// Литерал вида E'...' / e'...': перед кавычкой стоит `E`, и это не хвост
// идентификатора вроде `name'`.
fn is_escape_prefix(bytes: &[u8], quote_at: usize) -> bool {
    match quote_at.checked_sub(1).map(|p| bytes[p]) {
        Some(b'E') | Some(b'e') => quote_at < 2 || !is_ident_byte(bytes[quote_at - 2]),
        _ => false,
    }
}

// `$$` или `$tag$`; `$1` - это параметр, а не кавычка
fn dollar_tag(s: &str) -> Option<&str> {
    let rest = &s[1..];
    let end = rest.find('$')?;
    let tag = &rest[..end];
    let valid = tag.is_empty()
        || (tag.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    valid.then(|| &s[..end + 2])
}
