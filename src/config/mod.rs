use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub zip: ZipConfig,
    pub query: QueryConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub cors_allowed_origin: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

// Подключение к БД: либо строка подключения, либо отдельные параметры
#[derive(Debug, Clone, Deserialize)]
pub enum DatabaseConnection {
    Url(String),
    Discrete {
        host: String,
        port: u16,
        user: String,
        password: String,
        db: String,
    },
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub connection: DatabaseConnection,
    pub pool_size: u32,
    pub statement_timeout_ms: u64,
    pub ssl_required: bool,
}

// Настройки Redis (кеш необязателен)
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub search_ttl_seconds: u64,
}

// Настройки внешнего API для поиска ZIP-кодов
#[derive(Debug, Clone, Deserialize)]
pub struct ZipConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub delay_ms: u64,
    pub timeout_seconds: u64,
}

// Лимиты для построителя запросов
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let connection = match optional("DATABASE_URL") {
            Some(url) => DatabaseConnection::Url(url),
            None => DatabaseConnection::Discrete {
                host: required("DB_HOST")?,
                port: parsed("DB_PORT", 5432)?,
                user: required("DB_USER")?,
                password: required("DB_PASSWORD")?,
                db: required("DB_NAME")?,
            },
        };

        let log_format = match optional("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        let query = QueryConfig {
            default_limit: parsed("QUERY_DEFAULT_LIMIT", 100)?,
            max_limit: parsed("QUERY_MAX_LIMIT", 1000)?,
        };
        if query.max_limit < 1 || query.default_limit < 1 || query.default_limit > query.max_limit {
            return Err(ConfigError::Invalid {
                name: "QUERY_DEFAULT_LIMIT",
                value: format!("{} (max {})", query.default_limit, query.max_limit),
            });
        }

        Ok(Config {
            app: AppConfig {
                host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed("PORT", 8000)?,
                environment: optional("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
                rust_log: optional("RUST_LOG")
                    .unwrap_or_else(|| "ticket_admin=debug,tower_http=debug".to_string()),
                log_format,
                cors_allowed_origin: optional("CORS_ALLOWED_ORIGIN"),
            },
            database: DatabaseConfig {
                connection,
                pool_size: parsed("DB_POOL_SIZE", 10)?,
                statement_timeout_ms: parsed("DB_STATEMENT_TIMEOUT_MS", 30_000)?,
                ssl_required: parsed("DB_SSL_REQUIRED", true)?,
            },
            redis: RedisConfig {
                url: optional("REDIS_URL"),
                search_ttl_seconds: parsed("SEARCH_CACHE_TTL_SECONDS", 300)?,
            },
            zip: ZipConfig {
                api_url: optional("ZIP_API_URL"),
                api_key: optional("ZIP_API_KEY"),
                delay_ms: parsed("ZIP_LOOKUP_DELAY_MS", 250)?,
                timeout_seconds: parsed("ZIP_HTTP_TIMEOUT_SECONDS", 10)?,
            },
            query,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_falls_back_to_default_when_unset() {
        let value: u64 = parsed("TICKET_ADMIN_SURELY_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn required_reports_the_variable_name() {
        let err = required("TICKET_ADMIN_SURELY_UNSET_VAR").unwrap_err();
        assert_eq!(err.to_string(), "TICKET_ADMIN_SURELY_UNSET_VAR must be set");
    }
}
