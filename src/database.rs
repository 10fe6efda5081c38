use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::{DatabaseConfig, DatabaseConnection};

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    /// Создает пул без установки соединения: первое подключение
    /// открывается при первом запросе.
    ///
    /// Каждая сессия открывается в режиме read-only и с `statement_timeout`.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = Self::connect_options(config)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);

        info!(
            "Database pool configured (size={}, statement_timeout={}ms, ssl_required={})",
            config.pool_size, config.statement_timeout_ms, config.ssl_required
        );
        Ok(Database { pool })
    }

    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Database { pool }
    }

    fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
        let options = match &config.connection {
            DatabaseConnection::Url(url) => PgConnectOptions::from_str(url)?,
            DatabaseConnection::Discrete { host, port, user, password, db } => {
                PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .username(user)
                    .password(password)
                    .database(db)
            }
        };

        let ssl_mode = if config.ssl_required {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        Ok(options
            .ssl_mode(ssl_mode)
            .application_name("ticket_admin")
            .options([
                ("default_transaction_read_only", "on".to_string()),
                ("statement_timeout", config.statement_timeout_ms.to_string()),
            ]))
    }

    /// Проверка доступности БД при старте.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }
}
