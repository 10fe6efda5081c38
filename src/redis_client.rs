use redis::{aio::MultiplexedConnection, Client};
use tracing::{info, warn};

#[derive(Clone)]
pub struct RedisClient {
    pub conn: MultiplexedConnection,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(RedisClient { conn })
    }

    /// Подключается к Redis, если он настроен. Кеш необязателен:
    /// при ошибке подключения сервис продолжает работать без него.
    pub async fn connect_optional(redis_url: Option<&str>) -> Option<Self> {
        let url = redis_url?;
        match Self::new(url).await {
            Ok(client) => {
                info!("Redis connected");
                Some(client)
            }
            Err(e) => {
                warn!("Redis unavailable, caching disabled: {:?}", e);
                None
            }
        }
    }
}
