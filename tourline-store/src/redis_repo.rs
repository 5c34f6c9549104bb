use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::OnceCell;
use tourline_core::routing::{RouteCache, RouteEstimate};
use tracing::{debug, warn};

/// Route cache on Redis.
///
/// Every Redis or decoding error is logged and absorbed: reads become misses
/// and writes become no-ops.
#[derive(Clone)]
pub struct RedisRouteCache {
    client: redis::Client,
    conn: std::sync::Arc<OnceCell<MultiplexedConnection>>,
}

impl RedisRouteCache {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self {
            client,
            conn: std::sync::Arc::new(OnceCell::new()),
        })
    }

    // The multiplexed connection reconnects by itself once established.
    async fn connection(&self) -> redis::RedisResult<MultiplexedConnection> {
        self.conn
            .get_or_try_init(|| self.client.get_multiplexed_async_connection())
            .await
            .cloned()
    }

    async fn try_get(&self, key: &str) -> redis::RedisResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get(key).await
    }

    async fn try_set(&self, key: &str, payload: String, ttl: Duration) -> redis::RedisResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, payload, ttl.as_secs().max(1)).await
    }
}

#[async_trait]
impl RouteCache for RedisRouteCache {
    async fn get(&self, key: &str) -> Option<RouteEstimate> {
        match self.try_get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(estimate) => Some(estimate),
                Err(e) => {
                    warn!("Discarding unreadable route cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Route cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &RouteEstimate, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                warn!("Could not encode route for cache {}: {}", key, e);
                return;
            }
        };

        match self.try_set(key, payload, ttl).await {
            Ok(()) => debug!("Route cached: {} (ttl {}s)", key, ttl.as_secs()),
            Err(e) => warn!("Route cache write failed for {}: {}", key, e),
        }
    }
}
