// Redis-backed session store
// Atomicity comes from MULTI/EXEC pipelines; no application-level locking.

use super::{SessionStore, StoreError, StoreOp, StoreReply};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, FromRedisValue, RedisError, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

/// Session store on a shared multiplexed Redis connection
pub struct RedisSessionStore {
    conn: Arc<Mutex<MultiplexedConnection>>,
}

impl RedisSessionStore {
    /// Connect to Redis at the given URL.
    pub async fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(connection_error)?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(connection_error)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn connection_error(e: RedisError) -> StoreError {
    StoreError::ConnectionError(e.to_string())
}

/// Convert one raw pipeline reply into the typed reply for its operation.
fn reply_for(op: &StoreOp, value: &Value) -> Result<StoreReply, StoreError> {
    match op {
        StoreOp::AddWithScore { .. } | StoreOp::Cardinality { .. } => {
            let count = i64::from_redis_value(value).map_err(|e| {
                StoreError::InvalidReply(format!("expected integer reply for {:?}: {}", op, e))
            })?;
            Ok(StoreReply::Count(count))
        }
        StoreOp::ExpireKey { .. } => {
            i64::from_redis_value(value).map_err(|e| {
                StoreError::InvalidReply(format!("expected integer reply for {:?}: {}", op, e))
            })?;
            Ok(StoreReply::Ok)
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn execute_atomic(&self, ops: Vec<StoreOp>) -> Result<Vec<StoreReply>, StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in &ops {
            match op {
                StoreOp::AddWithScore { key, member, score } => {
                    pipe.zadd(key, member, *score);
                }
                StoreOp::Cardinality { key } => {
                    pipe.zcard(key);
                }
                StoreOp::ExpireKey { key, ttl_secs } => {
                    pipe.expire(key, *ttl_secs);
                }
            }
        }

        let mut conn = self.conn.lock().await;
        let values: Vec<Value> = pipe.query_async(&mut *conn).await.map_err(|e| {
            error!("Redis batch of {} ops failed: {}", ops.len(), e);
            connection_error(e)
        })?;

        if values.len() != ops.len() {
            return Err(StoreError::InvalidReply(format!(
                "batch of {} ops returned {} replies",
                ops.len(),
                values.len()
            )));
        }

        ops.iter()
            .zip(values.iter())
            .map(|(op, value)| reply_for(op, value))
            .collect()
    }

    async fn member_score(&self, key: &str, member: &str) -> Result<Option<i64>, StoreError> {
        let mut conn = self.conn.lock().await;
        let score: Option<i64> = conn.zscore(key, member).await.map_err(connection_error)?;
        Ok(score)
    }

    async fn remove_member(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let _: i64 = conn.zrem(key, member).await.map_err(connection_error)?;
        Ok(())
    }

    async fn remove_range_by_rank(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let _: i64 = conn
            .zremrangebyrank(key, start as isize, stop as isize)
            .await
            .map_err(connection_error)?;
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let _: i64 = conn.del(key).await.map_err(connection_error)?;
        Ok(())
    }

    async fn count_greater_than(&self, key: &str, min_score: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn.lock().await;
        let count: i64 = conn
            .zcount(key, format!("({}", min_score), "+inf")
            .await
            .map_err(connection_error)?;
        Ok(count)
    }
}
