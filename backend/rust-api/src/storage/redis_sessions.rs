use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;

use super::SessionStore;
use crate::metrics::track_cache_operation;
use crate::models::PracticeSession;

const SESSION_KEY_PREFIX: &str = "practice_session:";

/// Sessions stored as JSON strings; Redis expiry is the eviction policy.
pub struct RedisSessionStore {
    redis: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn session_key(session_id: &str) -> String {
        format!("{}{}", SESSION_KEY_PREFIX, session_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<PracticeSession>> {
        let mut conn = self.redis.clone();
        let session_key = Self::session_key(session_id);

        let session_json: Option<String> = track_cache_operation("get", async {
            redis::cmd("GET")
                .arg(&session_key)
                .query_async(&mut conn)
                .await
                .context("Failed to get session from Redis")
        })
        .await?;

        session_json
            .map(|json| serde_json::from_str(&json).context("Failed to deserialize session"))
            .transpose()
    }

    async fn save(&self, session: &PracticeSession, ttl: Duration) -> Result<()> {
        let mut conn = self.redis.clone();
        let session_key = Self::session_key(&session.id);
        let session_json = serde_json::to_string(session).context("Failed to serialize session")?;
        // SETEX rejects a zero expiry
        let ttl_seconds = ttl.as_secs().max(1);

        track_cache_operation("setex", async {
            redis::cmd("SETEX")
                .arg(&session_key)
                .arg(ttl_seconds)
                .arg(session_json)
                .query_async::<()>(&mut conn)
                .await
                .context("Failed to save session to Redis")
        })
        .await
    }

    async fn remove(&self, session_id: &str) -> Result<bool> {
        let mut conn = self.redis.clone();
        let session_key = Self::session_key(session_id);

        let removed: u32 = track_cache_operation("del", async {
            redis::cmd("DEL")
                .arg(&session_key)
                .query_async(&mut conn)
                .await
                .context("Failed to delete session from Redis")
        })
        .await?;

        Ok(removed > 0)
    }
}
