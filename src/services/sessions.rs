//! Per-visitor session state (currently the summary visit counter)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::{sync::RwLock, time::Instant};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Session loaded for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub id: String,
    pub num_visits: i64,
    /// Not yet known to the store; the client needs a cookie
    pub is_new: bool,
}

impl SessionContext {
    pub fn fresh() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            num_visits: 0,
            is_new: true,
        }
    }

    /// Count this visit and return the number seen before it
    pub fn record_visit(&mut self) -> i64 {
        let previous = self.num_visits;
        self.num_visits += 1;
        previous
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Session for the cookie value, or a fresh one when unknown or absent
    async fn load(&self, id: Option<&str>) -> AppResult<SessionContext>;
    async fn save(&self, session: &SessionContext) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy)]
struct StoredVisits {
    count: i64,
    last_seen: Instant,
}

/// Sessions kept in process memory, expiring after `ttl_seconds` without
/// a visit like the Redis store
#[derive(Clone)]
pub struct MemorySessionStore {
    visits: Arc<RwLock<HashMap<String, StoredVisits>>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            visits: Arc::default(),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    fn is_live(&self, stored: &StoredVisits, now: Instant) -> bool {
        now.duration_since(stored.last_seen) < self.ttl
    }

    /// Sessions currently held
    pub async fn session_count(&self) -> usize {
        self.visits.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: Option<&str>) -> AppResult<SessionContext> {
        let now = Instant::now();
        let visits = self.visits.read().await;
        Ok(match id.and_then(|id| visits.get_key_value(id)) {
            Some((id, stored)) if self.is_live(stored, now) => SessionContext {
                id: id.clone(),
                num_visits: stored.count,
                is_new: false,
            },
            _ => SessionContext::fresh(),
        })
    }

    async fn save(&self, session: &SessionContext) -> AppResult<()> {
        let now = Instant::now();
        let mut visits = self.visits.write().await;
        visits.retain(|_, stored| self.is_live(stored, now));
        if !self.ttl.is_zero() {
            visits.insert(
                session.id.clone(),
                StoredVisits {
                    count: session.num_visits,
                    last_seen: now,
                },
            );
        }
        Ok(())
    }
}

/// Sessions kept in Redis, expiring after `ttl_seconds` without a visit
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    /// Connect and check the server answers
    pub async fn new(url: &str, ttl_seconds: u64) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;
        let mut connection = ConnectionManager::new(client).await?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut connection)
            .await?;

        Ok(Self {
            connection,
            ttl_seconds,
        })
    }

    fn key(id: &str) -> String {
        format!("session:{}:num_visits", id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: Option<&str>) -> AppResult<SessionContext> {
        let Some(id) = id else {
            return Ok(SessionContext::fresh());
        };
        let mut conn = self.connection.clone();
        let stored: Option<i64> = conn.get(Self::key(id)).await?;

        Ok(match stored {
            Some(num_visits) => SessionContext {
                id: id.to_string(),
                num_visits,
                is_new: false,
            },
            None => SessionContext::fresh(),
        })
    }

    async fn save(&self, session: &SessionContext) -> AppResult<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(Self::key(&session.id), session.num_visits, self.ttl_seconds)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 24 * 3600;

    #[tokio::test]
    async fn test_memory_sessions_count_visits() {
        let store = MemorySessionStore::new(DAY);

        let mut session = store.load(None).await.unwrap();
        assert!(session.is_new);
        assert_eq!(session.record_visit(), 0);
        store.save(&session).await.unwrap();

        let mut again = store.load(Some(&session.id)).await.unwrap();
        assert!(!again.is_new);
        assert_eq!(again.record_visit(), 1);
        assert_eq!(again.num_visits, 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_keeps_nothing() {
        let store = MemorySessionStore::new(0);
        for _ in 0..3 {
            let mut session = store.load(None).await.unwrap();
            session.record_visit();
            store.save(&session).await.unwrap();

            let again = store.load(Some(&session.id)).await.unwrap();
            assert!(again.is_new);
        }
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire_and_are_pruned() {
        let store = MemorySessionStore::new(60);
        let mut idle = store.load(None).await.unwrap();
        idle.record_visit();
        store.save(&idle).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!store.load(Some(&idle.id)).await.unwrap().is_new);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(store.load(Some(&idle.id)).await.unwrap().is_new);

        let mut active = store.load(None).await.unwrap();
        active.record_visit();
        store.save(&active).await.unwrap();
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_session_starts_over() {
        let store = MemorySessionStore::new(DAY);
        let session = store.load(Some("forged")).await.unwrap();
        assert!(session.is_new);
        assert_ne!(session.id, "forged");
    }
}
