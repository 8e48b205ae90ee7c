use crate::config::{Config, StorageBackend};
use crate::storage::{
    AttemptLog, CompetencyStore, InMemoryAttemptLog, InMemoryCompetencyStore,
    InMemoryQuestionRepository, InMemorySessionStore, MongoAttemptLog, MongoCompetencyStore,
    MongoQuestionRepository, QuestionRepository, RedisSessionStore, SessionStore,
};
use mongodb::{Client as MongoClient, Database};
use redis::aio::ConnectionManager;
use std::sync::Arc;

/// Store handles shared by every request.
#[derive(Clone)]
pub struct PracticeStores {
    pub questions: Arc<dyn QuestionRepository>,
    pub competencies: Arc<dyn CompetencyStore>,
    pub attempts: Arc<dyn AttemptLog>,
    pub sessions: Arc<dyn SessionStore>,
}

impl PracticeStores {
    pub fn mongo(mongo: &Database, redis: ConnectionManager) -> Self {
        Self {
            questions: Arc::new(MongoQuestionRepository::new(mongo)),
            competencies: Arc::new(MongoCompetencyStore::new(mongo)),
            attempts: Arc::new(MongoAttemptLog::new(mongo)),
            sessions: Arc::new(RedisSessionStore::new(redis)),
        }
    }

    pub fn in_memory(questions: InMemoryQuestionRepository) -> Self {
        Self {
            questions: Arc::new(questions),
            competencies: Arc::new(InMemoryCompetencyStore::new()),
            attempts: Arc::new(InMemoryAttemptLog::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
        }
    }
}

pub struct AppState {
    pub config: Config,
    pub stores: PracticeStores,
    /// Only set for the mongo backend; used by the health check
    pub mongo: Option<Database>,
    pub redis: Option<ConnectionManager>,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
    ) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("Attempting to connect to Redis...");

        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        tracing::info!("Redis ConnectionManager created, testing with PING...");

        let mut conn = redis.clone();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");

        Ok(Self {
            stores: PracticeStores::mongo(&mongo, redis.clone()),
            config,
            mongo: Some(mongo),
            redis: Some(redis),
        })
    }

    /// State backed by process-local stores seeded with `questions`.
    pub fn in_memory(config: Config, questions: InMemoryQuestionRepository) -> Self {
        if config.storage != StorageBackend::Memory {
            tracing::warn!(
                "Building in-memory state while storage backend is {:?}",
                config.storage
            );
        }
        Self {
            config,
            stores: PracticeStores::in_memory(questions),
            mongo: None,
            redis: None,
        }
    }
}

pub mod competency_service;
pub mod scoring;
pub mod selection_service;
pub mod session_service;
