//! Persistence seams of the practice core.
//!
//! The selector, tracker and session controller only talk to these traits.
//! MongoDB and Redis back them in production, the in-memory variants back
//! tests and the `memory` storage backend.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::models::{
    attempt::Attempt, competency::Competency, question::Question, PracticeSession,
};

pub mod memory;
pub mod mongo;
pub mod redis_sessions;

pub use memory::{
    InMemoryAttemptLog, InMemoryCompetencyStore, InMemoryQuestionRepository,
    InMemorySessionStore,
};
pub use mongo::{MongoAttemptLog, MongoCompetencyStore, MongoQuestionRepository};
pub use redis_sessions::RedisSessionStore;

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Distinct topic ids that have at least one question, sorted
    async fn list_topics(&self) -> Result<Vec<String>>;

    async fn find_by_topic(&self, topic_id: &str) -> Result<Vec<Question>>;

    async fn find_by_topic_and_difficulty(
        &self,
        topic_id: &str,
        difficulty: u8,
    ) -> Result<Vec<Question>>;

    async fn get(&self, question_id: &str) -> Result<Option<Question>>;
}

#[async_trait]
pub trait CompetencyStore: Send + Sync {
    async fn read(&self, user_id: &str, topic_id: &str) -> Result<Option<Competency>>;

    async fn read_all(&self, user_id: &str) -> Result<Vec<Competency>>;

    /// Inserts or replaces the row keyed by (user, topic)
    async fn write(&self, competency: &Competency) -> Result<()>;
}

#[async_trait]
pub trait AttemptLog: Send + Sync {
    async fn append(&self, attempt: &Attempt) -> Result<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns `None` for unknown or expired sessions
    async fn load(&self, session_id: &str) -> Result<Option<PracticeSession>>;

    async fn save(&self, session: &PracticeSession, ttl: Duration) -> Result<()>;

    /// Returns whether a live session was removed
    async fn remove(&self, session_id: &str) -> Result<bool>;
}
