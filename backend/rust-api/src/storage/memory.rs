use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{AttemptLog, CompetencyStore, QuestionRepository, SessionStore};
use crate::models::{
    attempt::Attempt,
    competency::Competency,
    question::{Question, MAX_DIFFICULTY, MIN_DIFFICULTY},
    PracticeSession,
};

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    questions: RwLock<BTreeMap<String, Question>>,
}

impl InMemoryQuestionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        let questions = questions
            .into_iter()
            .map(|question| (question.id.clone(), question))
            .collect();
        Self {
            questions: RwLock::new(questions),
        }
    }

    /// Loads a JSON array of questions
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read question file {}", path.display()))?;
        let questions: Vec<Question> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse question file {}", path.display()))?;

        for question in &questions {
            if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&question.difficulty) {
                bail!(
                    "Question {} has difficulty {} outside {}..={}",
                    question.id,
                    question.difficulty,
                    MIN_DIFFICULTY,
                    MAX_DIFFICULTY
                );
            }
            if question.correct_answer_index().is_none() {
                bail!("Question {} has no correct answer", question.id);
            }
        }
        tracing::info!("Loaded {} questions from {}", questions.len(), path.display());
        Ok(Self::with_questions(questions))
    }

    pub async fn insert(&self, question: Question) {
        self.questions
            .write()
            .await
            .insert(question.id.clone(), question);
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn list_topics(&self) -> Result<Vec<String>> {
        let questions = self.questions.read().await;
        let mut topics: Vec<String> = questions.values().map(|q| q.topic_id.clone()).collect();
        topics.sort();
        topics.dedup();
        Ok(topics)
    }

    async fn find_by_topic(&self, topic_id: &str) -> Result<Vec<Question>> {
        let questions = self.questions.read().await;
        Ok(questions
            .values()
            .filter(|q| q.topic_id == topic_id)
            .cloned()
            .collect())
    }

    async fn find_by_topic_and_difficulty(
        &self,
        topic_id: &str,
        difficulty: u8,
    ) -> Result<Vec<Question>> {
        let questions = self.questions.read().await;
        Ok(questions
            .values()
            .filter(|q| q.topic_id == topic_id && q.difficulty == difficulty)
            .cloned()
            .collect())
    }

    async fn get(&self, question_id: &str) -> Result<Option<Question>> {
        Ok(self.questions.read().await.get(question_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryCompetencyStore {
    rows: RwLock<HashMap<String, Competency>>,
}

impl InMemoryCompetencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompetencyStore for InMemoryCompetencyStore {
    async fn read(&self, user_id: &str, topic_id: &str) -> Result<Option<Competency>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&Competency::key(user_id, topic_id)).cloned())
    }

    async fn read_all(&self, user_id: &str) -> Result<Vec<Competency>> {
        let rows = self.rows.read().await;
        let mut competencies: Vec<Competency> = rows
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        competencies.sort_by(|a, b| a.topic_id.cmp(&b.topic_id));
        Ok(competencies)
    }

    async fn write(&self, competency: &Competency) -> Result<()> {
        self.rows
            .write()
            .await
            .insert(competency.id.clone(), competency.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAttemptLog {
    attempts: RwLock<Vec<Attempt>>,
}

impl InMemoryAttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attempts(&self) -> Vec<Attempt> {
        self.attempts.read().await.clone()
    }
}

#[async_trait]
impl AttemptLog for InMemoryAttemptLog {
    async fn append(&self, attempt: &Attempt) -> Result<()> {
        self.attempts.write().await.push(attempt.clone());
        Ok(())
    }
}

/// Session map with TTL expiry. Expired entries are evicted lazily on every
/// load and save, so abandoned sessions cannot accumulate.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, (PracticeSession, Instant)>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired session and returns how many were removed
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} expired practice sessions", evicted);
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<PracticeSession>> {
        self.evict_expired().await;
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).map(|(session, _)| session.clone()))
    }

    async fn save(&self, session: &PracticeSession, ttl: Duration) -> Result<()> {
        self.evict_expired().await;
        let expires_at = Instant::now() + ttl;
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), (session.clone(), expires_at));
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }
}
