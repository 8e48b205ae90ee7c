use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson},
    options::{FindOptions, ReplaceOptions},
    Collection, Database,
};

use super::{AttemptLog, CompetencyStore, QuestionRepository};
use crate::metrics::track_db_operation;
use crate::models::{attempt::Attempt, competency::Competency, question::Question};

const QUESTIONS_COLLECTION: &str = "questions";
const COMPETENCIES_COLLECTION: &str = "competencies";
const ATTEMPTS_COLLECTION: &str = "attempts";

pub struct MongoQuestionRepository {
    collection: Collection<Question>,
}

impl MongoQuestionRepository {
    pub fn new(mongo: &Database) -> Self {
        Self {
            collection: mongo.collection(QUESTIONS_COLLECTION),
        }
    }

    async fn find_many(&self, filter: mongodb::bson::Document) -> Result<Vec<Question>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let cursor = self
            .collection
            .find(filter)
            .with_options(options)
            .await
            .context("Failed to query questions")?;

        cursor
            .try_collect()
            .await
            .context("Failed to collect question documents")
    }
}

#[async_trait]
impl QuestionRepository for MongoQuestionRepository {
    async fn list_topics(&self) -> Result<Vec<String>> {
        track_db_operation("distinct", QUESTIONS_COLLECTION, async {
            let values = self
                .collection
                .distinct("topic_id", doc! {})
                .await
                .context("Failed to list question topics")?;

            let mut topics: Vec<String> = values
                .into_iter()
                .filter_map(|value| match value {
                    Bson::String(topic) => Some(topic),
                    _ => None,
                })
                .collect();
            topics.sort();
            Ok(topics)
        })
        .await
    }

    async fn find_by_topic(&self, topic_id: &str) -> Result<Vec<Question>> {
        track_db_operation(
            "find",
            QUESTIONS_COLLECTION,
            self.find_many(doc! { "topic_id": topic_id }),
        )
        .await
    }

    async fn find_by_topic_and_difficulty(
        &self,
        topic_id: &str,
        difficulty: u8,
    ) -> Result<Vec<Question>> {
        track_db_operation(
            "find",
            QUESTIONS_COLLECTION,
            self.find_many(doc! { "topic_id": topic_id, "difficulty": difficulty as i32 }),
        )
        .await
    }

    async fn get(&self, question_id: &str) -> Result<Option<Question>> {
        track_db_operation("find_one", QUESTIONS_COLLECTION, async {
            self.collection
                .find_one(doc! { "_id": question_id })
                .await
                .with_context(|| format!("Failed to fetch question {}", question_id))
        })
        .await
    }
}

pub struct MongoCompetencyStore {
    collection: Collection<Competency>,
}

impl MongoCompetencyStore {
    pub fn new(mongo: &Database) -> Self {
        Self {
            collection: mongo.collection(COMPETENCIES_COLLECTION),
        }
    }
}

#[async_trait]
impl CompetencyStore for MongoCompetencyStore {
    async fn read(&self, user_id: &str, topic_id: &str) -> Result<Option<Competency>> {
        track_db_operation("find_one", COMPETENCIES_COLLECTION, async {
            self.collection
                .find_one(doc! { "_id": Competency::key(user_id, topic_id) })
                .await
                .context("Failed to fetch competency")
        })
        .await
    }

    async fn read_all(&self, user_id: &str) -> Result<Vec<Competency>> {
        track_db_operation("find", COMPETENCIES_COLLECTION, async {
            let options = FindOptions::builder().sort(doc! { "topic_id": 1 }).build();
            let cursor = self
                .collection
                .find(doc! { "user_id": user_id })
                .with_options(options)
                .await
                .context("Failed to query competencies")?;

            cursor
                .try_collect()
                .await
                .context("Failed to collect competency documents")
        })
        .await
    }

    async fn write(&self, competency: &Competency) -> Result<()> {
        track_db_operation("replace_one", COMPETENCIES_COLLECTION, async {
            self.collection
                .replace_one(doc! { "_id": &competency.id }, competency)
                .with_options(ReplaceOptions::builder().upsert(true).build())
                .await
                .context("Failed to upsert competency")?;
            Ok(())
        })
        .await
    }
}

pub struct MongoAttemptLog {
    collection: Collection<Attempt>,
}

impl MongoAttemptLog {
    pub fn new(mongo: &Database) -> Self {
        Self {
            collection: mongo.collection(ATTEMPTS_COLLECTION),
        }
    }
}

#[async_trait]
impl AttemptLog for MongoAttemptLog {
    async fn append(&self, attempt: &Attempt) -> Result<()> {
        track_db_operation("insert_one", ATTEMPTS_COLLECTION, async {
            self.collection
                .insert_one(attempt)
                .await
                .context("Failed to insert attempt")?;
            tracing::debug!(
                "Attempt stored: id={}, user={}, question={}",
                attempt.id,
                attempt.user_id,
                attempt.question_id
            );
            Ok(())
        })
        .await
    }
}
