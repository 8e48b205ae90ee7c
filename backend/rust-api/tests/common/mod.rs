#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use codecraze_api::{
    config::Config,
    create_router,
    models::question::{AnswerOption, Question, QuestionType},
    services::AppState,
    storage::InMemoryQuestionRepository,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const SAMPLE_QUESTIONS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample_questions.json");

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// App over the sample question bank, with in-memory stores
pub async fn create_test_app() -> Router {
    init_tracing();
    let questions = InMemoryQuestionRepository::from_json_file(SAMPLE_QUESTIONS)
        .expect("Failed to load sample questions");
    build_app(questions)
}

pub async fn create_app_with(questions: Vec<Question>) -> Router {
    init_tracing();
    let repository = InMemoryQuestionRepository::new();
    for question in questions {
        repository.insert(question).await;
    }
    build_app(repository)
}

fn build_app(questions: InMemoryQuestionRepository) -> Router {
    let state = Arc::new(AppState::in_memory(Config::in_memory(), questions));
    create_router(state)
}

pub fn question(id: &str, topic: &str, difficulty: u8) -> Question {
    Question {
        id: id.to_string(),
        question_text: format!("What does snippet {} print?", id),
        question_type: QuestionType::CodeTrace,
        topic_id: topic.to_string(),
        difficulty,
        answers: vec![
            AnswerOption {
                text: "1".to_string(),
                correct: false,
                explanation: Some("The loop body runs twice".to_string()),
                common_mistake: Some("Stopping after the first iteration".to_string()),
                teaching_point: None,
            },
            AnswerOption {
                text: "2".to_string(),
                correct: true,
                explanation: Some("range(2) yields two values".to_string()),
                common_mistake: None,
                teaching_point: Some("range stops before its bound".to_string()),
            },
        ],
        solution_steps: vec!["List the values of range(2)".to_string()],
        code_snippet: Some("for i in range(2): print(i + 1)".to_string()),
        lesson_reference: Some(topic.to_string()),
        image_url: None,
    }
}

/// Sends a request and returns the status with the parsed JSON body
/// (`Value::Null` for empty or non-JSON bodies).
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
