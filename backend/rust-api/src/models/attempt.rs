use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::competency::{MasteryLevel, Trend};

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 64, message = "question_id must not be empty"))]
    pub question_id: String,
    pub selected_answer: usize,
    #[validate(range(max = 86_400_000, message = "time_spent_ms is out of range"))]
    pub time_spent_ms: u64,
    #[serde(default)]
    #[validate(range(max = 20, message = "hints_used is out of range"))]
    pub hints_used: u32,
}

/// Immutable record of one submitted answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub question_id: String,
    pub topic_id: String,
    pub selected_answer: usize,
    pub is_correct: bool,
    pub time_spent_ms: u64,
    pub hints_used: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerResult {
    Correct,
    Incorrect,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectedAnswerExplanation {
    pub text: String,
    pub why_wrong: Option<String>,
    pub common_mistake: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CorrectAnswerExplanation {
    pub text: String,
    pub why_right: Option<String>,
    pub teaching_point: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Explanation {
    pub your_answer: SelectedAnswerExplanation,
    pub correct_answer: CorrectAnswerExplanation,
    pub solution_steps: Vec<String>,
    pub lesson_link: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompetencyUpdate {
    pub topic_id: String,
    pub new_accuracy: f64,
    pub previous_mastery_level: MasteryLevel,
    pub mastery_level: MasteryLevel,
    pub total_attempts: u32,
    pub trend: Trend,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub result: AnswerResult,
    pub correct: bool,
    pub selected_answer: usize,
    pub correct_answer: usize,
    pub explanation: Explanation,
    pub competency_update: CompetencyUpdate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct HintCheckRequest {
    #[validate(length(min = 1, max = 64, message = "question_id must not be empty"))]
    pub question_id: String,
    #[validate(range(max = 86_400_000, message = "elapsed_ms is out of range"))]
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HintCheckResponse {
    pub question_id: String,
    pub offer_hint: bool,
}
