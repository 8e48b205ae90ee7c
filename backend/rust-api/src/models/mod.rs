use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use validator::{Validate, ValidationError};

pub mod attempt;
pub mod competency;
pub mod question;

use question::QuestionView;

lazy_static! {
    /// Hierarchical topic identifier such as "4" or "1.2"
    pub static ref TOPIC_ID_RE: Regex = Regex::new(r"^\d+(\.\d+)*$").unwrap();
}

pub const MAX_TOPIC_FILTER: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PracticeMode {
    Balanced,
    WeakFocus,
    Review,
    Competition,
}

impl PracticeMode {
    pub const ALL: [PracticeMode; 4] = [
        PracticeMode::Balanced,
        PracticeMode::WeakFocus,
        PracticeMode::Review,
        PracticeMode::Competition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeMode::Balanced => "balanced",
            PracticeMode::WeakFocus => "weak_focus",
            PracticeMode::Review => "review",
            PracticeMode::Competition => "competition",
        }
    }
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PracticeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "balanced" => Ok(PracticeMode::Balanced),
            "weak_focus" => Ok(PracticeMode::WeakFocus),
            "review" => Ok(PracticeMode::Review),
            "competition" => Ok(PracticeMode::Competition),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Finished,
}

/// Server-side state of one practice run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticeSession {
    pub id: String,
    pub user_id: String,
    pub mode: PracticeMode,
    pub topic_filter: Option<Vec<String>>,
    pub difficulty: Option<u8>,
    /// Trailing window of served question ids, oldest first
    pub served: Vec<String>,
    /// Served ids that have not been answered yet
    #[serde(default)]
    pub unanswered: Vec<String>,
    pub questions_served: u32,
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PracticeSession {
    /// Appends a served id, keeping at most `window` entries in both the
    /// served and unanswered lists.
    pub fn record_served(&mut self, question_id: &str, window: usize) {
        self.served.push(question_id.to_string());
        trim_front(&mut self.served, window);
        if !self.is_unanswered(question_id) {
            self.unanswered.push(question_id.to_string());
            trim_front(&mut self.unanswered, window);
        }
        self.questions_served += 1;
    }

    pub fn has_served(&self, question_id: &str) -> bool {
        self.served.iter().any(|id| id == question_id)
    }

    pub fn is_unanswered(&self, question_id: &str) -> bool {
        self.unanswered.iter().any(|id| id == question_id)
    }

    pub fn mark_answered(&mut self, question_id: &str) {
        self.unanswered.retain(|id| id != question_id);
    }
}

fn trim_front(ids: &mut Vec<String>, window: usize) {
    if ids.len() > window {
        let overflow = ids.len() - window;
        ids.drain(..overflow);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// No competency data exists yet for the user
    GettingStarted,
    NewTopic,
    Practicing,
    WeakArea,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticeContext {
    pub topic_id: String,
    pub accuracy: Option<f64>,
    pub reason: SelectionReason,
}

fn default_mode() -> String {
    PracticeMode::Balanced.as_str().to_string()
}

fn validate_topic_filter(topics: &Vec<String>) -> Result<(), ValidationError> {
    if topics.len() > MAX_TOPIC_FILTER {
        return Err(ValidationError::new("topic_filter_too_long"));
    }
    if topics.iter().any(|topic| !TOPIC_ID_RE.is_match(topic)) {
        return Err(ValidationError::new("invalid_topic_id"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(length(min = 1, max = 128, message = "user_id must not be empty"))]
    pub user_id: String,
    /// Kept as a string so unknown modes surface as a domain error
    #[serde(default = "default_mode")]
    pub mode: String,
    #[validate(custom(function = "validate_topic_filter"))]
    pub topic_filter: Option<Vec<String>>,
    #[validate(range(min = 1, max = 5, message = "difficulty must be between 1 and 5"))]
    pub difficulty: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuestionRequest {
    pub mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub mode: PracticeMode,
    pub status: SessionStatus,
    pub question: Option<QuestionView>,
    pub context: Option<PracticeContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NextQuestionResponse {
    pub session_id: String,
    pub mode: PracticeMode,
    pub status: SessionStatus,
    pub finished: bool,
    pub question: Option<QuestionView>,
    pub context: Option<PracticeContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub questions_served: u32,
}

/// Session counters as returned by get/end; served ids stay server-side.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub mode: PracticeMode,
    pub status: SessionStatus,
    pub topic_filter: Option<Vec<String>>,
    pub difficulty: Option<u8>,
    pub questions_served: u32,
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn of(session: &PracticeSession, status: SessionStatus) -> Self {
        Self {
            session_id: session.id.clone(),
            user_id: session.user_id.clone(),
            mode: session.mode,
            status,
            topic_filter: session.topic_filter.clone(),
            difficulty: session.difficulty,
            questions_served: session.questions_served,
            questions_answered: session.questions_answered,
            correct_answers: session.correct_answers,
            started_at: session.started_at,
            expires_at: session.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> PracticeSession {
        let now = Utc::now();
        PracticeSession {
            id: "s1".to_string(),
            user_id: "u1".to_string(),
            mode: PracticeMode::Balanced,
            topic_filter: None,
            difficulty: None,
            served: vec![],
            unanswered: vec![],
            questions_served: 0,
            questions_answered: 0,
            correct_answers: 0,
            started_at: now,
            expires_at: now,
        }
    }

    #[test]
    fn practice_mode_round_trips_through_str() {
        for mode in PracticeMode::ALL {
            assert_eq!(mode.as_str().parse::<PracticeMode>(), Ok(mode));
        }
        assert_eq!(
            "invalid_mode".parse::<PracticeMode>(),
            Err("invalid_mode".to_string())
        );
    }

    #[test]
    fn record_served_keeps_trailing_window() {
        let mut session = session();
        for i in 0..5 {
            session.record_served(&format!("q{}", i), 3);
        }
        assert_eq!(session.served, vec!["q2", "q3", "q4"]);
        assert_eq!(session.questions_served, 5);
        assert!(session.has_served("q4"));
        assert!(!session.has_served("q0"));
        assert_eq!(session.unanswered, vec!["q2", "q3", "q4"]);
    }

    #[test]
    fn answered_question_leaves_unanswered_until_served_again() {
        let mut session = session();
        session.record_served("q1", 10);
        session.record_served("q2", 10);
        session.mark_answered("q1");
        assert!(session.has_served("q1"));
        assert!(!session.is_unanswered("q1"));
        assert!(session.is_unanswered("q2"));

        session.record_served("q1", 10);
        assert!(session.is_unanswered("q1"));
        assert_eq!(session.unanswered, vec!["q2", "q1"]);
    }

    #[test]
    fn start_request_validation() {
        let ok = StartSessionRequest {
            user_id: "u1".to_string(),
            mode: default_mode(),
            topic_filter: Some(vec!["1.1".to_string(), "4".to_string()]),
            difficulty: Some(3),
        };
        assert!(ok.validate().is_ok());

        let bad_topic = StartSessionRequest {
            topic_filter: Some(vec!["karel".to_string()]),
            ..ok
        };
        assert!(bad_topic.validate().is_err());

        let bad_difficulty = StartSessionRequest {
            user_id: "u1".to_string(),
            mode: default_mode(),
            topic_filter: None,
            difficulty: Some(9),
        };
        assert!(bad_difficulty.validate().is_err());
    }

    #[test]
    fn start_request_defaults_to_balanced() {
        let req: StartSessionRequest = serde_json::from_str(r#"{"user_id":"u1"}"#).unwrap();
        assert_eq!(req.mode, "balanced");
    }
}
