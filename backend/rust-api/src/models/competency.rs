use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordinal mastery classification. Variant order is the ordering used for
/// "weakest first" comparisons.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    #[default]
    Novice,
    Developing,
    Proficient,
    Expert,
    Master,
}

impl MasteryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryLevel::Novice => "novice",
            MasteryLevel::Developing => "developing",
            MasteryLevel::Proficient => "proficient",
            MasteryLevel::Expert => "expert",
            MasteryLevel::Master => "master",
        }
    }

    /// Contribution of this level to the readiness mastery component.
    pub fn readiness_weight(&self) -> f64 {
        match self {
            MasteryLevel::Novice => 0.0,
            MasteryLevel::Developing => 0.5,
            MasteryLevel::Proficient => 0.75,
            MasteryLevel::Expert => 0.9,
            MasteryLevel::Master => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

/// Per-user, per-topic performance record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Competency {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub topic_id: String,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    #[serde(default)]
    pub total_time_ms: u64,
    pub mastery_level: MasteryLevel,
    #[serde(default)]
    pub trend: Trend,
    pub last_practiced: Option<DateTime<Utc>>,
    /// Most recent outcomes, oldest first, bounded to two trend windows
    #[serde(default)]
    pub recent_outcomes: Vec<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Competency {
    /// Zero-state record for a pair that has never been attempted
    pub fn new(user_id: &str, topic_id: &str) -> Self {
        Self {
            id: Self::key(user_id, topic_id),
            user_id: user_id.to_string(),
            topic_id: topic_id.to_string(),
            total_attempts: 0,
            correct_attempts: 0,
            total_time_ms: 0,
            mastery_level: MasteryLevel::Novice,
            trend: Trend::Stable,
            last_practiced: None,
            recent_outcomes: Vec::new(),
            updated_at: None,
        }
    }

    pub fn key(user_id: &str, topic_id: &str) -> String {
        format!("{}:{}", user_id, topic_id)
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.correct_attempts as f64 / self.total_attempts as f64
    }

    pub fn avg_time_ms(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.total_time_ms as f64 / self.total_attempts as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetencyView {
    pub topic_id: String,
    pub mastery_level: MasteryLevel,
    pub accuracy: f64,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub avg_time_ms: f64,
    pub trend: Trend,
    pub last_practiced: Option<DateTime<Utc>>,
}

impl From<&Competency> for CompetencyView {
    fn from(competency: &Competency) -> Self {
        Self {
            topic_id: competency.topic_id.clone(),
            mastery_level: competency.mastery_level,
            accuracy: competency.accuracy(),
            total_attempts: competency.total_attempts,
            correct_attempts: competency.correct_attempts,
            avg_time_ms: competency.avg_time_ms(),
            trend: competency.trend,
            last_practiced: competency.last_practiced,
        }
    }
}

/// Competition readiness with the components it is built from (all 0-100).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadinessReport {
    pub score: u8,
    pub coverage: u8,
    pub accuracy: u8,
    pub mastery: u8,
    pub topics_total: usize,
    pub topics_started: usize,
}

impl ReadinessReport {
    pub fn empty() -> Self {
        Self {
            score: 0,
            coverage: 0,
            accuracy: 0,
            mastery: 0,
            topics_total: 0,
            topics_started: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakArea {
    pub topic_id: String,
    pub accuracy: f64,
    pub target_accuracy: f64,
    pub total_attempts: u32,
    pub mastery_level: MasteryLevel,
}

#[derive(Debug, Serialize)]
pub struct CompetencyDashboard {
    pub user_id: String,
    pub competition_readiness: u8,
    pub readiness: ReadinessReport,
    pub competencies: Vec<CompetencyView>,
    pub recommendations: Vec<String>,
    pub weak_areas: Vec<WeakArea>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub user_id: String,
    pub topics: Vec<String>,
    pub weak_areas: Vec<WeakArea>,
}
