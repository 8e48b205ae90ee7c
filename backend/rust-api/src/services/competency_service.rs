use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

use crate::config::PracticeSettings;
use crate::metrics::MASTERY_UPDATES_TOTAL;
use crate::models::attempt::{Attempt, CompetencyUpdate};
use crate::models::competency::{
    Competency, CompetencyDashboard, CompetencyView, MasteryLevel, ReadinessReport, WeakArea,
};
use crate::services::scoring;
use crate::storage::{CompetencyStore, QuestionRepository};

/// Result of folding one attempt into a competency row.
#[derive(Debug, Clone)]
pub struct CompetencyChange {
    pub previous_mastery: MasteryLevel,
    pub competency: Competency,
}

impl CompetencyChange {
    pub fn to_update(&self) -> CompetencyUpdate {
        CompetencyUpdate {
            topic_id: self.competency.topic_id.clone(),
            new_accuracy: self.competency.accuracy(),
            previous_mastery_level: self.previous_mastery,
            mastery_level: self.competency.mastery_level,
            total_attempts: self.competency.total_attempts,
            trend: self.competency.trend,
        }
    }
}

pub struct CompetencyTracker {
    competencies: Arc<dyn CompetencyStore>,
    questions: Arc<dyn QuestionRepository>,
    settings: PracticeSettings,
}

impl CompetencyTracker {
    pub fn new(
        competencies: Arc<dyn CompetencyStore>,
        questions: Arc<dyn QuestionRepository>,
        settings: PracticeSettings,
    ) -> Self {
        Self {
            competencies,
            questions,
            settings,
        }
    }

    /// Folds an attempt into the (user, topic) row and persists it.
    pub async fn update(
        &self,
        user_id: &str,
        topic_id: &str,
        attempt: &Attempt,
    ) -> Result<CompetencyChange> {
        let mut competency = self.get(user_id, topic_id).await?;
        let previous_mastery = competency.mastery_level;

        competency.total_attempts += 1;
        if attempt.is_correct {
            competency.correct_attempts += 1;
        }
        competency.total_time_ms += attempt.time_spent_ms;
        competency.mastery_level =
            scoring::mastery_for(competency.accuracy(), competency.total_attempts);

        scoring::push_outcome(
            &mut competency.recent_outcomes,
            attempt.is_correct,
            self.settings.trend_window * 2,
        );
        competency.trend = scoring::trend_for(
            &competency.recent_outcomes,
            self.settings.trend_window,
            self.settings.trend_margin,
        );

        let now = Utc::now();
        competency.last_practiced = Some(attempt.created_at.min(now));
        competency.updated_at = Some(now);

        self.competencies.write(&competency).await?;

        MASTERY_UPDATES_TOTAL
            .with_label_values(&[competency.mastery_level.as_str()])
            .inc();

        if competency.mastery_level != previous_mastery {
            tracing::info!(
                "Mastery changed for user {} topic {}: {} -> {}",
                user_id,
                topic_id,
                previous_mastery.as_str(),
                competency.mastery_level.as_str()
            );
        } else {
            tracing::debug!(
                "Competency updated for user {} topic {}: {}/{}",
                user_id,
                topic_id,
                competency.correct_attempts,
                competency.total_attempts
            );
        }

        Ok(CompetencyChange {
            previous_mastery,
            competency,
        })
    }

    /// Snapshot; zero-state when the topic was never attempted.
    pub async fn get(&self, user_id: &str, topic_id: &str) -> Result<Competency> {
        Ok(self
            .competencies
            .read(user_id, topic_id)
            .await?
            .unwrap_or_else(|| Competency::new(user_id, topic_id)))
    }

    pub async fn competition_readiness(&self, user_id: &str) -> Result<ReadinessReport> {
        let topics = self.questions.list_topics().await?;
        let recorded = self.competencies.read_all(user_id).await?;
        Ok(scoring::readiness(&topics, &recorded))
    }

    /// Weakest topics first, over every topic in the question bank.
    pub async fn recommendations(&self, user_id: &str) -> Result<Vec<String>> {
        let topics = self.questions.list_topics().await?;
        let recorded = self.competencies.read_all(user_id).await?;
        Ok(self.rank_weakest(user_id, &topics, &recorded))
    }

    pub async fn weak_areas(&self, user_id: &str) -> Result<Vec<WeakArea>> {
        let recorded = self.competencies.read_all(user_id).await?;
        Ok(weak_areas_of(&recorded))
    }

    pub async fn dashboard(&self, user_id: &str) -> Result<CompetencyDashboard> {
        let topics = self.questions.list_topics().await?;
        let recorded = self.competencies.read_all(user_id).await?;

        let readiness = scoring::readiness(&topics, &recorded);
        let recommendations = self.rank_weakest(user_id, &topics, &recorded);

        Ok(CompetencyDashboard {
            user_id: user_id.to_string(),
            competition_readiness: readiness.score,
            readiness,
            competencies: recorded.iter().map(CompetencyView::from).collect(),
            recommendations,
            weak_areas: weak_areas_of(&recorded),
        })
    }

    pub async fn should_offer_hint(
        &self,
        user_id: &str,
        topic_id: &str,
        elapsed_ms: u64,
    ) -> Result<bool> {
        let competency = self.competencies.read(user_id, topic_id).await?;
        Ok(scoring::should_offer_hint(competency.as_ref(), elapsed_ms))
    }

    fn rank_weakest(&self, user_id: &str, topics: &[String], recorded: &[Competency]) -> Vec<String> {
        let mut candidates: Vec<Competency> = recorded.to_vec();
        for topic in topics {
            if !candidates.iter().any(|c| &c.topic_id == topic) {
                candidates.push(Competency::new(user_id, topic));
            }
        }

        candidates.sort_by(scoring::weakness_order);
        candidates
            .into_iter()
            .take(self.settings.recommendation_limit)
            .map(|c| c.topic_id)
            .collect()
    }
}

fn weak_areas_of(recorded: &[Competency]) -> Vec<WeakArea> {
    let mut weak: Vec<&Competency> = recorded
        .iter()
        .filter(|c| scoring::is_weak_area(c))
        .collect();
    weak.sort_by(|a, b| scoring::weakness_order(a, b));
    weak.into_iter()
        .map(|c| WeakArea {
            topic_id: c.topic_id.clone(),
            accuracy: c.accuracy(),
            target_accuracy: scoring::WEAK_AREA_TARGET_ACCURACY,
            total_attempts: c.total_attempts,
            mastery_level: c.mastery_level,
        })
        .collect()
}
