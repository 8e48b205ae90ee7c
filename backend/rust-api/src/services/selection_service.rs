use anyhow::Result;
use chrono::Utc;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex};

use crate::config::PracticeSettings;
use crate::metrics::QUESTIONS_SERVED_TOTAL;
use crate::models::competency::Competency;
use crate::models::question::Question;
use crate::models::{PracticeContext, PracticeMode, PracticeSession, SelectionReason};
use crate::services::scoring;
use crate::storage::{CompetencyStore, QuestionRepository};

/// Restrictions a session places on what may be served.
#[derive(Debug, Clone, Default)]
pub struct SelectionScope {
    pub topics: Option<Vec<String>>,
    pub difficulty: Option<u8>,
}

impl SelectionScope {
    pub fn for_session(session: &PracticeSession) -> Self {
        Self {
            topics: session.topic_filter.clone(),
            difficulty: session.difficulty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub question: Question,
    pub context: PracticeContext,
}

/// Questions of one topic that may still be served, with the user's state there.
struct TopicCandidates {
    competency: Competency,
    questions: Vec<Question>,
}

pub struct QuestionSelector {
    questions: Arc<dyn QuestionRepository>,
    competencies: Arc<dyn CompetencyStore>,
    settings: PracticeSettings,
    rng: Mutex<StdRng>,
}

impl QuestionSelector {
    pub fn new(
        questions: Arc<dyn QuestionRepository>,
        competencies: Arc<dyn CompetencyStore>,
        settings: PracticeSettings,
    ) -> Self {
        Self::with_rng(questions, competencies, settings, StdRng::from_os_rng())
    }

    /// Deterministic selector for tests.
    pub fn with_seed(
        questions: Arc<dyn QuestionRepository>,
        competencies: Arc<dyn CompetencyStore>,
        settings: PracticeSettings,
        seed: u64,
    ) -> Self {
        Self::with_rng(questions, competencies, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        questions: Arc<dyn QuestionRepository>,
        competencies: Arc<dyn CompetencyStore>,
        settings: PracticeSettings,
        rng: StdRng,
    ) -> Self {
        Self {
            questions,
            competencies,
            settings,
            rng: Mutex::new(rng),
        }
    }

    pub async fn next_for_session(&self, session: &PracticeSession) -> Result<Option<Selection>> {
        self.next(
            &session.user_id,
            session.mode,
            &session.served,
            &SelectionScope::for_session(session),
        )
        .await
    }

    /// Picks the next question, or `None` when nothing in scope can be served.
    ///
    /// Ids in `recently_served` (oldest first) are skipped. When that leaves no
    /// candidate at all, only the most recent id stays excluded.
    pub async fn next(
        &self,
        user_id: &str,
        mode: PracticeMode,
        recently_served: &[String],
        scope: &SelectionScope,
    ) -> Result<Option<Selection>> {
        let pools = self.load_pools(scope).await?;
        if pools.is_empty() {
            tracing::debug!("No questions in scope for user {}", user_id);
            return Ok(None);
        }

        let recorded = self.competencies.read_all(user_id).await?;
        let getting_started = recorded.is_empty();

        let mut candidates = eligible(user_id, &pools, &recorded, |q| {
            !recently_served.contains(&q.id)
        });
        if candidates.is_empty() {
            let last = recently_served.last();
            tracing::debug!(
                "Recent window exhausted for user {}, relaxing exclusion",
                user_id
            );
            candidates = eligible(user_id, &pools, &recorded, |q| Some(&q.id) != last);
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        let snapshots: Vec<Competency> =
            candidates.iter().map(|c| c.competency.clone()).collect();
        let weights = scoring::topic_weights(
            mode,
            &snapshots,
            Utc::now(),
            self.settings.weak_topic_count,
        );

        let picked = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            scoring::weighted_pick(&weights, &mut *rng)
                .and_then(|index| candidates.get(index))
                .and_then(|topic| pick_question(topic, &mut *rng).map(|q| (topic, q)))
        };
        let Some((topic, question)) = picked else {
            return Ok(None);
        };

        let context = context_for(mode, &topic.competency, getting_started);

        QUESTIONS_SERVED_TOTAL
            .with_label_values(&[mode.as_str()])
            .inc();
        tracing::debug!(
            "Selected question {} (topic {}, difficulty {}) for user {} in {} mode",
            question.id,
            question.topic_id,
            question.difficulty,
            user_id,
            mode
        );

        Ok(Some(Selection {
            question: question.clone(),
            context,
        }))
    }

    /// Non-empty question pools per topic in scope, in topic order.
    async fn load_pools(&self, scope: &SelectionScope) -> Result<Vec<(String, Vec<Question>)>> {
        let mut topics = self.questions.list_topics().await?;
        if let Some(filter) = &scope.topics {
            topics.retain(|topic| filter.contains(topic));
        }

        let mut pools = Vec::with_capacity(topics.len());
        for topic in topics {
            let questions = match scope.difficulty {
                Some(difficulty) => {
                    self.questions
                        .find_by_topic_and_difficulty(&topic, difficulty)
                        .await?
                }
                None => self.questions.find_by_topic(&topic).await?,
            };
            if !questions.is_empty() {
                pools.push((topic, questions));
            }
        }
        Ok(pools)
    }
}

fn eligible(
    user_id: &str,
    pools: &[(String, Vec<Question>)],
    recorded: &[Competency],
    allow: impl Fn(&Question) -> bool,
) -> Vec<TopicCandidates> {
    pools
        .iter()
        .filter_map(|(topic, questions)| {
            let questions: Vec<Question> = questions.iter().filter(|q| allow(q)).cloned().collect();
            if questions.is_empty() {
                return None;
            }
            let competency = recorded
                .iter()
                .find(|c| &c.topic_id == topic)
                .cloned()
                .unwrap_or_else(|| Competency::new(user_id, topic));
            Some(TopicCandidates {
                competency,
                questions,
            })
        })
        .collect()
}

/// Uniform pick inside the mastery's difficulty band, or among all
/// candidates when the band is empty.
fn pick_question<'a, R: Rng>(topic: &'a TopicCandidates, rng: &mut R) -> Option<&'a Question> {
    let band = scoring::target_band(topic.competency.mastery_level);
    let in_band: Vec<&Question> = topic
        .questions
        .iter()
        .filter(|q| band.contains(q.difficulty))
        .collect();
    let pool: Vec<&Question> = if in_band.is_empty() {
        topic.questions.iter().collect()
    } else {
        in_band
    };

    if pool.is_empty() {
        return None;
    }
    Some(pool[rng.random_range(0..pool.len())])
}

fn context_for(
    mode: PracticeMode,
    competency: &Competency,
    getting_started: bool,
) -> PracticeContext {
    let reason = if getting_started {
        SelectionReason::GettingStarted
    } else if competency.total_attempts == 0 {
        SelectionReason::NewTopic
    } else if mode == PracticeMode::WeakFocus || scoring::is_weak_area(competency) {
        SelectionReason::WeakArea
    } else {
        SelectionReason::Practicing
    };

    PracticeContext {
        topic_id: competency.topic_id.clone(),
        accuracy: (competency.total_attempts > 0).then(|| competency.accuracy()),
        reason,
    }
}
