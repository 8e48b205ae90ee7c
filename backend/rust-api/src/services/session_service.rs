use anyhow::anyhow;
use chrono::Utc;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::PracticeSettings;
use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, PRACTICE_SESSIONS_ACTIVE, PRACTICE_SESSIONS_TOTAL};
use crate::models::attempt::{
    AnswerResult, Attempt, CorrectAnswerExplanation, Explanation, HintCheckRequest,
    HintCheckResponse, SelectedAnswerExplanation, SubmitAnswerRequest, SubmitAnswerResponse,
};
use crate::models::question::{Question, QuestionView};
use crate::models::{
    NextQuestionRequest, NextQuestionResponse, PracticeMode, PracticeSession, SessionStatus,
    SessionSummary, StartSessionRequest, StartSessionResponse,
};
use crate::services::competency_service::CompetencyTracker;
use crate::services::selection_service::QuestionSelector;
use crate::services::PracticeStores;

pub const NO_MORE_QUESTIONS: &str = "No more questions available. Great work!";

#[derive(Debug, thiserror::Error)]
pub enum PracticeError {
    #[error("Invalid practice mode: {0}")]
    InvalidMode(String),
    #[error("Practice session not found: {0}")]
    UnknownSession(String),
    #[error("Question not found: {0}")]
    UnknownQuestion(String),
    #[error("Question {0} was not served in this session")]
    QuestionNotInSession(String),
    #[error("Question {0} was already answered in this session")]
    AlreadyAnswered(String),
    #[error("Answer index {index} is out of range for question {question_id}")]
    InvalidAnswerIndex { question_id: String, index: usize },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type PracticeResult<T> = Result<T, PracticeError>;

fn parse_mode(mode: &str) -> PracticeResult<PracticeMode> {
    PracticeMode::from_str(mode).map_err(PracticeError::InvalidMode)
}

pub struct SessionService {
    stores: PracticeStores,
    tracker: CompetencyTracker,
    selector: QuestionSelector,
    settings: PracticeSettings,
}

impl SessionService {
    pub fn new(stores: PracticeStores, settings: PracticeSettings) -> Self {
        let selector = QuestionSelector::new(
            stores.questions.clone(),
            stores.competencies.clone(),
            settings.clone(),
        );
        Self::with_selector(stores, settings, selector)
    }

    pub fn with_selector(
        stores: PracticeStores,
        settings: PracticeSettings,
        selector: QuestionSelector,
    ) -> Self {
        let tracker = CompetencyTracker::new(
            stores.competencies.clone(),
            stores.questions.clone(),
            settings.clone(),
        );
        Self {
            stores,
            tracker,
            selector,
            settings,
        }
    }

    pub async fn start(&self, req: StartSessionRequest) -> PracticeResult<StartSessionResponse> {
        let mode = parse_mode(&req.mode)?;

        let now = Utc::now();
        let mut session = PracticeSession {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id,
            mode,
            topic_filter: req.topic_filter,
            difficulty: req.difficulty,
            served: Vec::new(),
            unanswered: Vec::new(),
            questions_served: 0,
            questions_answered: 0,
            correct_answers: 0,
            started_at: now,
            expires_at: now + self.ttl(),
        };

        let Some(selection) = self.selector.next_for_session(&session).await? else {
            PRACTICE_SESSIONS_TOTAL.with_label_values(&["empty"]).inc();
            tracing::info!(
                "No content for user {} in {} mode, session not created",
                session.user_id,
                mode
            );
            return Ok(StartSessionResponse {
                session_id: session.id,
                mode,
                status: SessionStatus::Finished,
                question: None,
                context: None,
                message: Some(NO_MORE_QUESTIONS.to_string()),
                expires_at: session.expires_at,
            });
        };

        session.record_served(&selection.question.id, self.settings.recent_window);
        self.save(&mut session).await?;

        PRACTICE_SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        PRACTICE_SESSIONS_ACTIVE.inc();

        tracing::info!(
            "Practice session created: {} for user: {} (mode {})",
            session.id,
            session.user_id,
            mode
        );

        Ok(StartSessionResponse {
            session_id: session.id,
            mode,
            status: SessionStatus::Active,
            question: Some(QuestionView::from(&selection.question)),
            context: Some(selection.context),
            message: None,
            expires_at: session.expires_at,
        })
    }

    /// Serves the next question; ends the session when nothing is left.
    pub async fn next(
        &self,
        session_id: &str,
        req: NextQuestionRequest,
    ) -> PracticeResult<NextQuestionResponse> {
        let mut session = self.load(session_id).await?;
        if let Some(mode) = req.mode.as_deref() {
            let mode = parse_mode(mode)?;
            if mode != session.mode {
                tracing::info!(
                    "Session {} switched mode {} -> {}",
                    session_id,
                    session.mode,
                    mode
                );
                session.mode = mode;
            }
        }

        let Some(selection) = self.selector.next_for_session(&session).await? else {
            self.finish(&session).await?;
            return Ok(NextQuestionResponse {
                session_id: session.id,
                mode: session.mode,
                status: SessionStatus::Finished,
                finished: true,
                question: None,
                context: None,
                message: Some(NO_MORE_QUESTIONS.to_string()),
                questions_served: session.questions_served,
            });
        };

        session.record_served(&selection.question.id, self.settings.recent_window);
        self.save(&mut session).await?;

        Ok(NextQuestionResponse {
            session_id: session.id,
            mode: session.mode,
            status: SessionStatus::Active,
            finished: false,
            question: Some(QuestionView::from(&selection.question)),
            context: Some(selection.context),
            message: None,
            questions_served: session.questions_served,
        })
    }

    pub async fn submit(
        &self,
        session_id: &str,
        req: SubmitAnswerRequest,
    ) -> PracticeResult<SubmitAnswerResponse> {
        let mut session = self.load(session_id).await?;
        let question = self.question(&req.question_id).await?;
        if !session.has_served(&question.id) {
            return Err(PracticeError::QuestionNotInSession(question.id));
        }
        if !session.is_unanswered(&question.id) {
            return Err(PracticeError::AlreadyAnswered(question.id));
        }

        let selected =
            question
                .answers
                .get(req.selected_answer)
                .ok_or_else(|| PracticeError::InvalidAnswerIndex {
                    question_id: question.id.clone(),
                    index: req.selected_answer,
                })?;
        let correct_index = question
            .correct_answer_index()
            .ok_or_else(|| anyhow!("Question {} has no correct answer", question.id))?;
        let is_correct = selected.correct;

        let attempt = Attempt {
            id: Uuid::new_v4().to_string(),
            user_id: session.user_id.clone(),
            session_id: session.id.clone(),
            question_id: question.id.clone(),
            topic_id: question.topic_id.clone(),
            selected_answer: req.selected_answer,
            is_correct,
            time_spent_ms: req.time_spent_ms,
            hints_used: req.hints_used,
            created_at: Utc::now(),
        };
        self.stores.attempts.append(&attempt).await?;

        let change = self
            .tracker
            .update(&session.user_id, &question.topic_id, &attempt)
            .await?;

        session.mark_answered(&question.id);
        session.questions_answered += 1;
        if is_correct {
            session.correct_answers += 1;
        }
        self.save(&mut session).await?;

        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[if is_correct { "true" } else { "false" }])
            .inc();

        tracing::info!(
            "Answer submitted: session={}, question={}, correct={}",
            session.id,
            question.id,
            is_correct
        );

        Ok(SubmitAnswerResponse {
            result: if is_correct {
                AnswerResult::Correct
            } else {
                AnswerResult::Incorrect
            },
            correct: is_correct,
            selected_answer: req.selected_answer,
            correct_answer: correct_index,
            explanation: explain(&question, req.selected_answer, correct_index),
            competency_update: change.to_update(),
        })
    }

    pub async fn hint_check(
        &self,
        session_id: &str,
        req: HintCheckRequest,
    ) -> PracticeResult<HintCheckResponse> {
        let session = self.load(session_id).await?;
        let question = self.question(&req.question_id).await?;

        let offer_hint = self
            .tracker
            .should_offer_hint(&session.user_id, &question.topic_id, req.elapsed_ms)
            .await?;

        Ok(HintCheckResponse {
            question_id: question.id,
            offer_hint,
        })
    }

    pub async fn get(&self, session_id: &str) -> PracticeResult<SessionSummary> {
        let session = self.load(session_id).await?;
        Ok(SessionSummary::of(&session, SessionStatus::Active))
    }

    pub async fn end(&self, session_id: &str) -> PracticeResult<SessionSummary> {
        let session = self.load(session_id).await?;
        self.finish(&session).await?;
        Ok(SessionSummary::of(&session, SessionStatus::Finished))
    }

    fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.settings.session_ttl_seconds as i64)
    }

    async fn load(&self, session_id: &str) -> PracticeResult<PracticeSession> {
        self.stores
            .sessions
            .load(session_id)
            .await?
            .ok_or_else(|| PracticeError::UnknownSession(session_id.to_string()))
    }

    /// Persists the session and slides its expiry forward.
    async fn save(&self, session: &mut PracticeSession) -> PracticeResult<()> {
        session.expires_at = Utc::now() + self.ttl();
        self.stores
            .sessions
            .save(session, self.settings.session_ttl())
            .await?;
        Ok(())
    }

    async fn finish(&self, session: &PracticeSession) -> PracticeResult<()> {
        if self.stores.sessions.remove(&session.id).await? {
            PRACTICE_SESSIONS_TOTAL.with_label_values(&["finished"]).inc();
            PRACTICE_SESSIONS_ACTIVE.dec();
        }
        tracing::info!(
            "Practice session finished: {} ({}/{} correct)",
            session.id,
            session.correct_answers,
            session.questions_answered
        );
        Ok(())
    }

    async fn question(&self, question_id: &str) -> PracticeResult<Question> {
        self.stores
            .questions
            .get(question_id)
            .await?
            .ok_or_else(|| PracticeError::UnknownQuestion(question_id.to_string()))
    }
}

fn explain(question: &Question, selected_index: usize, correct_index: usize) -> Explanation {
    let selected = &question.answers[selected_index];
    let correct = &question.answers[correct_index];
    let wrong = !selected.correct;

    Explanation {
        your_answer: SelectedAnswerExplanation {
            text: selected.text.clone(),
            why_wrong: if wrong {
                selected.explanation.clone()
            } else {
                None
            },
            common_mistake: if wrong {
                selected.common_mistake.clone()
            } else {
                None
            },
        },
        correct_answer: CorrectAnswerExplanation {
            text: correct.text.clone(),
            why_right: correct.explanation.clone(),
            teaching_point: correct.teaching_point.clone(),
        },
        solution_steps: question.solution_steps.clone(),
        lesson_link: question
            .lesson_reference
            .as_deref()
            .map(|reference| format!("/lessons/{}", reference)),
    }
}
